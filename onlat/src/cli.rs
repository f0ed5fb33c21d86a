//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use eyre::Result;

#[derive(Debug, Parser)]
#[command(name = "onlat")]
#[command(about = "Online WFST decoding with partial traceback")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode a log-likelihood matrix against a decoding graph
    Decode(crate::decode::Args),

    /// Print decoding graph statistics
    Info(crate::info::Args),
}

/// Execute CLI command - separated for testing.
pub fn run_cli(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Decode(args) => crate::decode::execute(args.try_into()?),
        Commands::Info(args) => crate::info::execute(args),
    }
}
