//! Info subcommand - decoding graph statistics.

use eyre::{Context, Result};
use onlat_decoder::fst::{StateId, StdVectorFst, count_arcs, final_weight, read_text};
use rustfst::prelude::{CoreFst, ExpandedFst, Semiring};
use std::path::PathBuf;

/// CLI arguments for graph inspection.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Decoding graph in AT&T text format
    pub fst: PathBuf,

    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

/// Counts describing a decoding graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphInfo {
    pub start: Option<StateId>,
    pub states: usize,
    pub arcs: usize,
    pub epsilon_arcs: usize,
    pub finals: usize,
}

impl GraphInfo {
    pub fn of(fst: &StdVectorFst) -> onlat_decoder::error::Result<Self> {
        let (arcs, epsilon_arcs) = count_arcs(fst)?;

        Ok(Self {
            start: fst.start(),
            states: fst.num_states(),
            arcs,
            epsilon_arcs,
            finals: (0..fst.num_states() as StateId)
                .filter(|&s| !final_weight(fst, s).is_zero())
                .count(),
        })
    }
}

pub fn execute(args: Args) -> Result<()> {
    let fst = read_text(&args.fst)
        .wrap_err_with(|| format!("failed to read graph: {:?}", args.fst.display()))?;
    let info = GraphInfo::of(&fst)?;

    tracing::debug!(?info, "graph loaded");

    if args.json {
        let value = serde_json::json!({
            "start": info.start,
            "states": info.states,
            "arcs": info.arcs,
            "epsilon_arcs": info.epsilon_arcs,
            "finals": info.finals,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match info.start {
        Some(start) => println!("start: {start}"),
        None => println!("start: none"),
    }
    println!("states: {}", info.states);
    println!("arcs: {} ({} epsilon)", info.arcs, info.epsilon_arcs);
    println!("finals: {}", info.finals);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use onlat_decoder::fst::from_text;
    use rustfst::prelude::MutableFst;

    #[test]
    fn counts_graph_elements() {
        let fst = from_text("0 1 1 1\n1 2 0 0\n2 2 3 3 0.5\n2\n").unwrap();

        let info = GraphInfo::of(&fst).unwrap();

        assert_eq!(
            info,
            GraphInfo {
                start: Some(0),
                states: 3,
                arcs: 3,
                epsilon_arcs: 1,
                finals: 1,
            }
        );
    }

    #[test]
    fn empty_graph_has_no_start() {
        let info = GraphInfo::of(&StdVectorFst::new()).unwrap();
        assert_eq!(info.start, None);
        assert_eq!(info.states, 0);
    }
}
