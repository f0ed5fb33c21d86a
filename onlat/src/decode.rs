//! Decode subcommand - stream a score matrix through the online decoder.

use color_eyre::Section;
use eyre::{Context, Result, eyre};
use ndarray::Axis;
use onlat_decoder::config::RecogniserConfig;
use onlat_decoder::decoder::Decoder;
use onlat_decoder::fst::{Label, read_text};
use onlat_decoder::lattice::{Lattice, LatticeWeight, SplitCost};
use rustfst::prelude::ExpandedFst;
use onlat_decoder::scorer::{MatrixScorer, read_text_matrix};
use onlat_decoder::symbols::SymbolTable;
use onlat_decoder::transition::TransitionTable;
use std::path::PathBuf;
use std::time::Instant;

/// CLI arguments for decoding.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Decoding graph in AT&T text format
    pub fst: PathBuf,

    /// Log-likelihood matrix, one frame per row
    pub loglikes: PathBuf,

    /// Transition table (`tid phone exits` lines), enables end-of-utterance detection
    #[arg(long)]
    pub transitions: Option<PathBuf>,

    /// Word symbol table (`word label` lines)
    #[arg(long)]
    pub words: Option<PathBuf>,

    /// JSON recogniser configuration, replaces the decoder flags
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frames fed to the decoder between partial tracebacks
    #[arg(long, default_value_t = 10)]
    pub chunk: usize,

    #[command(flatten)]
    pub recogniser: RecogniserConfig,
}

/// Resolved configuration for decoding.
#[derive(Debug)]
pub struct Config {
    pub fst: PathBuf,
    pub loglikes: PathBuf,
    pub transitions: Option<PathBuf>,
    pub words: Option<PathBuf>,
    pub chunk: usize,
    pub recogniser: RecogniserConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        if args.chunk == 0 {
            return Err(eyre!("--chunk must be at least one frame"));
        }

        let recogniser = match args.config {
            Some(path) => RecogniserConfig::from_json_file(&path)
                .wrap_err_with(|| format!("failed to load config: {:?}", path.display()))?,
            None => {
                args.recogniser.validate()?;
                args.recogniser
            }
        };

        Ok(Self {
            fst: args.fst,
            loglikes: args.loglikes,
            transitions: args.transitions,
            words: args.words,
            chunk: args.chunk,
            recogniser,
        })
    }
}

/// Result of decoding one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Word labels of each non-empty partial commit, in order
    pub commits: Vec<Vec<Label>>,
    /// Frame at which trailing silence was first detected
    pub end_of_utterance: Option<usize>,
    /// Word labels of the best path
    pub words: Vec<Label>,
    /// Cost of the best path
    pub cost: LatticeWeight,
    pub frames: usize,
}

pub fn execute(config: Config) -> Result<()> {
    let symbols = match &config.words {
        Some(path) => SymbolTable::read_text(path)
            .wrap_err_with(|| format!("failed to read words: {:?}", path.display()))?,
        None => SymbolTable::new(),
    };

    let transcript = transcribe(&config)?;

    for commit in &transcript.commits {
        println!("partial: {}", symbols.render(commit));
    }
    if let Some(frame) = transcript.end_of_utterance {
        println!("end-of-utterance at frame {frame}");
    }
    println!("best: {}", symbols.render(&transcript.words));
    println!("frames: {}", transcript.frames);
    println!(
        "cost: {:.4} (graph {:.4}, acoustic {:.4})",
        transcript.cost.cost(),
        transcript.cost.graph_cost(),
        transcript.cost.acoustic_cost()
    );

    Ok(())
}

/// Decode the configured score matrix chunk by chunk.
pub fn transcribe(config: &Config) -> Result<Transcript> {
    let fst = read_text(&config.fst)
        .wrap_err_with(|| format!("failed to read graph: {:?}", config.fst.display()))?;
    let loglikes = read_text_matrix(&config.loglikes)
        .wrap_err_with(|| format!("failed to read scores: {:?}", config.loglikes.display()))?;
    let transitions = config
        .transitions
        .as_ref()
        .map(|path| {
            TransitionTable::read_text(path)
                .wrap_err_with(|| format!("failed to read transitions: {:?}", path.display()))
        })
        .transpose()?;

    tracing::info!(
        states = fst.num_states(),
        frames = loglikes.nrows(),
        labels = loglikes.ncols(),
        "decoding"
    );

    let s = Instant::now();

    let mut decoder = Decoder::new(&fst, config.recogniser.decoder)?;
    let mut scorer = MatrixScorer::empty(loglikes.ncols(), config.recogniser.acoustic_scale);
    let mut committed = Lattice::one();
    let mut commits = Vec::new();
    let mut end_of_utterance = None;

    for chunk in loglikes.axis_chunks_iter(Axis(0), config.chunk) {
        scorer.push_frames(chunk)?;
        decoder
            .decode(&mut scorer)
            .wrap_err_with(|| format!("decoding failed near frame {}", decoder.frame()))
            .suggestion("widen the search with --beam or --min-active")?;

        if let Some(segment) = decoder.partial_traceback()? {
            let words = segment
                .linear_symbol_sequence()
                .map(|path| path.olabels)
                .unwrap_or_default();
            tracing::debug!(frame = decoder.frame(), ?words, "partial traceback");
            if !words.is_empty() {
                commits.push(words);
            }

            committed.append_segment(segment)?;
        }

        if let Some(transitions) = &transitions
            && end_of_utterance.is_none()
            && decoder.end_of_utterance(transitions, &config.recogniser.silence_phones)?
        {
            tracing::info!(frame = decoder.frame(), "end of utterance");
            end_of_utterance = Some(decoder.frame());
        }
    }

    let best = committed
        .followed_by(&decoder.finish_traceback()?)?
        .linear_symbol_sequence()
        .filter(|path| path.weight.cost().is_finite())
        .ok_or_else(|| eyre!("no hypothesis reached the end of the scores"))?;

    let d = s.elapsed();
    tracing::info!(duration = %format!("{:.2}s", d.as_secs_f32()), "decoding completed");

    Ok(Transcript {
        commits,
        end_of_utterance,
        words: best.olabels,
        cost: best.weight,
        frames: decoder.frame(),
    })
}
