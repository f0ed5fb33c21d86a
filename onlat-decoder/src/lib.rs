//! onlat-decoder: online WFST decoding with incremental partial traceback.
//!
//! The decoder runs a token-passing Viterbi beam search over a weighted
//! finite-state transducer and can commit the prefix that all surviving
//! hypotheses agree on while audio is still arriving.
//!
//! # Architecture
//!
//! The search is generic over three collaborators:
//!
//! - a `rustfst` [`CoreFst`](rustfst::prelude::CoreFst) over tropical
//!   weights: the decoding graph, loaded with [`fst::read_text`]
//! - [`scorer::Scorer`]: acoustic costs per frame and input label
//! - [`transition::TransitionModel`]: transition id to phone mapping, used for
//!   end-of-utterance detection
//!
//! [`recogniser::OnlineRecogniser`] wires a [`recogniser::AcousticFrontend`]
//! to the [`decoder::Decoder`] for callers that feed raw audio.
//!
//! # Quick Start
//!
//! ```no_run
//! use onlat_decoder::config::DecoderConfig;
//! use onlat_decoder::decoder::Decoder;
//! use onlat_decoder::fst::read_text;
//! use onlat_decoder::scorer::{MatrixScorer, read_text_matrix};
//!
//! # fn main() -> onlat_decoder::error::Result<()> {
//! let fst = read_text("HCLG.txt")?;
//! let mut scorer = MatrixScorer::new(read_text_matrix("loglikes.txt")?, 0.1);
//!
//! let mut decoder = Decoder::new(&fst, DecoderConfig::default())?;
//! decoder.decode(&mut scorer)?;
//!
//! if let Some(path) = decoder.finish_traceback()?.linear_symbol_sequence() {
//!     println!("{:?}", path.olabels);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod fst;
pub mod lattice;
pub mod recogniser;
pub mod scorer;
pub mod symbols;
pub mod transition;
