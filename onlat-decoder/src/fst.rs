//! Decoding graphs.
//!
//! Graphs are `rustfst` vector FSTs over the tropical semiring. The search
//! reads them through [`CoreFst`] only, so any rustfst implementation can be
//! decoded; [`StdVectorFst`] is the one loaded from disk.

use crate::error::{GraphError, Result};
use rustfst::prelude::{CoreFst, ExpandedFst, MutableFst, Semiring, SerializableFst, Tr, TropicalWeight, Trs, VectorFst};
use std::path::Path;

pub use rustfst::{EPS_LABEL, Label, StateId};

/// Decoding graph with tropical weights.
pub type StdVectorFst = VectorFst<TropicalWeight>;

/// Decoding graph arc.
pub type StdArc = Tr<TropicalWeight>;

/// State ids may run this far past twice the line count of a text graph.
const MAX_STATE_GAP: usize = 1 << 16;

/// Cost carried by a tropical weight.
pub fn cost(weight: &TropicalWeight) -> f32 {
    *weight.value()
}

/// Whether the arc consumes an audio frame.
pub fn is_emitting(arc: &StdArc) -> bool {
    arc.ilabel != EPS_LABEL
}

/// Final weight of `state`, zero when the state is not final or unknown.
pub fn final_weight<F>(fst: &F, state: StateId) -> TropicalWeight
where
    F: CoreFst<TropicalWeight> + ?Sized,
{
    fst.final_weight(state)
        .ok()
        .flatten()
        .unwrap_or_else(TropicalWeight::zero)
}

/// Total arc count and the number of ε-input arcs among them.
pub fn count_arcs(fst: &StdVectorFst) -> Result<(usize, usize)> {
    let mut arcs = 0;
    let mut epsilon = 0;
    for state in 0..fst.num_states() as StateId {
        let trs = fst.get_trs(state)?;
        arcs += trs.trs().len();
        epsilon += trs.trs().iter().filter(|tr| !is_emitting(tr)).count();
    }
    Ok((arcs, epsilon))
}

/// Parse the AT&T text format.
///
/// Arc lines are `src dst ilabel olabel [weight]`, final lines are
/// `state [weight]`, fields separated by any whitespace. The source of the
/// first line is the start state. Blank text gives an empty graph.
pub fn from_text(text: &str) -> Result<StdVectorFst> {
    let lines: Vec<(usize, Vec<&str>)> = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, fields)| !fields.is_empty())
        .collect();

    if lines.is_empty() {
        return Ok(StdVectorFst::new());
    }

    // rustfst allocates every id up to the largest one it sees
    let limit = 2 * lines.len() + MAX_STATE_GAP;
    let mut normalized = String::with_capacity(text.len());

    for (lineno, fields) in &lines {
        let states = match fields.len() {
            1 | 2 => &fields[..1],
            4 | 5 => &fields[..2],
            n => {
                return Err(GraphError::parse(
                    *lineno,
                    format!("expected 1, 2, 4 or 5 fields, got {n}"),
                )
                .into());
            }
        };

        for field in states {
            let state = field
                .parse::<StateId>()
                .map_err(|e| GraphError::parse(*lineno, format!("bad state {field:?}: {e}")))?;
            if state as usize >= limit {
                return Err(GraphError::StateOutOfRange { state, limit }.into());
            }
        }

        normalized.push_str(&fields.join("\t"));
        normalized.push('\n');
    }

    Ok(StdVectorFst::from_text_string(&normalized)?)
}

/// Read an AT&T text graph from a file.
pub fn read_text(path: impl AsRef<Path>) -> Result<StdVectorFst> {
    let text = std::fs::read_to_string(path)?;
    from_text(&text)
}
