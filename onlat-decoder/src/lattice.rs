//! Lattices produced by traceback.
//!
//! Lattice weights pair a graph cost with an acoustic cost so a consumer can
//! rescale acoustics after decoding. Both halves are tropical, so the pair is
//! a rustfst [`ProductWeight`].

use crate::error::Result;
use crate::fst::{EPS_LABEL, Label, StateId};
use rustfst::algorithms::concat::concat;
use rustfst::algorithms::connect;
use rustfst::algorithms::rm_epsilon::rm_epsilon;
use rustfst::prelude::{CoreFst, ExpandedFst, MutableFst, ProductWeight, Semiring, Tr, TropicalWeight, Trs, VectorFst};
use rustfst::utils::acceptor;

/// `(graph, acoustic)` lattice weight.
pub type LatticeWeight = ProductWeight<TropicalWeight, TropicalWeight>;

/// Lattice arc.
pub type LatticeArc = Tr<LatticeWeight>;

/// Access to the two cost components of a [`LatticeWeight`].
pub trait SplitCost {
    fn from_costs(graph: f32, acoustic: f32) -> Self;

    fn graph_cost(&self) -> f32;

    fn acoustic_cost(&self) -> f32;

    /// Combined cost used for comparisons.
    fn cost(&self) -> f32 {
        self.graph_cost() + self.acoustic_cost()
    }
}

impl SplitCost for LatticeWeight {
    fn from_costs(graph: f32, acoustic: f32) -> Self {
        ProductWeight::new((TropicalWeight::new(graph), TropicalWeight::new(acoustic)))
    }

    fn graph_cost(&self) -> f32 {
        *self.value1().value()
    }

    fn acoustic_cost(&self) -> f32 {
        *self.value2().value()
    }
}

/// Label sequences and total weight of a linear lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearPath {
    /// Non-epsilon input labels (transition ids)
    pub ilabels: Vec<Label>,
    /// Non-epsilon output labels (words)
    pub olabels: Vec<Label>,
    /// Product of arc weights and the final weight
    pub weight: LatticeWeight,
}

/// Weighted transducer over [`LatticeWeight`]s.
#[derive(Clone, Debug)]
pub struct Lattice {
    fst: VectorFst<LatticeWeight>,
}

impl Default for Lattice {
    fn default() -> Self {
        Self::new()
    }
}

impl Lattice {
    /// Empty lattice (no states).
    pub fn new() -> Self {
        Self {
            fst: VectorFst::new(),
        }
    }

    /// Single start state that is final with weight one.
    pub fn one() -> Self {
        Self {
            fst: acceptor(&[], LatticeWeight::one()),
        }
    }

    /// Build a chain `start → s1 → … → sn` over `arcs`, final weight on `sn`.
    ///
    /// Destination states stored in `arcs` are ignored.
    pub fn linear(
        arcs: impl IntoIterator<Item = LatticeArc>,
        final_weight: LatticeWeight,
    ) -> Result<Self> {
        let mut fst = VectorFst::new();
        let mut cur = fst.add_state();
        fst.set_start(cur)?;

        for mut arc in arcs {
            let next = fst.add_state();
            arc.nextstate = next;
            fst.add_tr(cur, arc)?;
            cur = next;
        }

        fst.set_final(cur, final_weight)?;
        Ok(Self { fst })
    }

    pub fn fst(&self) -> &VectorFst<LatticeWeight> {
        &self.fst
    }

    pub fn into_fst(self) -> VectorFst<LatticeWeight> {
        self.fst
    }

    pub fn start(&self) -> Option<StateId> {
        self.fst.start()
    }

    /// Final weight of `state`, `None` when it is not final.
    pub fn final_weight(&self, state: StateId) -> Option<LatticeWeight> {
        self.fst.final_weight(state).ok().flatten()
    }

    pub fn num_states(&self) -> usize {
        self.fst.num_states()
    }

    pub fn num_arcs(&self) -> usize {
        (0..self.num_states() as StateId)
            .map(|s| self.fst.num_trs(s).unwrap_or(0))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fst.start().is_none()
    }

    /// Set every final weight to one.
    ///
    /// Committed prefixes are joined to later segments, so their final costs
    /// must not be counted twice.
    pub fn reset_final_weights(&mut self) -> Result<()> {
        for state in 0..self.num_states() as StateId {
            if self.fst.is_final(state)? {
                self.fst.set_final(state, LatticeWeight::one())?;
            }
        }
        Ok(())
    }

    /// Labels and weight of the single path through a linear lattice.
    ///
    /// An empty lattice yields empty sequences with weight zero. Returns `None`
    /// when some state branches or the path never reaches a final state.
    pub fn linear_symbol_sequence(&self) -> Option<LinearPath> {
        let Some(mut state) = self.fst.start() else {
            return Some(LinearPath {
                ilabels: Vec::new(),
                olabels: Vec::new(),
                weight: LatticeWeight::zero(),
            });
        };

        let (mut ilabels, mut olabels) = (Vec::new(), Vec::new());
        let (mut graph, mut acoustic) = (0.0, 0.0);

        for _ in 0..=self.num_states() {
            let trs = self.fst.get_trs(state).ok()?;

            match (trs.trs(), self.final_weight(state)) {
                ([], Some(last)) => {
                    graph += last.graph_cost();
                    acoustic += last.acoustic_cost();
                    return Some(LinearPath {
                        ilabels,
                        olabels,
                        weight: LatticeWeight::from_costs(graph, acoustic),
                    });
                }
                ([arc], None) => {
                    if arc.ilabel != EPS_LABEL {
                        ilabels.push(arc.ilabel);
                    }
                    if arc.olabel != EPS_LABEL {
                        olabels.push(arc.olabel);
                    }
                    graph += arc.weight.graph_cost();
                    acoustic += arc.weight.acoustic_cost();
                    state = arc.nextstate;
                }
                _ => return None,
            }
        }

        // cycle
        None
    }

    /// Total cost of a linear lattice, `None` if it is not linear.
    pub fn total_cost(&self) -> Option<LatticeWeight> {
        self.linear_symbol_sequence().map(|p| p.weight)
    }

    /// Append `other` after every final state. Joining onto or with an empty
    /// lattice leaves an empty lattice.
    pub fn concat(&mut self, other: &Lattice) -> Result<()> {
        if self.is_empty() || other.is_empty() {
            self.fst = VectorFst::new();
            return Ok(());
        }
        concat(&mut self.fst, &other.fst)?;
        Ok(())
    }

    /// Remove ε:ε arcs and states no longer on a successful path.
    pub fn remove_eps_local(&mut self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        rm_epsilon(&mut self.fst)?;
        connect(&mut self.fst)?;
        Ok(())
    }

    /// Append a committed segment, dropping the segment's final costs since
    /// more audio will follow it.
    pub fn append_segment(&mut self, mut segment: Lattice) -> Result<()> {
        segment.reset_final_weights()?;
        self.concat(&segment)?;
        self.remove_eps_local()
    }

    /// This lattice followed by `tail`, without ε:ε arcs.
    pub fn followed_by(&self, tail: &Lattice) -> Result<Lattice> {
        let mut lat = self.clone();
        lat.concat(tail)?;
        lat.remove_eps_local()?;
        Ok(lat)
    }
}
