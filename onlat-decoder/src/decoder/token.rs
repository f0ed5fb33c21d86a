//! Back-pointer tokens.

use crate::fst::{StdArc, cost, is_emitting};
use crate::lattice::{LatticeArc, LatticeWeight, SplitCost};
use rustfst::prelude::{Semiring, Tr, TropicalWeight};
use std::rc::Rc;

/// A search decision: the arc taken, the token it extends and the path cost.
///
/// Tokens form a forest of shared back-pointers. Each token keeps its
/// predecessor alive, so a chain lives as long as any token at its tip.
#[derive(Debug)]
pub struct Token {
    arc: StdArc,
    prev: Option<Rc<Token>>,
    cost: f32,
}

impl Token {
    /// Sentinel root sitting on the start state.
    pub(crate) fn root(arc: StdArc) -> Self {
        Self {
            cost: cost(&arc.weight),
            arc,
            prev: None,
        }
    }

    /// Extend `prev` along `arc`, paying `acoustic_cost` (zero for ε-arcs).
    pub(crate) fn extend(prev: &Rc<Token>, arc: &StdArc, acoustic_cost: f32) -> Self {
        Self {
            cost: prev.cost + cost(&arc.weight) + acoustic_cost,
            arc: arc.clone(),
            prev: Some(Rc::clone(prev)),
        }
    }

    pub fn arc(&self) -> &StdArc {
        &self.arc
    }

    pub fn prev(&self) -> Option<&Rc<Token>> {
        self.prev.as_ref()
    }

    /// Cumulative cost from the root.
    pub fn cost(&self) -> f32 {
        self.cost
    }

    /// Cumulative cost as a tropical weight.
    pub fn weight(&self) -> TropicalWeight {
        TropicalWeight::new(self.cost)
    }

    pub fn is_root(&self) -> bool {
        self.prev.is_none()
    }

    /// Acoustic part of this token's step cost.
    pub fn acoustic_cost(&self) -> f32 {
        let prev_cost = self.prev.as_ref().map_or(0.0, |p| p.cost);
        self.cost - prev_cost - cost(&self.arc.weight)
    }

    /// The step from the predecessor as a lattice arc.
    pub fn lattice_arc(&self) -> LatticeArc {
        Tr::new(
            self.arc.ilabel,
            self.arc.olabel,
            LatticeWeight::from_costs(cost(&self.arc.weight), self.acoustic_cost()),
            self.arc.nextstate,
        )
    }

    /// This token followed by all its ancestors.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// First token at or before `tok` that was reached by an emitting arc.
    pub(crate) fn skip_epsilons(mut tok: Option<&Rc<Token>>) -> Option<&Rc<Token>> {
        while let Some(t) = tok {
            if is_emitting(&t.arc) {
                return Some(t);
            }
            tok = t.prev.as_ref();
        }
        None
    }
}

// Long chains would otherwise be freed recursively.
impl Drop for Token {
    fn drop(&mut self) {
        let mut prev = self.prev.take();
        while let Some(tok) = prev {
            match Rc::try_unwrap(tok) {
                Ok(mut tok) => prev = tok.prev.take(),
                Err(_) => break,
            }
        }
    }
}

/// Iterator from a token back to the root.
pub struct Chain<'a> {
    next: Option<&'a Token>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Token;

    fn next(&mut self) -> Option<Self::Item> {
        let tok = self.next?;
        self.next = tok.prev.as_deref();
        Some(tok)
    }
}
