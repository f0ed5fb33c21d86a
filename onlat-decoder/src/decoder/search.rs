//! Frame-synchronous expansion and pruning.

use super::{Decoder, Token};
use crate::error::{DecodeError, Result};
use crate::fst::{StateId, cost, is_emitting};
use crate::scorer::Scorer;
use rustfst::prelude::{CoreFst, TropicalWeight, Trs};
use std::collections::VecDeque;
use std::rc::Rc;

impl<F: CoreFst<TropicalWeight> + ?Sized> Decoder<'_, F> {
    /// Advance every token along the emitting arcs of its state, scoring them
    /// at the current frame, then prune. Returns the pruning cutoff.
    pub(super) fn process_emitting(&mut self, scorer: &mut impl Scorer) -> Result<f32> {
        let fst = self.fst;
        let frame = self.frame;
        let last = self.toks.clear();

        // An early cutoff is only safe when min_active cannot widen the beam
        // after the fact.
        let early = self.config.min_active == 0;
        let mut best = f32::INFINITY;

        for (state, tok) in &last {
            let trs = fst.get_trs(*state)?;
            for arc in trs.trs().iter().filter(|a| is_emitting(a)) {
                let acoustic_cost = scorer.acoustic_cost(frame, arc.ilabel);
                let total = tok.cost() + cost(&arc.weight) + acoustic_cost;

                if total.is_nan() || total == f32::INFINITY {
                    continue;
                }
                if early && total > best + self.config.beam {
                    continue;
                }
                if self.is_covered(arc.nextstate, total) {
                    continue;
                }

                best = best.min(total);
                self.toks
                    .insert(arc.nextstate, Rc::new(Token::extend(tok, arc, acoustic_cost)));
            }
        }
        drop(last);

        if self.toks.is_empty() {
            tracing::warn!(frame, "all tokens pruned");
            return Err(DecodeError::NoHypothesis { frame }.into());
        }

        Ok(self.prune())
    }

    /// Close the frontier under ε-arcs, keeping tokens within `cutoff`.
    ///
    /// A state is revisited only when it gets strictly cheaper, so ε-cycles
    /// without negative cost terminate.
    pub(super) fn process_nonemitting(&mut self, cutoff: f32) -> Result<()> {
        let fst = self.fst;
        let mut queue: VecDeque<StateId> = self.toks.iter().map(|(state, _)| state).collect();

        while let Some(state) = queue.pop_front() {
            let Some(tok) = self.toks.get(state).cloned() else {
                continue;
            };
            if tok.cost() > cutoff {
                continue;
            }

            let trs = fst.get_trs(state)?;
            for arc in trs.trs().iter().filter(|a| !is_emitting(a)) {
                let total = tok.cost() + cost(&arc.weight);
                if total.is_nan() || total > cutoff || total == f32::INFINITY {
                    continue;
                }
                if self.is_covered(arc.nextstate, total) {
                    continue;
                }

                self.toks
                    .insert(arc.nextstate, Rc::new(Token::extend(&tok, arc, 0.0)));
                queue.push_back(arc.nextstate);
            }
        }

        Ok(())
    }

    /// Whether `state` already holds a token at most `total` in cost.
    fn is_covered(&self, state: StateId, total: f32) -> bool {
        self.toks.get(state).is_some_and(|tok| tok.cost() <= total)
    }

    /// Drop tokens beyond the beam, tightened to `max_active` survivors and
    /// widened to `min_active` survivors. Returns the cutoff applied.
    fn prune(&mut self) -> f32 {
        let mut costs: Vec<f32> = self.toks.tokens().map(|t| t.cost()).collect();
        let best = costs.iter().copied().fold(f32::INFINITY, f32::min);
        let max_active = self.config.max_active;

        let mut cutoff = best + self.config.beam;
        if max_active < costs.len() {
            cutoff = cutoff.min(nth_smallest(&mut costs, max_active - 1));
        }
        if self.config.min_active > 0 {
            let n = self.config.min_active.min(costs.len());
            cutoff = cutoff.max(nth_smallest(&mut costs, n - 1));
        }

        let before = self.toks.len();
        self.toks.retain(|_, tok| tok.cost() <= cutoff);

        // Ties at the cutoff may still overflow the cap; the earliest
        // inserted of them survive.
        if self.toks.len() > max_active {
            let below = self.toks.tokens().filter(|t| t.cost() < cutoff).count();
            let mut ties = max_active.saturating_sub(below);
            self.toks.retain(|_, tok| {
                if tok.cost() < cutoff {
                    return true;
                }
                let keep = ties > 0;
                ties = ties.saturating_sub(1);
                keep
            });
        }

        tracing::trace!(
            frame = self.frame,
            best,
            cutoff,
            before,
            after = self.toks.len(),
            "pruned frame"
        );

        cutoff
    }
}

/// The `n`-th smallest cost (zero-based). Reorders `costs`.
fn nth_smallest(costs: &mut [f32], n: usize) -> f32 {
    let (_, nth, _) = costs.select_nth_unstable_by(n, f32::total_cmp);
    *nth
}
