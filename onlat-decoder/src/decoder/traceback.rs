//! Immortal-token tracking and lattice construction from token chains.

use super::{Decoder, Token};
use crate::error::Result;
use crate::fst::{cost, final_weight, is_emitting};
use crate::lattice::{Lattice, LatticeArc, LatticeWeight, SplitCost};
use rustfst::prelude::{CoreFst, Semiring, TropicalWeight};
use std::collections::HashSet;
use std::ptr;
use std::rc::Rc;

impl<F: CoreFst<TropicalWeight> + ?Sized> Decoder<'_, F> {
    /// Commit the prefix shared by every live hypothesis.
    ///
    /// Returns the segment decoded since the previous commit, or `None` if
    /// the shared prefix has not moved. Segments from successive calls chain
    /// up without gaps or overlap.
    pub fn partial_traceback(&mut self) -> Result<Option<Lattice>> {
        self.update_immortal_token();
        if Rc::ptr_eq(&self.immortal, &self.prev_immortal) {
            return Ok(None);
        }

        let lat = self.make_lattice(Some(&self.immortal), Some(&self.prev_immortal))?;
        tracing::debug!(
            frame = self.frame,
            arcs = lat.num_arcs(),
            "committed partial traceback"
        );
        Ok(Some(lat))
    }

    /// Best path from the last commit to the end of the decoded audio.
    ///
    /// Prefers tokens on final states when there are any. Returns an empty
    /// lattice when no token is alive.
    pub fn finish_traceback(&self) -> Result<Lattice> {
        let best = if self.reached_final() {
            self.best_final_token()
        } else {
            self.toks.best().map(|(_, tok)| tok)
        };

        match best {
            Some(best) => self.make_lattice(Some(best), Some(&self.immortal)),
            None => Ok(Lattice::new()),
        }
    }

    /// Best path over the last `nframes` frames, ignoring commits.
    ///
    /// The returned lattice holds exactly `nframes` emitting arcs unless the
    /// utterance is shorter, plus any ε-arcs in between.
    pub fn traceback_n_frames(&self, nframes: usize) -> Result<Lattice> {
        let Some((_, best)) = self.toks.best() else {
            return Ok(Lattice::new());
        };

        let mut remaining = nframes;
        let arcs: Vec<LatticeArc> = best
            .chain()
            .take_while(|tok| {
                if remaining == 0 {
                    return false;
                }
                if is_emitting(tok.arc()) {
                    remaining -= 1;
                }
                true
            })
            .filter(|tok| !tok.is_root())
            .map(Token::lattice_arc)
            .collect();

        self.build_lattice(best, arcs)
    }

    /// Cheapest live token after adding its state's final cost.
    fn best_final_token(&self) -> Option<&Rc<Token>> {
        let mut best: Option<(&Rc<Token>, f32)> = None;

        for (state, tok) in self.toks.iter() {
            let total = tok.cost() + cost(&final_weight(self.fst, state));
            if total == f32::INFINITY {
                continue;
            }
            if best.is_none_or(|(_, b)| total < b) {
                best = Some((tok, total));
            }
        }

        best.map(|(tok, _)| tok)
    }

    /// Move the immortal token forward to the latest emitting token that all
    /// live hypotheses pass through.
    fn update_immortal_token(&mut self) {
        let mut emitting = distinct_emitting(self.toks.tokens().map(Some));
        while emitting.len() > 1 {
            emitting = distinct_emitting(emitting.into_iter().map(|tok| tok.prev()));
        }

        // An empty set means the hypotheses only share the root.
        if let [immortal] = emitting.as_slice() {
            let immortal = Rc::clone(*immortal);
            self.prev_immortal = std::mem::replace(&mut self.immortal, immortal);
        }
    }

    /// Linear lattice over the arcs from `end` (exclusive) to `start`
    /// (inclusive). The root is never part of the result.
    fn make_lattice(&self, start: Option<&Rc<Token>>, end: Option<&Rc<Token>>) -> Result<Lattice> {
        let Some(start) = start else {
            return Ok(Lattice::new());
        };

        let arcs: Vec<LatticeArc> = start
            .chain()
            .take_while(|tok| !end.is_some_and(|end| ptr::eq(*tok, Rc::as_ptr(end))))
            .filter(|tok| !tok.is_root())
            .map(Token::lattice_arc)
            .collect();

        self.build_lattice(start, arcs)
    }

    /// Assemble arcs collected newest-first into a linear lattice whose final
    /// weight is the graph's final cost at `last`, if final.
    fn build_lattice(&self, last: &Token, arcs: Vec<LatticeArc>) -> Result<Lattice> {
        let graph_final = cost(&final_weight(self.fst, last.arc().nextstate));
        let final_weight = if last.cost() + graph_final == f32::INFINITY {
            LatticeWeight::one()
        } else {
            LatticeWeight::from_costs(graph_final, 0.0)
        };

        let mut lat = Lattice::linear(arcs.into_iter().rev(), final_weight)?;
        lat.remove_eps_local()?;
        Ok(lat)
    }
}

/// Nearest emitting token at or before each of `toks`, without duplicates.
fn distinct_emitting<'t>(toks: impl Iterator<Item = Option<&'t Rc<Token>>>) -> Vec<&'t Rc<Token>> {
    let mut seen = HashSet::new();
    toks.filter_map(Token::skip_epsilons)
        .filter(|tok| seen.insert(Rc::as_ptr(*tok)))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::config::DecoderConfig;
    use crate::decoder::Decoder;
    use crate::fst::{StdVectorFst, from_text};
    use crate::lattice::{LatticeWeight, SplitCost};
    use crate::scorer::MatrixScorer;
    use ndarray::array;
    use std::rc::Rc;

    /// Word 10 on label 1, then either label 2 or label 3 looping forever.
    fn fork() -> StdVectorFst {
        from_text("0 1 1 10 0.5\n1 2 2 20\n1 3 3 30\n2 2 2 0\n3 3 3 0\n2\n3 2\n").unwrap()
    }

    #[test]
    fn commits_shared_prefix_once() {
        let fst = fork();
        let mut decoder = Decoder::new(&fst, DecoderConfig::default()).unwrap();
        let mut scorer = MatrixScorer::new(array![[0.0, -9.0, -9.0], [-9.0, -1.0, -1.0]], 1.0);

        decoder.decode(&mut scorer).unwrap();

        let committed = decoder.partial_traceback().unwrap().unwrap();
        let path = committed.linear_symbol_sequence().unwrap();
        assert_eq!(path.ilabels, vec![1]);
        assert_eq!(path.olabels, vec![10]);
        assert_eq!(path.weight, LatticeWeight::from_costs(0.5, 0.0));

        assert!(decoder.partial_traceback().unwrap().is_none());
    }

    #[test]
    fn no_commit_before_hypotheses_merge() {
        let fst = fork();
        let mut decoder = Decoder::new(&fst, DecoderConfig::default()).unwrap();
        assert!(decoder.partial_traceback().unwrap().is_none());
        assert!(Rc::ptr_eq(decoder.immortal_token(), decoder.prev_immortal_token()));
    }

    #[test]
    fn finish_prefers_final_states() {
        let fst = fork();
        let mut decoder = Decoder::new(&fst, DecoderConfig::default()).unwrap();
        // label 3 is cheaper acoustically but its state has final cost 2
        let mut scorer = MatrixScorer::new(array![[0.0, -9.0, -9.0], [-9.0, -1.0, -0.5]], 1.0);
        decoder.decode(&mut scorer).unwrap();

        let best = decoder.finish_traceback().unwrap().linear_symbol_sequence().unwrap();

        assert_eq!(best.olabels, vec![10, 20]);
        assert_eq!(best.weight, LatticeWeight::from_costs(0.5, 1.0));
    }

    #[test]
    fn finish_after_commit_covers_the_rest() {
        let fst = fork();
        let mut decoder = Decoder::new(&fst, DecoderConfig::default()).unwrap();
        let mut scorer = MatrixScorer::new(array![[0.0, -9.0, -9.0], [-9.0, -1.0, -1.5]], 1.0);
        decoder.decode(&mut scorer).unwrap();

        let head = decoder.partial_traceback().unwrap().unwrap();
        let tail = decoder.finish_traceback().unwrap();

        assert_eq!(head.linear_symbol_sequence().unwrap().olabels, vec![10]);
        let tail = tail.linear_symbol_sequence().unwrap();
        assert_eq!(tail.ilabels, vec![2]);
        assert_eq!(tail.olabels, vec![20]);
    }

    #[test]
    fn traceback_n_frames_counts_emitting_arcs() {
        let fst = fork();
        let mut decoder = Decoder::new(&fst, DecoderConfig::default()).unwrap();
        let mut scorer = MatrixScorer::new(
            array![[0.0, -9.0, -9.0], [-9.0, -1.0, -5.0], [-9.0, -1.0, -5.0], [-9.0, -1.0, -5.0]],
            1.0,
        );
        decoder.decode(&mut scorer).unwrap();

        let last_two = decoder.traceback_n_frames(2).unwrap().linear_symbol_sequence().unwrap();
        assert_eq!(last_two.ilabels, vec![2, 2]);

        let everything = decoder.traceback_n_frames(100).unwrap().linear_symbol_sequence().unwrap();
        assert_eq!(everything.ilabels, vec![1, 2, 2, 2]);
        assert_eq!(everything.olabels, vec![10, 20]);
    }

    #[test]
    fn traceback_on_fresh_decoder_is_empty_path() {
        let fst = fork();
        let decoder = Decoder::new(&fst, DecoderConfig::default()).unwrap();

        let path = decoder.traceback_n_frames(5).unwrap().linear_symbol_sequence().unwrap();
        assert!(path.ilabels.is_empty());
        assert!(decoder.finish_traceback().unwrap().num_arcs() == 0);
    }
}
