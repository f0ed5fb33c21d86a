//! End-of-utterance detection from trailing silence.

use super::Decoder;
use crate::error::Result;
use crate::transition::{Phone, TransitionModel};
use rustfst::prelude::{CoreFst, TropicalWeight};

impl<F: CoreFst<TropicalWeight> + ?Sized> Decoder<'_, F> {
    /// Whether the recent best path is nothing but silence.
    ///
    /// Looks back over [`DecoderConfig::silence_frames`] frames, which shrinks
    /// as the utterance grows. An empty look-back is never an endpoint, and
    /// neither is a phone the transition model does not know.
    ///
    /// [`DecoderConfig::silence_frames`]: crate::config::DecoderConfig::silence_frames
    pub fn end_of_utterance<T>(&self, trans_model: &T, silence_phones: &[Phone]) -> Result<bool>
    where
        T: TransitionModel + ?Sized,
    {
        let sil_frames = self.config.silence_frames(self.utt_frames);
        let trace = self.traceback_n_frames(sil_frames)?;

        let Some(path) = trace.linear_symbol_sequence() else {
            return Ok(false);
        };
        if path.ilabels.is_empty() {
            return Ok(false);
        }

        let phones = trans_model.split_to_phones(&path.ilabels);
        let silent = phones.iter().all(|group| {
            group
                .first()
                .and_then(|&tid| trans_model.transition_id_to_phone(tid))
                .is_some_and(|phone| silence_phones.contains(&phone))
        });

        tracing::debug!(
            utt_frames = self.utt_frames,
            sil_frames,
            phones = phones.len(),
            silent,
            "end-of-utterance check"
        );

        Ok(silent)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DecoderConfig;
    use crate::decoder::Decoder;
    use crate::fst::{StdVectorFst, from_text};
    use crate::scorer::MatrixScorer;
    use crate::transition::TransitionTable;
    use ndarray::Array2;

    // Phone 1 is speech (tids 1, 2), phone 2 is silence (tids 3, 4).
    fn transitions() -> TransitionTable {
        TransitionTable::from_text("1 1 0\n2 1 1\n3 2 0\n4 2 1\n").unwrap()
    }

    /// Speech loop on state 0, silence loop on state 1.
    fn speech_then_silence() -> StdVectorFst {
        from_text("0 0 1 7\n0 1 3 0\n1 1 3 0\n1\n").unwrap()
    }

    fn config(inter_utt_sil: usize) -> DecoderConfig {
        DecoderConfig {
            inter_utt_sil,
            ..Default::default()
        }
    }

    /// Scores where label 1 wins for `speech` frames, then label 3.
    fn scores(speech: usize, silence: usize) -> MatrixScorer {
        let mut loglikes = Array2::from_elem((speech + silence, 4), -10.0);
        for t in 0..speech {
            loglikes[[t, 0]] = 0.0;
        }
        for t in speech..speech + silence {
            loglikes[[t, 2]] = 0.0;
        }
        MatrixScorer::new(loglikes, 1.0)
    }

    #[test]
    fn detects_trailing_silence() {
        let fst = speech_then_silence();
        let mut decoder = Decoder::new(&fst, config(5)).unwrap();
        decoder.decode(&mut scores(10, 6)).unwrap();

        assert!(decoder.end_of_utterance(&transitions(), &[2]).unwrap());
    }

    #[test]
    fn short_silence_is_not_an_endpoint() {
        let fst = speech_then_silence();
        let mut decoder = Decoder::new(&fst, config(5)).unwrap();
        decoder.decode(&mut scores(10, 3)).unwrap();

        assert!(!decoder.end_of_utterance(&transitions(), &[2]).unwrap());
    }

    #[test]
    fn requires_a_silence_phone() {
        let fst = speech_then_silence();
        let mut decoder = Decoder::new(&fst, config(5)).unwrap();
        decoder.decode(&mut scores(10, 6)).unwrap();

        assert!(!decoder.end_of_utterance(&transitions(), &[1]).unwrap());
        assert!(!decoder.end_of_utterance(&transitions(), &[]).unwrap());
    }

    #[test]
    fn fresh_decoder_is_never_at_endpoint() {
        let fst = speech_then_silence();
        let decoder = Decoder::new(&fst, config(5)).unwrap();

        assert!(!decoder.end_of_utterance(&transitions(), &[2]).unwrap());
    }

    #[test]
    fn unknown_transition_is_not_silence() {
        let fst = speech_then_silence();
        let mut decoder = Decoder::new(&fst, config(5)).unwrap();
        decoder.decode(&mut scores(10, 6)).unwrap();

        let partial = TransitionTable::from_text("1 1 0\n2 1 1\n").unwrap();
        assert!(!decoder.end_of_utterance(&partial, &[2]).unwrap());
    }

    #[test]
    fn once_at_endpoint_more_silence_keeps_it() {
        let fst = speech_then_silence();
        let mut decoder = Decoder::new(&fst, config(5)).unwrap();
        let mut scorer = scores(10, 20);
        let trans = transitions();

        let mut seen = false;
        for frame in 1..=30 {
            decoder
                .decode(&mut crate::scorer::FrameBudget::new(&mut scorer, 0, frame))
                .unwrap();
            let eou = decoder.end_of_utterance(&trans, &[2]).unwrap();
            assert!(!seen || eou, "endpoint lost at frame {frame}");
            seen |= eou;
        }
        assert!(seen);
    }
}
