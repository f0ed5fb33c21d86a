//! Online recogniser: audio in, committed and best hypotheses out.
//!
//! [`OnlineRecogniser`] feeds raw PCM into an [`AcousticFrontend`], advances a
//! [`Decoder`] over the frames the frontend has ready and accumulates the
//! prefixes the decoder commits along the way.

use crate::config::RecogniserConfig;
use crate::decoder::Decoder;
use crate::error::Result;
use crate::fst::Label;
use crate::lattice::{Lattice, SplitCost};
use crate::scorer::{FrameBudget, Scorer};
use crate::transition::TransitionModel;
use rustfst::prelude::{CoreFst, TropicalWeight};

/// Feature pipeline plus acoustic model.
pub trait AcousticFrontend {
    /// Append audio samples, nominally in `[-1, 1]`.
    fn accept_waveform(&mut self, samples: &[f32]);

    /// No more audio will arrive for this utterance.
    fn input_finished(&mut self);

    /// Frames whose likelihoods can be queried.
    fn num_frames_ready(&self) -> usize;

    /// Log-likelihood of transition id `tid` at `frame`.
    fn log_likelihood(&mut self, frame: usize, tid: Label) -> f32;

    /// Drop all buffered audio and features.
    fn reset(&mut self);
}

/// Scores frontend frames for the search.
struct FrontendScorer<'f, A: ?Sized> {
    frontend: &'f mut A,
    acoustic_scale: f32,
}

impl<A: AcousticFrontend + ?Sized> Scorer for FrontendScorer<'_, A> {
    fn acoustic_cost(&mut self, frame: usize, ilabel: Label) -> f32 {
        -self.acoustic_scale * self.frontend.log_likelihood(frame, ilabel)
    }

    fn num_frames_ready(&self) -> usize {
        self.frontend.num_frames_ready()
    }
}

/// Best hypothesis of the current utterance.
#[derive(Clone, Debug, PartialEq)]
pub struct BestPath {
    /// Output labels (word ids)
    pub words: Vec<Label>,
    /// Negated total cost
    pub likelihood: f32,
}

pub struct OnlineRecogniser<'a, F: CoreFst<TropicalWeight> + ?Sized, A, T: ?Sized> {
    decoder: Decoder<'a, F>,
    frontend: A,
    trans_model: &'a T,
    config: RecogniserConfig,
    /// Prefixes committed so far in this utterance
    committed: Lattice,
    /// Low byte of a sample split across `frame_in` calls
    pending_byte: Option<u8>,
}

impl<'a, F, A, T> OnlineRecogniser<'a, F, A, T>
where
    F: CoreFst<TropicalWeight> + ?Sized,
    A: AcousticFrontend,
    T: TransitionModel + ?Sized,
{
    pub fn new(fst: &'a F, trans_model: &'a T, frontend: A, config: RecogniserConfig) -> Result<Self> {
        config.validate()?;
        let decoder = Decoder::new(fst, config.decoder)?;

        Ok(Self {
            decoder,
            frontend,
            trans_model,
            config,
            committed: Lattice::one(),
            pending_byte: None,
        })
    }

    /// Feed 16-bit little-endian PCM.
    ///
    /// A trailing odd byte is kept and joined with the first byte of the next
    /// call.
    pub fn frame_in(&mut self, bytes: &[u8]) {
        let mut buffered = Vec::with_capacity(bytes.len() + 1);
        buffered.extend(self.pending_byte.take());
        buffered.extend_from_slice(bytes);

        let chunks = buffered.chunks_exact(2);
        self.pending_byte = chunks.remainder().first().copied();

        let samples: Vec<f32> = chunks
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / i16::MAX as f32)
            .collect();

        tracing::trace!(samples = samples.len(), "audio in");
        self.frontend.accept_waveform(&samples);
    }

    /// Decode up to `max_frames` frames and commit whatever prefix became
    /// stable. Returns the number of frames decoded.
    pub fn decode(&mut self, max_frames: usize) -> Result<usize> {
        let scorer = FrontendScorer {
            frontend: &mut self.frontend,
            acoustic_scale: self.config.acoustic_scale,
        };
        let mut scorer = FrameBudget::new(scorer, self.decoder.frame(), max_frames);
        let decoded = self.decoder.decode(&mut scorer)?;

        if let Some(segment) = self.decoder.partial_traceback()? {
            self.committed.append_segment(segment)?;
        }

        Ok(decoded)
    }

    /// Mark the end of audio and decode every remaining frame.
    pub fn finalize_decoding(&mut self) -> Result<usize> {
        self.frontend.input_finished();
        self.decode(usize::MAX)
    }

    /// Best hypothesis so far: committed prefixes followed by the best
    /// uncommitted tail. `None` when no hypothesis is alive.
    pub fn get_best_path(&self) -> Result<Option<BestPath>> {
        let lat = self.full_lattice()?;
        if lat.is_empty() {
            return Ok(None);
        }

        Ok(lat.linear_symbol_sequence().map(|path| BestPath {
            words: path.olabels,
            likelihood: -path.weight.cost(),
        }))
    }

    /// Lattice of the whole utterance and its total log-likelihood.
    ///
    /// With `end_of_utt` the remaining audio is decoded first.
    pub fn get_lattice(&mut self, end_of_utt: bool) -> Result<(Lattice, f32)> {
        if end_of_utt {
            self.finalize_decoding()?;
        }

        let lat = self.full_lattice()?;
        let tot_lik = lat
            .total_cost()
            .map(|w| -w.cost())
            .filter(|lik| lik.is_finite())
            .unwrap_or(f32::NEG_INFINITY);

        Ok((lat, tot_lik))
    }

    /// Whether the recent audio is trailing silence.
    pub fn end_of_utterance(&self) -> Result<bool> {
        self.decoder
            .end_of_utterance(self.trans_model, &self.config.silence_phones)
    }

    /// Start a new utterance. With `reset_pipeline` the frontend is reset and
    /// frame numbering restarts; otherwise the frontend keeps streaming.
    pub fn reset(&mut self, reset_pipeline: bool) -> Result<()> {
        self.decoder.reset(reset_pipeline)?;
        self.committed = Lattice::one();
        if reset_pipeline {
            self.frontend.reset();
            self.pending_byte = None;
        }
        Ok(())
    }

    /// Prefixes committed so far.
    pub fn committed(&self) -> &Lattice {
        &self.committed
    }

    pub fn decoder(&self) -> &Decoder<'a, F> {
        &self.decoder
    }

    pub fn frontend(&self) -> &A {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut A {
        &mut self.frontend
    }

    pub fn config(&self) -> &RecogniserConfig {
        &self.config
    }

    fn full_lattice(&self) -> Result<Lattice> {
        self.committed.followed_by(&self.decoder.finish_traceback()?)
    }
}
