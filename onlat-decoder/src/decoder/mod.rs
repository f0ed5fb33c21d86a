//! Token-passing Viterbi decoder with partial traceback.
//!
//! The decoder advances a frontier of [`Token`]s through the decoding graph
//! one frame at a time. Between frames it can commit the prefix that every
//! surviving hypothesis shares (see [`Decoder::partial_traceback`]).

mod active;
mod endpoint;
mod search;
mod token;
mod traceback;

pub use active::ActiveTokens;
pub use token::{Chain, Token};

use crate::config::DecoderConfig;
use crate::error::{GraphError, Result};
use crate::fst::{EPS_LABEL, cost, final_weight};
use crate::scorer::Scorer;
use rustfst::prelude::{CoreFst, Semiring, Tr, TropicalWeight};
use std::rc::Rc;

/// Online token-passing decoder over a borrowed graph.
pub struct Decoder<'a, F: CoreFst<TropicalWeight> + ?Sized> {
    fst: &'a F,
    config: DecoderConfig,
    toks: ActiveTokens,
    /// Next frame to decode, counted across utterances unless fully reset
    frame: usize,
    /// Frames decoded in the current utterance
    utt_frames: usize,
    immortal: Rc<Token>,
    prev_immortal: Rc<Token>,
}

impl<'a, F: CoreFst<TropicalWeight> + ?Sized> Decoder<'a, F> {
    /// Create a decoder positioned at the start of an utterance.
    pub fn new(fst: &'a F, config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        let root = Self::root_token(fst)?;

        let mut toks = ActiveTokens::new();
        toks.insert(root.arc().nextstate, Rc::clone(&root));

        Ok(Self {
            fst,
            config,
            toks,
            frame: 0,
            utt_frames: 0,
            immortal: Rc::clone(&root),
            prev_immortal: root,
        })
    }

    fn root_token(fst: &F) -> Result<Rc<Token>> {
        let start = fst.start().ok_or(GraphError::NoStartState)?;
        let arc = Tr::new(EPS_LABEL, EPS_LABEL, TropicalWeight::one(), start);
        Ok(Rc::new(Token::root(arc)))
    }

    /// Start a new utterance.
    ///
    /// Clears the frontier and plants a fresh root token. With `full` the
    /// frame counter restarts at zero too; otherwise it keeps counting so the
    /// decoder stays aligned with a scorer that was not reset.
    pub fn reset(&mut self, full: bool) -> Result<()> {
        let root = Self::root_token(self.fst)?;

        self.toks.clear();
        self.toks.insert(root.arc().nextstate, Rc::clone(&root));
        self.immortal = Rc::clone(&root);
        self.prev_immortal = root;
        self.utt_frames = 0;
        if full {
            self.frame = 0;
        }

        tracing::debug!(full, frame = self.frame, "decoder reset");
        Ok(())
    }

    /// Decode every frame the scorer has ready.
    ///
    /// Returns the number of frames consumed; zero is a valid result when the
    /// scorer has nothing new. Fails with
    /// [`DecodeError::NoHypothesis`](crate::error::DecodeError::NoHypothesis)
    /// if pruning empties the frontier.
    pub fn decode(&mut self, scorer: &mut impl Scorer) -> Result<usize> {
        if self.utt_frames == 0 {
            self.process_nonemitting(f32::INFINITY)?;
        }

        let mut processed = 0;
        while self.frame < scorer.num_frames_ready() {
            let cutoff = self.process_emitting(scorer)?;
            self.process_nonemitting(cutoff)?;

            self.frame += 1;
            self.utt_frames += 1;
            processed += 1;
        }

        tracing::debug!(
            processed,
            frame = self.frame,
            active = self.toks.len(),
            "decode finished"
        );

        Ok(processed)
    }

    /// Whether some live token sits on a final state.
    pub fn reached_final(&self) -> bool {
        self.toks
            .iter()
            .any(|(state, tok)| tok.cost() + cost(&final_weight(self.fst, state)) < f32::INFINITY)
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn fst(&self) -> &'a F {
        self.fst
    }

    /// Next frame to be decoded.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Frames decoded since the last reset.
    pub fn utt_frames(&self) -> usize {
        self.utt_frames
    }

    pub fn active_tokens(&self) -> &ActiveTokens {
        &self.toks
    }

    /// Latest token shared by every live hypothesis, as of the last update.
    pub fn immortal_token(&self) -> &Rc<Token> {
        &self.immortal
    }

    /// Immortal token before the last update.
    pub fn prev_immortal_token(&self) -> &Rc<Token> {
        &self.prev_immortal
    }
}
