//! Decoder and recogniser configuration.

use crate::error::{ConfigError, Result};
use crate::transition::Phone;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default beam width
const DEFAULT_BEAM: f32 = 16.0;

/// Default trailing silence (frames) marking an utterance boundary
const DEFAULT_INTER_UTT_SIL: usize = 50;

/// Default utterance length (frames) at which the silence requirement halves
const DEFAULT_MAX_UTT_LEN: usize = 1500;

/// Default acoustic scale applied to log-likelihoods
const DEFAULT_ACOUSTIC_SCALE: f32 = 0.1;

/// Search and end-of-utterance parameters.
#[derive(clap::Args, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Beam width: tokens costlier than best + beam are pruned
    #[arg(long, default_value_t = DEFAULT_BEAM)]
    pub beam: f32,

    /// Maximum number of active tokens per frame (at least one)
    #[arg(long, default_value_t = usize::MAX)]
    pub max_active: usize,

    /// Minimum number of active tokens per frame (widens the beam)
    #[arg(long, default_value_t = 0)]
    pub min_active: usize,

    /// Trailing silence frames that mark the end of an utterance
    #[arg(long, default_value_t = DEFAULT_INTER_UTT_SIL)]
    pub inter_utt_sil: usize,

    /// Utterance length in frames at which the silence requirement halves
    #[arg(long, default_value_t = DEFAULT_MAX_UTT_LEN)]
    pub max_utt_len: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            beam: DEFAULT_BEAM,
            max_active: usize::MAX,
            min_active: 0,
            inter_utt_sil: DEFAULT_INTER_UTT_SIL,
            max_utt_len: DEFAULT_MAX_UTT_LEN,
        }
    }
}

impl DecoderConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.beam.is_nan() || self.beam <= 0.0 {
            return Err(ConfigError::InvalidBeam(self.beam).into());
        }
        if self.max_active == 0 || self.min_active > self.max_active {
            return Err(ConfigError::InvalidActiveRange {
                min: self.min_active,
                max: self.max_active,
            }
            .into());
        }
        if self.max_utt_len == 0 {
            return Err(ConfigError::InvalidMaxUttLen.into());
        }
        Ok(())
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Trailing silence frames required after `utt_frames` frames.
    ///
    /// Shrinks as the utterance grows, never below one frame.
    pub fn silence_frames(&self, utt_frames: usize) -> usize {
        (self.inter_utt_sil / (1 + utt_frames / self.max_utt_len.max(1))).max(1)
    }
}

/// Recogniser parameters.
#[derive(clap::Args, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecogniserConfig {
    /// Scale applied to acoustic log-likelihoods
    #[arg(long, default_value_t = DEFAULT_ACOUSTIC_SCALE)]
    pub acoustic_scale: f32,

    /// Colon-separated silence phone ids (e.g. 1:2:3)
    #[arg(long, value_delimiter = ':')]
    pub silence_phones: Vec<Phone>,

    #[command(flatten)]
    pub decoder: DecoderConfig,
}

impl Default for RecogniserConfig {
    fn default() -> Self {
        Self {
            acoustic_scale: DEFAULT_ACOUSTIC_SCALE,
            silence_phones: Vec::new(),
            decoder: DecoderConfig::default(),
        }
    }
}

impl RecogniserConfig {
    pub fn validate(&self) -> Result<()> {
        if self.acoustic_scale.is_nan() || self.acoustic_scale <= 0.0 {
            return Err(ConfigError::InvalidAcousticScale(self.acoustic_scale).into());
        }
        self.decoder.validate()
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn default_config_is_valid() {
        assert!(DecoderConfig::default().validate().is_ok());
        assert!(RecogniserConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_beam() {
        let config = DecoderConfig {
            beam: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidBeam(_)))
        ));

        let config = DecoderConfig {
            beam: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_active_range() {
        let config = DecoderConfig {
            min_active: 10,
            max_active: 5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidActiveRange { min: 10, max: 5 }))
        ));
    }

    #[test]
    fn rejects_zero_max_utt_len() {
        let config = DecoderConfig {
            max_utt_len: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn silence_frames_decay_with_utterance_length() {
        let config = DecoderConfig {
            inter_utt_sil: 50,
            max_utt_len: 100,
            ..Default::default()
        };

        assert_eq!(config.silence_frames(0), 50);
        assert_eq!(config.silence_frames(99), 50);
        assert_eq!(config.silence_frames(100), 25);
        assert_eq!(config.silence_frames(250), 16);

        let mut last = usize::MAX;
        for utt_frames in (0..100_000).step_by(37) {
            let frames = config.silence_frames(utt_frames);
            assert!(frames <= last);
            assert!(frames >= 1);
            last = frames;
        }
    }

    #[test]
    fn parses_partial_json() {
        let config: DecoderConfig = serde_json::from_str(r#"{"beam": 10.0, "min_active": 5}"#).unwrap();

        assert_eq!(config.beam, 10.0);
        assert_eq!(config.min_active, 5);
        assert_eq!(config.max_utt_len, DEFAULT_MAX_UTT_LEN);
    }

    #[test]
    fn parses_recogniser_json_with_nested_decoder() {
        let config: RecogniserConfig =
            serde_json::from_str(r#"{"silence_phones": [1, 2], "decoder": {"beam": 8.0}}"#).unwrap();

        assert_eq!(config.silence_phones, vec![1, 2]);
        assert_eq!(config.decoder.beam, 8.0);
        assert_eq!(config.acoustic_scale, DEFAULT_ACOUSTIC_SCALE);
    }
}
