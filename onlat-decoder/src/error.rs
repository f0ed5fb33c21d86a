//! Error types for onlat-decoder organized by processing stage.

use thiserror::Error;

/// Decoder error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Decoding graph error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Search error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// FST operation failed inside rustfst
    #[error(transparent)]
    Fst(#[from] anyhow::Error),

    /// IO error while reading graphs, tables or scores
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Beam must be a positive number
    #[error("invalid beam: {0} (must be positive)")]
    InvalidBeam(f32),

    /// Frontier caps are inverted or allow no token at all
    #[error("invalid active range: min_active {min}, max_active {max}")]
    InvalidActiveRange { min: usize, max: usize },

    /// Utterance length used as a divisor
    #[error("invalid max_utt_len: must be at least one frame")]
    InvalidMaxUttLen,

    /// Acoustic scale must be positive
    #[error("invalid acoustic scale: {0} (must be positive)")]
    InvalidAcousticScale(f32),

    /// JSON configuration file error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Decoding graph, transition table and score file errors.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph has no start state
    #[error("decoding graph has no start state")]
    NoStartState,

    /// State id too large for the size of the graph text
    #[error("state {state} out of range (limit {limit} for this graph)")]
    StateOutOfRange { state: u32, limit: usize },

    /// Malformed line in a text file
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Search errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Every hypothesis was pruned away
    #[error("no hypothesis survived frame {frame}")]
    NoHypothesis { frame: usize },

    /// Appended score rows have the wrong width
    #[error("score dimension mismatch: expected {expected} labels, got {got}")]
    ScoreDimension { expected: usize, got: usize },

    /// ndarray shape error
    #[error("score matrix shape error: {0}")]
    Shape(String),
}

/// Result type alias for onlat-decoder operations.
pub type Result<T> = std::result::Result<T, Error>;

impl GraphError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        GraphError::Parse {
            line,
            message: message.into(),
        }
    }
}

// Nested From implementations for automatic error conversion chains

// serde_json::Error → ConfigError → Error
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(ConfigError::Json(e))
    }
}
