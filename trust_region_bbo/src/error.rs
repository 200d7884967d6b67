//! Error types for the trust-region optimizer.

use std::fmt;
use std::io;

/// Result type for trust-region BBO operations.
pub type Result<T> = std::result::Result<T, BboError>;

/// Invalid configuration detected before (or while) a run starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A surrogate method name that matches none of the known methods.
    UnknownMethod(String),
    /// A parameter outside its admissible range.
    InvalidParam {
        param: &'static str,
        message: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod(name) => write!(
                f,
                "Unknown surrogate method '{}' (expected one of: value, first_order, second_order, anchor)",
                name
            ),
            Self::InvalidParam { param, message } => {
                write!(f, "Invalid configuration for '{}': {}", param, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors surfaced by the optimizer and its persistence collaborators.
#[derive(Debug)]
pub enum BboError {
    /// Configuration rejected.
    Config(ConfigError),
    /// The replay buffer is too small for a single minibatch.
    EmptyMinibatch { replay_len: usize, batch: usize },
    /// A batch of points/rewards whose sizes disagree with the problem dimension.
    DimensionMismatch { expected: usize, actual: usize },
    /// IO error while persisting results or checkpoints.
    Io(io::Error),
    /// JSON (de)serialization failure.
    Serialization(serde_json::Error),
    /// Burn recorder error while saving or loading surrogate weights.
    Recorder(String),
    /// Tensor data could not be read back to the host.
    Tensor(String),
    /// A persisted metric series that cannot be appended to or read back.
    CorruptMetrics { key: String, message: String },
    /// No checkpoint stored under the requested tag.
    MissingCheckpoint(usize),
    /// The objective returned no finite value for a batch (or the start point).
    NonFiniteRewards { frame: usize },
    /// `step()` called after the run reached a terminal state.
    Finished,
}

impl fmt::Display for BboError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::EmptyMinibatch { replay_len, batch } => write!(
                f,
                "cannot form any minibatch: replay buffer holds {} samples, batch size is {}",
                replay_len, batch
            ),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Recorder(e) => write!(f, "Recorder error: {}", e),
            Self::Tensor(e) => write!(f, "Tensor data error: {}", e),
            Self::CorruptMetrics { key, message } => {
                write!(f, "Corrupt metric series '{}': {}", key, message)
            }
            Self::MissingCheckpoint(tag) => write!(f, "No checkpoint found for tag {}", tag),
            Self::NonFiniteRewards { frame } => {
                write!(f, "Objective returned no finite reward at frame {}", frame)
            }
            Self::Finished => write!(f, "Minimizer already reached a terminal state"),
        }
    }
}

impl std::error::Error for BboError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for BboError {
    fn from(e: ConfigError) -> Self {
        BboError::Config(e)
    }
}

impl From<io::Error> for BboError {
    fn from(e: io::Error) -> Self {
        BboError::Io(e)
    }
}

impl From<serde_json::Error> for BboError {
    fn from(e: serde_json::Error) -> Self {
        BboError::Serialization(e)
    }
}
