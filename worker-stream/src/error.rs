//! Error types for worker streams

use serde_json::Value;
use thiserror::Error;

/// Result type alias for worker stream operations
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Worker stream error types
///
/// Every variant is delivered through a stream's error channel; none of them is
/// raised synchronously from `post_message`. Errors are `Clone` so a shared subject
/// can hand the same terminal error to every subscriber.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerError {
    /// The thread primitive could not be created
    #[error("Worker construction failed: {0}")]
    Construction(String),

    /// The thread signalled an error event
    #[error("Worker runtime error: {0}")]
    Runtime(String),

    /// The worker function itself failed; carries its error value unchanged
    #[error("Worker function failed: {0}")]
    Application(Value),

    /// A payload could not be converted to or from JSON
    #[error("Decode error: {0}")]
    Decode(String),

    /// The stream completed before producing a value
    #[error("Worker completed without producing a value")]
    NoValue,

    /// Worker options could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WorkerError {
    /// The value the worker function failed with, if this is an application error
    pub fn reason(&self) -> Option<&Value> {
        match self {
            Self::Application(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
