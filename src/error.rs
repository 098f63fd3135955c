//! Error types
//!
//! Garbage on the byte stream is never an error: the parser degrades it to
//! ignore tokens. These types cover API misuse only.

use thiserror::Error;

use crate::core::AbsLine;

/// History lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The line was dropped to keep the buffer within budget
    #[error("line {position} is no longer in history")]
    NotFound { position: AbsLine },

    /// The position has not been assigned to any line yet
    #[error("line {position} has not been written to history yet")]
    NotYetAssigned { position: AbsLine },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from the threaded session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The mutation thread has stopped
    #[error("session is closed")]
    Closed,

    /// The input queue is full; the reader should stop reading for now
    #[error("input queue is full")]
    Backpressure,

    /// The mutation thread could not be started
    #[error("failed to start session thread: {0}")]
    Spawn(String),
}

/// Any error surfaced by this crate
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result type for this crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
