//! Error types for the Efesto client

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for Efesto operations
#[derive(Error, Debug)]
pub enum EfestoError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted session file exists but cannot be parsed.
    ///
    /// Deliberately distinct from "no session": a corrupt blob is surfaced as a
    /// hard failure so store bugs are not papered over by a silent re-login.
    #[error("Corrupt session file {path}: {reason} (delete it to force a fresh login)")]
    CorruptSession { path: PathBuf, reason: String },

    /// Command name not supported by the dispatcher
    #[error("NOT SUPPORTED COMMAND: {0}")]
    UnsupportedCommand(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Efesto operations
pub type Result<T> = std::result::Result<T, EfestoError>;

impl From<serde_json::Error> for EfestoError {
    fn from(err: serde_json::Error) -> Self {
        EfestoError::Serialization(err.to_string())
    }
}
