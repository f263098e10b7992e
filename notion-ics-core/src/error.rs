//! Error types for notion-ics.

use thiserror::Error;

/// Errors that can occur while converting records into calendar text.
#[derive(Error, Debug)]
pub enum IcsError {
    /// Top-level input is malformed. Nothing is emitted.
    #[error("Invalid calendar bundle: {0}")]
    InvalidBundle(String),

    #[error("Invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl IcsError {
    pub(crate) fn invalid_date(value: &str, reason: impl Into<String>) -> Self {
        IcsError::InvalidDate {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for notion-ics operations.
pub type IcsResult<T> = Result<T, IcsError>;
