//! Error types for kalends-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Type error for option {option}: expected {expected}, got {got}")]
    TypeError {
        option: String,
        expected: String,
        got: String,
    },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("Event source not found: {0}")]
    SourceNotFound(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
