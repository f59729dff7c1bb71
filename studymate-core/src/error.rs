//! Error types for studymate

use thiserror::Error;

/// The main error type for studymate operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// Unsupported or corrupt upload
    #[error("Failed to parse {name}: {reason}")]
    Parse { name: String, reason: String },

    /// Validation errors (form fields, upload limits)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response or media backend failures
    #[error("Network error: {0}")]
    Network(String),

    /// The caller cancelled a pending operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a parse failure for the named upload
    pub fn parse(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for studymate operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
