//! Error types for plaza-core

use thiserror::Error;

/// Result type alias using plaza-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in plaza-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any state was touched
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Record not present in the collection
    #[error("Not found: {0}")]
    NotFound(String),

    /// Gateway rejected the request
    #[error("Request failed: {0}")]
    Remote(String),

    /// Gateway reported success but the response was unusable
    #[error("Unexpected response: {0}")]
    Unexpected(String),

    /// Collection was unmounted; the write was skipped
    #[error("Collection `{0}` is no longer mounted")]
    Unmounted(&'static str),

    /// Key-value storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a speculative change was applied and had to be reverted.
    #[must_use]
    pub const fn is_rollback(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Unexpected(_))
    }
}
