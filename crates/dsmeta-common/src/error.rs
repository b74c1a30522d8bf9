//! Error types for dsmeta
//!
//! This module defines the common error types used by the metadata store.
//! Soft misses (an absent id or name) are never errors; they surface as
//! `None` or an empty collection.

use thiserror::Error;

/// Common result type for dsmeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for dsmeta
#[derive(Debug, Error)]
pub enum Error {
    /// A domain operation ran before `initialize()` completed.
    #[error("storage not initialized: {0}")]
    StorageNotInitialized(String),

    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a storage-not-initialized error for the named storage type
    pub fn not_initialized(storage: impl Into<String>) -> Self {
        Self::StorageNotInitialized(storage.into())
    }

    /// Check if this error was raised before storage initialization
    #[must_use]
    pub const fn is_not_initialized(&self) -> bool {
        matches!(self, Self::StorageNotInitialized(_))
    }

    /// Check if this is a retryable error
    ///
    /// The store never retries on its own; this only tells callers whether
    /// trying the same call again can plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}
