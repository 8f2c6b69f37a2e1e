//! Error types for the Cairn registry.
//!
//! Every fallible operation in this crate returns [`CairnError`] through the
//! crate-local [`Result`] alias. Backend failures are never retried; they
//! propagate to the caller unmodified.

use thiserror::Error;

/// Main error type for the Cairn registry.
#[derive(Debug, Error)]
pub enum CairnError {
    /// A second cell was about to be created for a key that already has one.
    ///
    /// This is a programming error in the registry itself: exactly one cell
    /// exists per live key. The registry remains in its prior state.
    #[error("Registry entry already exists for key: {key}")]
    AlreadyExists { key: String },

    /// `delete` was called for a key with no live cell.
    #[error("No registry entry for key: {key}")]
    KeyNotFound { key: String },

    /// A persisted record is not valid JSON.
    #[error("Failed to decode record at {storage_key}: {source}")]
    Decode {
        storage_key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded for persistence.
    #[error("Failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    // Backend errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl From<rusqlite::Error> for CairnError {
    fn from(err: rusqlite::Error) -> Self {
        CairnError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for CairnError {
    fn from(err: std::io::Error) -> Self {
        CairnError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Result type alias for Cairn operations.
pub type Result<T> = std::result::Result<T, CairnError>;
