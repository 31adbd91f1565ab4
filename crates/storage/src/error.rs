use thiserror::Error;

use crate::row::VersionToken;

/// Errors that can occur when interacting with the table or blob store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested entity does not exist.
    #[error("Entity not found: {partition}/{row_key}")]
    NotFound { partition: String, row_key: String },

    /// An entity with the same key already exists.
    #[error("Entity already exists: {partition}/{row_key}")]
    Conflict { partition: String, row_key: String },

    /// A conditional update was rejected because the version token is stale.
    #[error(
        "Version mismatch for {partition}/{row_key}: expected {expected}, found {actual}"
    )]
    VersionMismatch {
        partition: String,
        row_key: String,
        expected: VersionToken,
        actual: VersionToken,
    },

    /// A transport-level failure talking to the remote store.
    #[error("Storage transport error (status {status}): {message}")]
    Transport { status: u16, message: String },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Returns true if the failure is retry-safe (overload, rate-limit,
    /// timeout-class responses from the remote store).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Transport {
                status: 429 | 500 | 502 | 503 | 504,
                ..
            }
        )
    }

    /// Creates a service-unavailable transport error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        StorageError::Transport {
            status: 503,
            message: message.into(),
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
