//! Raw table rows and version tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque optimistic-concurrency tag attached to every stored row.
///
/// The store regenerates the token on every successful write; conditional
/// updates carrying a stale token are rejected with `VersionMismatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(Uuid);

impl VersionToken {
    /// Creates a fresh token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for VersionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single row in a logical table partition.
///
/// The entity payload is carried as a JSON value; typed access goes through
/// [`crate::TypedTable`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRow {
    /// Logical collection the row belongs to (e.g. `"Product"`).
    pub partition: String,
    /// Unique key within the partition.
    pub row_key: String,
    /// Serialized entity payload.
    pub payload: serde_json::Value,
    /// Optimistic-concurrency tag, regenerated by the store on every write.
    pub version: VersionToken,
    /// Time of the last successful write.
    pub updated_at: DateTime<Utc>,
}

impl TableRow {
    /// Creates a new row with a fresh version token.
    pub fn new(
        partition: impl Into<String>,
        row_key: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            partition: partition.into(),
            row_key: row_key.into(),
            payload,
            version: VersionToken::new(),
            updated_at: Utc::now(),
        }
    }
}
