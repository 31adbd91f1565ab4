use async_trait::async_trait;

use crate::row::{TableRow, VersionToken};
use crate::Result;

/// Precondition for an update against the table store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Compare-and-swap: the update succeeds only if the stored row still
    /// carries this version token.
    IfVersion(VersionToken),
    /// Unconditional write, ignoring the stored version. Used by the
    /// compensating rollback write, whose captured token is known stale.
    Any,
}

/// Core contract for the remote entity table store.
///
/// All operations are single-entity and single-partition; no multi-entity
/// atomic batch exists, which is why the order placement workflow carries
/// its own compensation logic. Implementations must be thread-safe.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Fetches a row by partition and key.
    ///
    /// A missing row is reported as `StorageError::NotFound`, distinct from
    /// transport failures.
    async fn get(&self, partition: &str, row_key: &str) -> Result<TableRow>;

    /// Inserts a new row.
    ///
    /// Fails with `StorageError::Conflict` if the key already exists.
    /// Returns the version token assigned by the store.
    async fn insert(&self, row: TableRow) -> Result<VersionToken>;

    /// Updates an existing row subject to the given precondition.
    ///
    /// With `Precondition::IfVersion`, a stale token yields
    /// `StorageError::VersionMismatch` and the row is left untouched.
    /// Returns the new version token.
    async fn update(&self, row: TableRow, precondition: Precondition) -> Result<VersionToken>;

    /// Deletes a row by partition and key.
    async fn delete(&self, partition: &str, row_key: &str) -> Result<()>;

    /// Returns every row in a partition. Predicate filtering happens in the
    /// caller; the store only scans.
    async fn query(&self, partition: &str) -> Result<Vec<TableRow>>;
}
