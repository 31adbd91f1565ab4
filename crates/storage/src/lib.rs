//! Storage layer for the retail system.
//!
//! Provides the entity table store contract with optimistic-concurrency
//! version tokens, an in-memory implementation with fault injection for
//! tests, a bounded exponential-backoff retry policy for single remote
//! calls, a TTL read-through cache for reference data, and the blob store
//! contract used by the upload flow.

mod blob;
mod cache;
mod error;
mod memory;
mod retry;
mod row;
mod table;
mod typed;

pub use blob::{BlobStore, InMemoryBlobStore};
pub use cache::TtlCache;
pub use error::{Result, StorageError};
pub use memory::InMemoryTableStore;
pub use retry::RetryPolicy;
pub use row::{TableRow, VersionToken};
pub use table::{Precondition, TableStore};
pub use typed::{TableEntity, TypedTable, Versioned};
