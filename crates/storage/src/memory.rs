use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock as StdRwLock};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::row::{TableRow, VersionToken};
use crate::table::{Precondition, TableStore};
use crate::{Result, StorageError};

#[derive(Debug, Default)]
struct Faults {
    fail_insert_partitions: HashSet<String>,
    fail_update_partitions: HashSet<String>,
    fail_force_updates: bool,
    transient_remaining: u32,
}

/// In-memory table store for testing.
///
/// Stores rows keyed by `(partition, row_key)` and enforces the same
/// version-token contract as a remote table service. Fault injection flags
/// let tests force failures at specific points of a workflow: per-partition
/// insert/update failures, failures of unconditional (rollback) writes, and
/// a counter of transient 503 responses applied to whichever operations run
/// next.
#[derive(Clone, Default)]
pub struct InMemoryTableStore {
    rows: Arc<RwLock<HashMap<(String, String), TableRow>>>,
    faults: Arc<StdRwLock<Faults>>,
}

impl InMemoryTableStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows in a partition.
    pub async fn partition_len(&self, partition: &str) -> usize {
        self.rows
            .read()
            .await
            .keys()
            .filter(|(p, _)| p == partition)
            .count()
    }

    /// Makes inserts into the given partition fail with a 500 response.
    pub fn set_fail_inserts(&self, partition: &str, fail: bool) {
        let mut faults = self.faults.write().unwrap();
        if fail {
            faults.fail_insert_partitions.insert(partition.to_string());
        } else {
            faults.fail_insert_partitions.remove(partition);
        }
    }

    /// Makes conditional updates against the given partition fail with a
    /// 500 response.
    pub fn set_fail_updates(&self, partition: &str, fail: bool) {
        let mut faults = self.faults.write().unwrap();
        if fail {
            faults.fail_update_partitions.insert(partition.to_string());
        } else {
            faults.fail_update_partitions.remove(partition);
        }
    }

    /// Makes unconditional (`Precondition::Any`) updates fail with a 500
    /// response. Conditional updates are unaffected.
    pub fn set_fail_force_updates(&self, fail: bool) {
        self.faults.write().unwrap().fail_force_updates = fail;
    }

    /// Queues `n` transient 503 failures; each subsequent operation consumes
    /// one until the queue drains.
    pub fn inject_transient_failures(&self, n: u32) {
        self.faults.write().unwrap().transient_remaining = n;
    }

    fn take_transient(&self) -> bool {
        let mut faults = self.faults.write().unwrap();
        if faults.transient_remaining > 0 {
            faults.transient_remaining -= 1;
            true
        } else {
            false
        }
    }

    fn check_transient(&self) -> Result<()> {
        if self.take_transient() {
            return Err(StorageError::unavailable("injected transient failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn get(&self, partition: &str, row_key: &str) -> Result<TableRow> {
        self.check_transient()?;
        let rows = self.rows.read().await;
        rows.get(&(partition.to_string(), row_key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                partition: partition.to_string(),
                row_key: row_key.to_string(),
            })
    }

    async fn insert(&self, mut row: TableRow) -> Result<VersionToken> {
        self.check_transient()?;
        if self
            .faults
            .read()
            .unwrap()
            .fail_insert_partitions
            .contains(&row.partition)
        {
            return Err(StorageError::Transport {
                status: 500,
                message: format!("injected insert failure for partition {}", row.partition),
            });
        }

        let key = (row.partition.clone(), row.row_key.clone());
        let mut rows = self.rows.write().await;
        if rows.contains_key(&key) {
            return Err(StorageError::Conflict {
                partition: row.partition,
                row_key: row.row_key,
            });
        }

        let version = VersionToken::new();
        row.version = version;
        row.updated_at = Utc::now();
        rows.insert(key, row);
        Ok(version)
    }

    async fn update(&self, mut row: TableRow, precondition: Precondition) -> Result<VersionToken> {
        self.check_transient()?;
        {
            let faults = self.faults.read().unwrap();
            let injected = match precondition {
                Precondition::IfVersion(_) => {
                    faults.fail_update_partitions.contains(&row.partition)
                }
                Precondition::Any => faults.fail_force_updates,
            };
            if injected {
                return Err(StorageError::Transport {
                    status: 500,
                    message: format!("injected update failure for partition {}", row.partition),
                });
            }
        }

        let key = (row.partition.clone(), row.row_key.clone());
        let mut rows = self.rows.write().await;
        let stored = rows.get_mut(&key).ok_or_else(|| StorageError::NotFound {
            partition: row.partition.clone(),
            row_key: row.row_key.clone(),
        })?;

        if let Precondition::IfVersion(expected) = precondition
            && stored.version != expected
        {
            return Err(StorageError::VersionMismatch {
                partition: row.partition,
                row_key: row.row_key,
                expected,
                actual: stored.version,
            });
        }

        let version = VersionToken::new();
        row.version = version;
        row.updated_at = Utc::now();
        *stored = row;
        Ok(version)
    }

    async fn delete(&self, partition: &str, row_key: &str) -> Result<()> {
        self.check_transient()?;
        let mut rows = self.rows.write().await;
        rows.remove(&(partition.to_string(), row_key.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                partition: partition.to_string(),
                row_key: row_key.to_string(),
            })
    }

    async fn query(&self, partition: &str) -> Result<Vec<TableRow>> {
        self.check_transient()?;
        let rows = self.rows.read().await;
        let mut matched: Vec<_> = rows
            .values()
            .filter(|r| r.partition == partition)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.row_key.cmp(&b.row_key));
        Ok(matched)
    }
}
