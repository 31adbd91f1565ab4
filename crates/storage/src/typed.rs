//! Typed access over raw table rows.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::row::{TableRow, VersionToken};
use crate::table::{Precondition, TableStore};
use crate::Result;

/// An entity that lives in a fixed table partition.
pub trait TableEntity: Serialize + DeserializeOwned + Send + Sync {
    /// Logical collection the entity type is stored in.
    const PARTITION: &'static str;

    /// Unique key of this entity within the partition.
    fn row_key(&self) -> String;
}

/// An entity together with the version token it was read at.
///
/// The token is the rollback/CAS handle for subsequent conditional writes.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub entity: T,
    pub version: VersionToken,
}

/// Typed view over one partition of a [`TableStore`].
pub struct TypedTable<T, S> {
    store: S,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S: Clone> Clone for TypedTable<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: TableEntity, S: TableStore> TypedTable<T, S> {
    /// Creates a typed table over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Fetches an entity and its current version token.
    pub async fn get(&self, row_key: &str) -> Result<Versioned<T>> {
        let row = self.store.get(T::PARTITION, row_key).await?;
        let entity = serde_json::from_value(row.payload)?;
        Ok(Versioned {
            entity,
            version: row.version,
        })
    }

    /// Inserts a new entity, failing on key conflict.
    pub async fn insert(&self, entity: &T) -> Result<VersionToken> {
        let row = TableRow::new(T::PARTITION, entity.row_key(), serde_json::to_value(entity)?);
        self.store.insert(row).await
    }

    /// Writes an entity back subject to the given precondition.
    pub async fn update(&self, entity: &T, precondition: Precondition) -> Result<VersionToken> {
        let row = TableRow::new(T::PARTITION, entity.row_key(), serde_json::to_value(entity)?);
        self.store.update(row, precondition).await
    }

    /// Deletes an entity by key.
    pub async fn delete(&self, row_key: &str) -> Result<()> {
        self.store.delete(T::PARTITION, row_key).await
    }

    /// Scans the whole partition.
    pub async fn list(&self) -> Result<Vec<Versioned<T>>> {
        let rows = self.store.query(T::PARTITION).await?;
        rows.into_iter()
            .map(|row| {
                let entity = serde_json::from_value(row.payload)?;
                Ok(Versioned {
                    entity,
                    version: row.version,
                })
            })
            .collect()
    }
}
