//! Blob store contract used by the proof-of-payment upload flow.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::{Result, StorageError};

/// Contract for the remote blob/file store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores bytes under `container/key` and returns the blob URL.
    async fn put(
        &self,
        container: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String>;

    /// Returns the URL a stored blob is reachable at.
    fn url(&self, container: &str, key: &str) -> String;

    /// Deletes a blob.
    async fn delete(&self, container: &str, key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct BlobState {
    blobs: HashMap<(String, String), StoredBlob>,
    fail_on_put: bool,
}

/// In-memory blob store for testing.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    state: Arc<RwLock<BlobState>>,
}

impl InMemoryBlobStore {
    /// Creates a new empty blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next puts fail with a 503 response.
    pub fn set_fail_on_put(&self, fail: bool) {
        self.state.write().unwrap().fail_on_put = fail;
    }

    /// Returns the number of stored blobs.
    pub fn blob_count(&self) -> usize {
        self.state.read().unwrap().blobs.len()
    }

    /// Returns true if a blob exists under `container/key`.
    pub fn contains(&self, container: &str, key: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .blobs
            .contains_key(&(container.to_string(), key.to_string()))
    }

    /// Returns the stored size in bytes, if the blob exists.
    pub fn size_of(&self, container: &str, key: &str) -> Option<usize> {
        self.state
            .read()
            .unwrap()
            .blobs
            .get(&(container.to_string(), key.to_string()))
            .map(|blob| blob.bytes.len())
    }

    /// Returns the content type a blob was stored with, if it exists.
    pub fn content_type_of(&self, container: &str, key: &str) -> Option<String> {
        self.state
            .read()
            .unwrap()
            .blobs
            .get(&(container.to_string(), key.to_string()))
            .map(|blob| blob.content_type.clone())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        container: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_put {
            return Err(StorageError::unavailable("injected blob failure"));
        }
        state.blobs.insert(
            (container.to_string(), key.to_string()),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.url(container, key))
    }

    fn url(&self, container: &str, key: &str) -> String {
        format!("memory://{container}/{key}")
    }

    async fn delete(&self, container: &str, key: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state
            .blobs
            .remove(&(container.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                partition: container.to_string(),
                row_key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete() {
        let store = InMemoryBlobStore::new();

        let url = store
            .put("proof-of-payment", "a.pdf", vec![1, 2, 3], "application/pdf")
            .await
            .unwrap();
        assert_eq!(url, "memory://proof-of-payment/a.pdf");
        assert_eq!(store.blob_count(), 1);
        assert_eq!(store.size_of("proof-of-payment", "a.pdf"), Some(3));
        assert_eq!(
            store.content_type_of("proof-of-payment", "a.pdf").as_deref(),
            Some("application/pdf")
        );

        store.delete("proof-of-payment", "a.pdf").await.unwrap();
        assert_eq!(store.blob_count(), 0);
    }

    #[tokio::test]
    async fn delete_missing_blob_is_not_found() {
        let store = InMemoryBlobStore::new();
        let err = store.delete("proof-of-payment", "missing").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn fail_on_put_rejects_upload() {
        let store = InMemoryBlobStore::new();
        store.set_fail_on_put(true);

        let err = store
            .put("proof-of-payment", "a.pdf", vec![1], "application/pdf")
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.blob_count(), 0);
    }
}
