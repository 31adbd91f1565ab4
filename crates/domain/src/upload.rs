//! Proof-of-payment uploads: blob storage plus a metadata row per file.

use chrono::{DateTime, Utc};
use common::EntityId;
use serde::{Deserialize, Serialize};
use storage::{
    BlobStore, RetryPolicy, StorageError, TableEntity, TableStore, TypedTable,
};
use thiserror::Error;
use uuid::Uuid;

/// Blob container holding uploaded proofs of payment.
pub const PROOF_CONTAINER: &str = "proof-of-payment";

/// Metadata row for one uploaded file. Created once, never updated, and
/// deleted together with the underlying blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: EntityId,
    pub order_id: EntityId,
    pub customer_name: String,
    pub stored_name: String,
    pub original_name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_url: String,
}

impl TableEntity for UploadRecord {
    const PARTITION: &'static str = "Upload";

    fn row_key(&self) -> String {
        self.id.to_string()
    }
}

/// Input for storing a proof of payment.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub order_id: EntityId,
    pub customer_name: String,
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Errors that can occur during upload operations.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Upload record not found.
    #[error("Upload not found: {0}")]
    NotFound(EntityId),

    /// The uploaded file is empty.
    #[error("Uploaded file is empty")]
    EmptyFile,

    /// Storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Stores and removes proof-of-payment files and their metadata rows.
#[derive(Clone)]
pub struct UploadService<S, B> {
    table: TypedTable<UploadRecord, S>,
    blobs: B,
    retry: RetryPolicy,
}

impl<S: TableStore + Clone, B: BlobStore> UploadService<S, B> {
    /// Creates an upload service with the default retry policy.
    pub fn new(store: S, blobs: B) -> Self {
        Self::with_retry(store, blobs, RetryPolicy::default())
    }

    /// Creates an upload service with an explicit retry policy.
    pub fn with_retry(store: S, blobs: B, retry: RetryPolicy) -> Self {
        Self {
            table: TypedTable::new(store),
            blobs,
            retry,
        }
    }

    /// Uploads a file and records its metadata.
    ///
    /// The blob is stored under a generated name so original filenames
    /// cannot collide; the original name survives in the metadata row.
    #[tracing::instrument(skip(self, upload), fields(order_id = %upload.order_id))]
    pub async fn store_proof(&self, upload: NewUpload) -> Result<UploadRecord, UploadError> {
        if upload.bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        let stored_name = generate_stored_name(&upload.original_name);
        let size_bytes = upload.bytes.len() as u64;

        let file_url = self
            .retry
            .run(|| {
                self.blobs.put(
                    PROOF_CONTAINER,
                    &stored_name,
                    upload.bytes.clone(),
                    &upload.content_type,
                )
            })
            .await?;

        let record = UploadRecord {
            id: EntityId::new(),
            order_id: upload.order_id,
            customer_name: upload.customer_name,
            stored_name,
            original_name: upload.original_name,
            size_bytes,
            content_type: upload.content_type,
            uploaded_at: Utc::now(),
            file_url,
        };
        self.retry.run(|| self.table.insert(&record)).await?;

        tracing::info!(upload_id = %record.id, size_bytes, "proof of payment stored");
        Ok(record)
    }

    /// Fetches an upload record by ID.
    pub async fn get(&self, id: EntityId) -> Result<UploadRecord, UploadError> {
        let key = id.to_string();
        match self.retry.run(|| self.table.get(&key)).await {
            Ok(versioned) => Ok(versioned.entity),
            Err(StorageError::NotFound { .. }) => Err(UploadError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Lists all upload records.
    pub async fn list(&self) -> Result<Vec<UploadRecord>, UploadError> {
        let rows = self.retry.run(|| self.table.list()).await?;
        Ok(rows.into_iter().map(|row| row.entity).collect())
    }

    /// Deletes an upload: the blob first, then the metadata row.
    ///
    /// A blob that is already gone is not an error; the row is still
    /// removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: EntityId) -> Result<(), UploadError> {
        let record = self.get(id).await?;

        match self
            .retry
            .run(|| self.blobs.delete(PROOF_CONTAINER, &record.stored_name))
            .await
        {
            Ok(()) | Err(StorageError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        let key = id.to_string();
        self.retry.run(|| self.table.delete(&key)).await?;
        Ok(())
    }
}

fn generate_stored_name(original_name: &str) -> String {
    match original_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{}.{ext}", Uuid::new_v4()),
        _ => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{InMemoryBlobStore, InMemoryTableStore};

    fn service() -> (
        UploadService<InMemoryTableStore, InMemoryBlobStore>,
        InMemoryBlobStore,
    ) {
        let blobs = InMemoryBlobStore::new();
        let retry = RetryPolicy::new(3, std::time::Duration::from_millis(1));
        let service = UploadService::with_retry(InMemoryTableStore::new(), blobs.clone(), retry);
        (service, blobs)
    }

    fn new_upload(name: &str, bytes: Vec<u8>) -> NewUpload {
        NewUpload {
            order_id: EntityId::new(),
            customer_name: "Ada Lovelace".to_string(),
            original_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            bytes,
        }
    }

    #[tokio::test]
    async fn store_creates_blob_and_metadata() {
        let (service, blobs) = service();

        let record = service
            .store_proof(new_upload("receipt.pdf", vec![1, 2, 3, 4]))
            .await
            .unwrap();

        assert_eq!(record.original_name, "receipt.pdf");
        assert!(record.stored_name.ends_with(".pdf"));
        assert_ne!(record.stored_name, record.original_name);
        assert_eq!(record.size_bytes, 4);
        assert!(blobs.contains(PROOF_CONTAINER, &record.stored_name));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let (service, blobs) = service();
        let err = service
            .store_proof(new_upload("receipt.pdf", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::EmptyFile));
        assert_eq!(blobs.blob_count(), 0);
    }

    #[tokio::test]
    async fn delete_removes_blob_and_row() {
        let (service, blobs) = service();
        let record = service
            .store_proof(new_upload("receipt.pdf", vec![1, 2, 3]))
            .await
            .unwrap();

        service.delete(record.id).await.unwrap();

        assert_eq!(blobs.blob_count(), 0);
        assert!(service.list().await.unwrap().is_empty());
        assert!(matches!(
            service.get(record.id).await.unwrap_err(),
            UploadError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn failed_blob_put_leaves_no_metadata() {
        let (service, blobs) = service();
        blobs.set_fail_on_put(true);

        let result = service
            .store_proof(new_upload("receipt.pdf", vec![1, 2, 3]))
            .await;
        assert!(result.is_err());
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn name_without_extension_still_generates() {
        assert!(!generate_stored_name("receipt").contains('.'));
        assert!(generate_stored_name("receipt.tar.gz").ends_with(".gz"));
    }
}
