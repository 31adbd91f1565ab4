//! Proof-of-payment upload endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::EntityId;
use domain::{NewUpload, UploadRecord};
use serde::Serialize;
use storage::TableStore;

use crate::error::ApiError;
use crate::routes::orders::{parse_entity_id, AppState};

#[derive(Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub order_id: String,
    pub customer_name: String,
    pub original_name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_url: String,
}

impl From<UploadRecord> for UploadResponse {
    fn from(record: UploadRecord) -> Self {
        Self {
            id: record.id.to_string(),
            order_id: record.order_id.to_string(),
            customer_name: record.customer_name,
            original_name: record.original_name,
            size_bytes: record.size_bytes,
            content_type: record.content_type,
            uploaded_at: record.uploaded_at,
            file_url: record.file_url,
        }
    }
}

/// POST /uploads — store a proof of payment.
///
/// Expects a multipart form with `order_id` and `customer_name` text
/// fields and a `file` field carrying the document itself.
#[tracing::instrument(skip(state, multipart))]
pub async fn store<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut order_id: Option<EntityId> = None;
    let mut customer_name: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "order_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid order_id field: {e}")))?;
                order_id = Some(parse_entity_id(&text, "order_id")?);
            }
            "customer_name" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Invalid customer_name field: {e}"))
                })?;
                customer_name = Some(text);
            }
            "file" => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?;
                file = Some((original_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let order_id =
        order_id.ok_or_else(|| ApiError::BadRequest("Missing order_id field".to_string()))?;
    let customer_name = customer_name
        .ok_or_else(|| ApiError::BadRequest("Missing customer_name field".to_string()))?;
    let (original_name, content_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;

    let record = state
        .uploads
        .store_proof(NewUpload {
            order_id,
            customer_name,
            original_name,
            content_type,
            bytes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /uploads — list all stored proofs of payment.
#[tracing::instrument(skip(state))]
pub async fn list<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<UploadResponse>>, ApiError> {
    let records = state.uploads.list().await?;
    let mut responses: Vec<UploadResponse> = records.into_iter().map(Into::into).collect();
    responses.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    Ok(Json(responses))
}

/// DELETE /uploads/:id — remove a proof of payment and its metadata.
#[tracing::instrument(skip(state))]
pub async fn delete<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let upload_id = parse_entity_id(&id, "upload id")?;
    state.uploads.delete(upload_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
