//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CustomerError, ProductError, UploadError};
use placement::PlaceOrderError;
use storage::StorageError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order placement error.
    Placement(PlaceOrderError),
    /// Customer service error.
    Customer(CustomerError),
    /// Product catalog error.
    Product(ProductError),
    /// Upload service error.
    Upload(UploadError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Placement(err) => placement_error_to_response(err),
            ApiError::Customer(err) => customer_error_to_response(err),
            ApiError::Product(err) => product_error_to_response(err),
            ApiError::Upload(err) => upload_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn placement_error_to_response(err: PlaceOrderError) -> (StatusCode, String) {
    match &err {
        PlaceOrderError::CustomerNotFound(_) | PlaceOrderError::ProductNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        PlaceOrderError::InvalidQuantity => (StatusCode::BAD_REQUEST, err.to_string()),
        PlaceOrderError::InsufficientStock { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        PlaceOrderError::VersionConflict => (StatusCode::CONFLICT, err.to_string()),
        PlaceOrderError::OrderCreationFailed { .. } => {
            if err.needs_reconciliation() {
                tracing::error!(error = %err, "placement failed with unreconciled stock");
            }
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
    }
}

fn customer_error_to_response(err: CustomerError) -> (StatusCode, String) {
    match &err {
        CustomerError::MissingField { .. } | CustomerError::InvalidEmail(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        CustomerError::DuplicateIdentity => (StatusCode::CONFLICT, err.to_string()),
        CustomerError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CustomerError::Storage(storage_err) => storage_status(storage_err, &err),
    }
}

fn product_error_to_response(err: ProductError) -> (StatusCode, String) {
    match &err {
        ProductError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        ProductError::NameRequired | ProductError::NegativePrice(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        ProductError::Storage(storage_err) => storage_status(storage_err, &err),
    }
}

fn upload_error_to_response(err: UploadError) -> (StatusCode, String) {
    match &err {
        UploadError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        UploadError::EmptyFile => (StatusCode::BAD_REQUEST, err.to_string()),
        UploadError::Storage(storage_err) => storage_status(storage_err, &err),
    }
}

fn storage_status(storage_err: &StorageError, err: &dyn std::fmt::Display) -> (StatusCode, String) {
    let status = match storage_err {
        StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
        StorageError::Conflict { .. } | StorageError::VersionMismatch { .. } => {
            StatusCode::CONFLICT
        }
        StorageError::Transport { .. } => StatusCode::BAD_GATEWAY,
        StorageError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

impl From<PlaceOrderError> for ApiError {
    fn from(err: PlaceOrderError) -> Self {
        ApiError::Placement(err)
    }
}

impl From<CustomerError> for ApiError {
    fn from(err: CustomerError) -> Self {
        ApiError::Customer(err)
    }
}

impl From<ProductError> for ApiError {
    fn from(err: ProductError) -> Self {
        ApiError::Product(err)
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        ApiError::Upload(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NotFound { partition, row_key } => {
                ApiError::NotFound(format!("{partition}/{row_key} not found"))
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
