//! Order placement and read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::EntityId;
use domain::{CustomerDirectory, Order, ProductCatalog, ReferenceData, UploadService};
use placement::{InMemoryNotificationSink, PlacementService};
use serde::{Deserialize, Serialize};
use storage::{InMemoryBlobStore, StorageError, TableStore, TypedTable};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: TableStore> {
    pub customers: CustomerDirectory<S>,
    pub catalog: ProductCatalog<S>,
    pub uploads: UploadService<S, InMemoryBlobStore>,
    pub placement: PlacementService<S, InMemoryNotificationSink>,
    pub reference: Arc<ReferenceData<S>>,
    pub orders: TypedTable<Order, S>,
    pub blobs: InMemoryBlobStore,
    pub notifier: InMemoryNotificationSink,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub status: String,
    pub order_date: DateTime<Utc>,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub product_name: String,
    pub customer_name: String,
    pub username: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            customer_id: order.customer_id.to_string(),
            product_id: order.product_id.to_string(),
            quantity: order.quantity,
            status: order.status.clone(),
            order_date: order.order_date,
            unit_price_cents: order.unit_price.cents(),
            total_cents: order.total_price().cents(),
            product_name: order.product_name,
            customer_name: order.customer_name,
            username: order.username,
        }
    }
}

// -- Handlers --

/// POST /orders — place an order.
#[tracing::instrument(skip(state, req))]
pub async fn place<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let customer_id = parse_entity_id(&req.customer_id, "customer_id")?;
    let product_id = parse_entity_id(&req.product_id, "product_id")?;

    let order = state
        .placement
        .place_order(placement::PlaceOrder {
            customer_id,
            product_id,
            quantity: req.quantity,
            status: req.status,
        })
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/:id — fetch one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_entity_id(&id, "order id")?;
    match state.orders.get(&order_id.to_string()).await {
        Ok(versioned) => Ok(Json(versioned.entity.into())),
        Err(StorageError::NotFound { .. }) => {
            Err(ApiError::NotFound(format!("Order {id} not found")))
        }
        Err(err) => Err(err.into()),
    }
}

/// GET /orders — list all orders.
#[tracing::instrument(skip(state))]
pub async fn list<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let rows = state.orders.list().await?;
    let mut responses: Vec<OrderResponse> =
        rows.into_iter().map(|row| row.entity.into()).collect();
    responses.sort_by(|a, b| b.order_date.cmp(&a.order_date));
    Ok(Json(responses))
}

pub(crate) fn parse_entity_id(value: &str, field: &str) -> Result<EntityId, ApiError> {
    EntityId::parse(value).map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}
