//! Product selection-list and detail endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{Product, ProductSummary};
use serde::Serialize;
use storage::TableStore;

use crate::error::ApiError;
use crate::routes::orders::{parse_entity_id, AppState};

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock_quantity: u32,
    pub image_url: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            description: product.description,
            price_cents: product.price.cents(),
            stock_quantity: product.stock_quantity,
            image_url: product.image_url,
        }
    }
}

/// GET /products — cached list of products with stock on hand.
#[tracing::instrument(skip(state))]
pub async fn list<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductSummary>>, ApiError> {
    let summaries = state.reference.products_in_stock().await?;
    Ok(Json(summaries))
}

/// GET /products/:id — fetch one product, bypassing the cache.
#[tracing::instrument(skip(state))]
pub async fn get<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_entity_id(&id, "product id")?;
    let versioned = state.catalog.get(product_id).await?;
    Ok(Json(versioned.entity.into()))
}
