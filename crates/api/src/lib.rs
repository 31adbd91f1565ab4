//! HTTP API server for the retail order system.
//!
//! Provides REST endpoints for customer registration, catalog browsing,
//! order placement, and proof-of-payment uploads, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use domain::{CustomerDirectory, Order, ProductCatalog, ReferenceData, UploadService};
use metrics_exporter_prometheus::PrometheusHandle;
use placement::{InMemoryNotificationSink, PlacementService};
use storage::{InMemoryBlobStore, RetryPolicy, TableStore, TypedTable};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: TableStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/customers", post(routes::customers::register::<S>))
        .route("/customers", get(routes::customers::list::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/orders", post(routes::orders::place::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/uploads", post(routes::uploads::store::<S>))
        .route("/uploads", get(routes::uploads::list::<S>))
        .route("/uploads/{id}", delete(routes::uploads::delete::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the application state over the given table store, blob store,
/// and notification sink, all services sharing one retry policy.
pub fn create_state<S: TableStore + Clone + 'static>(
    store: S,
    blobs: InMemoryBlobStore,
    notifier: InMemoryNotificationSink,
    retry: RetryPolicy,
) -> Arc<AppState<S>> {
    let reference = Arc::new(ReferenceData::with_retry(store.clone(), retry.clone()));

    Arc::new(AppState {
        customers: CustomerDirectory::with_retry(store.clone(), retry.clone()),
        catalog: ProductCatalog::with_retry(store.clone(), retry.clone()),
        uploads: UploadService::with_retry(store.clone(), blobs.clone(), retry.clone()),
        placement: PlacementService::with_retry(
            store.clone(),
            reference.clone(),
            notifier.clone(),
            retry,
        ),
        reference,
        orders: TypedTable::<Order, S>::new(store),
        blobs,
        notifier,
    })
}

/// Creates the default application state backed by in-memory stores.
pub fn create_default_state<S: TableStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    create_state(
        store,
        InMemoryBlobStore::new(),
        InMemoryNotificationSink::new(),
        RetryPolicy::default(),
    )
}
