//! Customer registration and selection-list endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::{Customer, CustomerSummary, NewCustomer};
use serde::Serialize;
use storage::TableStore;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct CustomerResponse {
    pub id: String,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub address: String,
    pub username: String,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id.to_string(),
            first_name: customer.first_name,
            surname: customer.surname,
            email: customer.email,
            address: customer.address,
            username: customer.username,
        }
    }
}

/// POST /customers — register a customer.
///
/// The duplicate username/email check is best-effort only; see
/// [`domain::CustomerDirectory::register`].
#[tracing::instrument(skip(state, req))]
pub async fn register<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewCustomer>,
) -> Result<(axum::http::StatusCode, Json<CustomerResponse>), ApiError> {
    let customer = state.customers.register(req).await?;
    state.reference.invalidate_customers().await;
    Ok((axum::http::StatusCode::CREATED, Json(customer.into())))
}

/// GET /customers — cached customer selection list.
#[tracing::instrument(skip(state))]
pub async fn list<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CustomerSummary>>, ApiError> {
    let summaries = state.reference.customers().await?;
    Ok(Json(summaries))
}
