//! Product entity and catalog reads.

use common::EntityId;
use serde::{Deserialize, Serialize};
use storage::{RetryPolicy, StorageError, TableEntity, TableStore, TypedTable, Versioned};
use thiserror::Error;

use crate::money::Money;

/// A product in the catalog.
///
/// `stock_quantity` is the only field mutated outside the product's own
/// maintenance path; the order placement workflow decrements it through a
/// conditional write carrying the version token it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock_quantity: u32,
    pub image_url: String,
}

impl TableEntity for Product {
    const PARTITION: &'static str = "Product";

    fn row_key(&self) -> String {
        self.id.to_string()
    }
}

/// Errors that can occur during product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    /// Product not found.
    #[error("Product not found: {0}")]
    NotFound(EntityId),

    /// Product name is required.
    #[error("Product name is required")]
    NameRequired,

    /// Prices cannot be negative.
    #[error("Price cannot be negative: {0}")]
    NegativePrice(Money),

    /// Storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Read access (plus seeding) over the `"Product"` partition.
#[derive(Clone)]
pub struct ProductCatalog<S> {
    table: TypedTable<Product, S>,
    retry: RetryPolicy,
}

impl<S: TableStore + Clone> ProductCatalog<S> {
    /// Creates a catalog with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    /// Creates a catalog with an explicit retry policy.
    pub fn with_retry(store: S, retry: RetryPolicy) -> Self {
        Self {
            table: TypedTable::new(store),
            retry,
        }
    }

    /// Adds a product to the catalog. Used by seeding and tests; there is
    /// no public maintenance surface for products.
    pub async fn add(&self, product: Product) -> Result<Product, ProductError> {
        if product.name.trim().is_empty() {
            return Err(ProductError::NameRequired);
        }
        if product.price.is_negative() {
            return Err(ProductError::NegativePrice(product.price));
        }
        self.retry.run(|| self.table.insert(&product)).await?;
        Ok(product)
    }

    /// Fetches a product and its version token by ID.
    pub async fn get(&self, id: EntityId) -> Result<Versioned<Product>, ProductError> {
        let key = id.to_string();
        match self.retry.run(|| self.table.get(&key)).await {
            Ok(versioned) => Ok(versioned),
            Err(StorageError::NotFound { .. }) => Err(ProductError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Lists all products.
    pub async fn list(&self) -> Result<Vec<Product>, ProductError> {
        let rows = self.retry.run(|| self.table.list()).await?;
        Ok(rows.into_iter().map(|row| row.entity).collect())
    }
}
