//! Cached reference datasets backing selection lists.

use std::time::Duration;

use common::EntityId;
use serde::Serialize;
use storage::{RetryPolicy, StorageError, TableStore, TtlCache, TypedTable};

use crate::customer::Customer;
use crate::money::Money;
use crate::product::Product;

/// Customer list expiry. Customer data changes rarely.
pub const CUSTOMER_LIST_TTL: Duration = Duration::from_secs(10 * 60);
/// Product list expiry, shorter because stock changes with every order.
pub const PRODUCT_LIST_TTL: Duration = Duration::from_secs(5 * 60);

const CUSTOMERS_KEY: &str = "customers";
const PRODUCTS_KEY: &str = "products";

/// Customer entry for selection lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    pub id: EntityId,
    pub username: String,
    pub display_name: String,
}

/// Product entry for selection lists, carrying current stock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub id: EntityId,
    pub name: String,
    pub price: Money,
    pub stock_quantity: u32,
}

/// Read-through caches over the customer and product partitions.
///
/// One instance is owned by the request-handling layer and shared with the
/// placement workflow, which invalidates the product list after every
/// successful stock mutation. Loader failures are never cached.
pub struct ReferenceData<S> {
    customers: TypedTable<Customer, S>,
    products: TypedTable<Product, S>,
    customer_cache: TtlCache<Vec<CustomerSummary>>,
    product_cache: TtlCache<Vec<ProductSummary>>,
    retry: RetryPolicy,
}

impl<S: TableStore + Clone> ReferenceData<S> {
    /// Creates reference caches with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    /// Creates reference caches with an explicit retry policy.
    pub fn with_retry(store: S, retry: RetryPolicy) -> Self {
        Self {
            customers: TypedTable::new(store.clone()),
            products: TypedTable::new(store),
            customer_cache: TtlCache::new(),
            product_cache: TtlCache::new(),
            retry,
        }
    }

    /// Returns the cached customer list, loading it on miss or expiry.
    pub async fn customers(&self) -> Result<Vec<CustomerSummary>, StorageError> {
        self.customer_cache
            .get_or_load(CUSTOMERS_KEY, CUSTOMER_LIST_TTL, || async {
                let rows = self.retry.run(|| self.customers.list()).await?;
                let mut summaries: Vec<_> = rows
                    .into_iter()
                    .map(|row| CustomerSummary {
                        id: row.entity.id,
                        display_name: row.entity.display_name(),
                        username: row.entity.username,
                    })
                    .collect();
                summaries.sort_by(|a, b| a.username.cmp(&b.username));
                Ok(summaries)
            })
            .await
    }

    /// Returns the cached list of products with stock on hand.
    pub async fn products_in_stock(&self) -> Result<Vec<ProductSummary>, StorageError> {
        self.product_cache
            .get_or_load(PRODUCTS_KEY, PRODUCT_LIST_TTL, || async {
                let rows = self.retry.run(|| self.products.list()).await?;
                let mut summaries: Vec<_> = rows
                    .into_iter()
                    .filter(|row| row.entity.stock_quantity > 0)
                    .map(|row| ProductSummary {
                        id: row.entity.id,
                        name: row.entity.name,
                        price: row.entity.price,
                        stock_quantity: row.entity.stock_quantity,
                    })
                    .collect();
                summaries.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(summaries)
            })
            .await
    }

    /// Evicts the product list so the next read observes fresh stock.
    pub async fn invalidate_products(&self) {
        self.product_cache.invalidate(PRODUCTS_KEY).await;
    }

    /// Evicts the customer list after a registration.
    pub async fn invalidate_customers(&self) {
        self.customer_cache.invalidate(CUSTOMERS_KEY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{InMemoryTableStore, Precondition, TableEntity};

    fn product(name: &str, stock: u32) -> Product {
        Product {
            id: EntityId::new(),
            name: name.to_string(),
            description: String::new(),
            price: Money::from_cents(1000),
            stock_quantity: stock,
            image_url: String::new(),
        }
    }

    fn customer(username: &str) -> Customer {
        Customer {
            id: EntityId::new(),
            first_name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            email: format!("{username}@example.com"),
            address: "12 Analytical Way".to_string(),
            username: username.to_string(),
        }
    }

    #[tokio::test]
    async fn product_list_filters_out_of_stock() {
        let store = InMemoryTableStore::new();
        let products = TypedTable::<Product, _>::new(store.clone());
        products.insert(&product("Widget", 5)).await.unwrap();
        products.insert(&product("Gadget", 0)).await.unwrap();

        let reference = ReferenceData::new(store);
        let listed = reference.products_in_stock().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Widget");
    }

    #[tokio::test]
    async fn product_list_is_cached_until_invalidated() {
        let store = InMemoryTableStore::new();
        let products = TypedTable::<Product, _>::new(store.clone());
        let mut item = product("Widget", 5);
        products.insert(&item).await.unwrap();

        let reference = ReferenceData::new(store.clone());
        assert_eq!(reference.products_in_stock().await.unwrap()[0].stock_quantity, 5);

        // Mutate stock behind the cache's back
        let current = products.get(&item.row_key()).await.unwrap();
        item.stock_quantity = 2;
        products
            .update(&item, Precondition::IfVersion(current.version))
            .await
            .unwrap();

        // Cached value still observed, then fresh after invalidation
        assert_eq!(reference.products_in_stock().await.unwrap()[0].stock_quantity, 5);
        reference.invalidate_products().await;
        assert_eq!(reference.products_in_stock().await.unwrap()[0].stock_quantity, 2);
    }

    #[tokio::test]
    async fn customer_list_sorted_by_username() {
        let store = InMemoryTableStore::new();
        let customers = TypedTable::<Customer, _>::new(store.clone());
        customers.insert(&customer("zoe")).await.unwrap();
        customers.insert(&customer("ada")).await.unwrap();

        let reference = ReferenceData::new(store);
        let listed = reference.customers().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].username, "ada");
        assert_eq!(listed[1].username, "zoe");
    }

    #[tokio::test]
    async fn caches_are_independent() {
        let store = InMemoryTableStore::new();
        let customers = TypedTable::<Customer, _>::new(store.clone());
        customers.insert(&customer("ada")).await.unwrap();

        let reference = ReferenceData::new(store.clone());
        assert_eq!(reference.customers().await.unwrap().len(), 1);
        assert!(reference.products_in_stock().await.unwrap().is_empty());

        // Product invalidation leaves the customer cache warm
        reference.invalidate_products().await;
        customers.insert(&customer("zoe")).await.unwrap();
        assert_eq!(reference.customers().await.unwrap().len(), 1);
    }
}
