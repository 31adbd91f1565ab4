//! The order placement orchestrator.

use std::sync::Arc;

use chrono::Utc;
use common::EntityId;
use domain::{Customer, Order, Product, ReferenceData};
use storage::{Precondition, RetryPolicy, StorageError, TableStore, TypedTable, Versioned};

use crate::error::{PlaceOrderError, RollbackOutcome};
use crate::notify::NotificationSink;
use crate::state::PlacementState;

/// Topic order confirmations are sent to.
pub const ORDERS_TOPIC: &str = "orders";

/// Command to place an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer_id: EntityId,
    pub product_id: EntityId,
    pub quantity: u32,
    /// Initial order status; defaults to [`Order::DEFAULT_STATUS`].
    pub status: Option<String>,
}

impl PlaceOrder {
    /// Creates a placement command with the default status.
    pub fn new(customer_id: EntityId, product_id: EntityId, quantity: u32) -> Self {
        Self {
            customer_id,
            product_id,
            quantity,
            status: None,
        }
    }
}

/// Orchestrates order placement over the non-transactional table store.
///
/// Every remote call goes through the retry policy, which only absorbs
/// transient transport failures; optimistic-concurrency conflicts and
/// business-rule violations surface immediately. Concurrent placements
/// against the same product are serialized by the store's version check at
/// the stock commit, not by any in-process lock.
pub struct PlacementService<S, N> {
    customers: TypedTable<Customer, S>,
    products: TypedTable<Product, S>,
    orders: TypedTable<Order, S>,
    reference: Arc<ReferenceData<S>>,
    notifier: N,
    retry: RetryPolicy,
}

impl<S, N> PlacementService<S, N>
where
    S: TableStore + Clone,
    N: NotificationSink,
{
    /// Creates a placement service with the default retry policy.
    pub fn new(store: S, reference: Arc<ReferenceData<S>>, notifier: N) -> Self {
        Self::with_retry(store, reference, notifier, RetryPolicy::default())
    }

    /// Creates a placement service with an explicit retry policy.
    pub fn with_retry(
        store: S,
        reference: Arc<ReferenceData<S>>,
        notifier: N,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            customers: TypedTable::new(store.clone()),
            products: TypedTable::new(store.clone()),
            orders: TypedTable::new(store),
            reference,
            notifier,
            retry,
        }
    }

    /// Places an order: validates the customer, product, and stock, then
    /// decrements stock and inserts the order.
    ///
    /// The stock decrement and order insert are two separate writes with no
    /// atomicity between them. A failed order insert triggers exactly one
    /// compensating write restoring the product snapshot captured at
    /// lookup; the outcome of that write travels in the returned error.
    #[tracing::instrument(
        skip(self, cmd),
        fields(
            customer_id = %cmd.customer_id,
            product_id = %cmd.product_id,
            quantity = cmd.quantity,
        )
    )]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order, PlaceOrderError> {
        metrics::counter!("order_placements_total").increment(1);
        let started = std::time::Instant::now();

        let result = self.run_placement(cmd).await;

        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("order_placements_completed").increment(1);
                tracing::info!(order_id = %order.id, total = %order.total_price(), "order placed");
            }
            Err(err) => {
                metrics::counter!("order_placements_failed").increment(1);
                tracing::debug!(error = %err, "order placement failed");
            }
        }
        result
    }

    async fn run_placement(&self, cmd: PlaceOrder) -> Result<Order, PlaceOrderError> {
        if cmd.quantity == 0 {
            return Err(PlaceOrderError::InvalidQuantity);
        }

        let mut state = PlacementState::CustomerLookup;
        tracing::debug!(state = %state, "placement step");
        let customer_key = cmd.customer_id.to_string();
        let customer = match self.retry.run(|| self.customers.get(&customer_key)).await {
            Ok(versioned) => versioned.entity,
            Err(StorageError::NotFound { .. }) => {
                return Err(PlaceOrderError::CustomerNotFound(cmd.customer_id));
            }
            Err(source) => {
                return Err(PlaceOrderError::OrderCreationFailed {
                    stage: state,
                    rollback: RollbackOutcome::NotNeeded,
                    source,
                });
            }
        };

        state = PlacementState::ProductLookup;
        tracing::debug!(state = %state, "placement step");
        let product_key = cmd.product_id.to_string();
        // The snapshot, including its version token, is the rollback target
        // for everything that follows.
        let snapshot: Versioned<Product> =
            match self.retry.run(|| self.products.get(&product_key)).await {
                Ok(versioned) => versioned,
                Err(StorageError::NotFound { .. }) => {
                    return Err(PlaceOrderError::ProductNotFound(cmd.product_id));
                }
                Err(source) => {
                    return Err(PlaceOrderError::OrderCreationFailed {
                        stage: state,
                        rollback: RollbackOutcome::NotNeeded,
                        source,
                    });
                }
            };

        state = PlacementState::StockCheck;
        tracing::debug!(state = %state, "placement step");
        if snapshot.entity.stock_quantity < cmd.quantity {
            return Err(PlaceOrderError::InsufficientStock {
                requested: cmd.quantity,
                available: snapshot.entity.stock_quantity,
            });
        }

        let order = Order {
            id: EntityId::new(),
            customer_id: cmd.customer_id,
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            status: cmd
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| Order::DEFAULT_STATUS.to_string()),
            order_date: Utc::now(),
            unit_price: snapshot.entity.price,
            product_name: snapshot.entity.name.clone(),
            customer_name: customer.display_name(),
            username: customer.username.clone(),
        };

        state = PlacementState::StockCommit;
        tracing::debug!(state = %state, "placement step");
        let mut decremented = snapshot.entity.clone();
        decremented.stock_quantity -= cmd.quantity;
        match self
            .retry
            .run(|| {
                self.products
                    .update(&decremented, Precondition::IfVersion(snapshot.version))
            })
            .await
        {
            Ok(_) => {}
            Err(StorageError::VersionMismatch { .. }) => {
                metrics::counter!("order_placement_conflicts").increment(1);
                return Err(PlaceOrderError::VersionConflict);
            }
            Err(source) => {
                // Nothing committed yet, so a plain abort suffices.
                return Err(PlaceOrderError::OrderCreationFailed {
                    stage: state,
                    rollback: RollbackOutcome::NotNeeded,
                    source,
                });
            }
        }
        self.reference.invalidate_products().await;

        state = PlacementState::OrderCommit;
        tracing::debug!(state = %state, "placement step");
        if let Err(source) = self.retry.run(|| self.orders.insert(&order)).await {
            let rollback = self.roll_back_stock(&snapshot).await;
            return Err(PlaceOrderError::OrderCreationFailed {
                stage: state,
                rollback,
                source,
            });
        }

        state = PlacementState::Notify;
        tracing::debug!(state = %state, "placement step");
        let message = format!(
            "Order {} placed: {} x {} for {} ({}), total {}",
            order.id,
            order.quantity,
            order.product_name,
            order.customer_name,
            order.username,
            order.total_price(),
        );
        if let Err(err) = self.notifier.send(ORDERS_TOPIC, &message).await {
            // The order is already durable; a lost notification never fails
            // the placement.
            tracing::warn!(order_id = %order.id, error = %err, "order notification failed");
        }

        Ok(order)
    }

    /// Issues exactly one compensating write restoring the pre-decrement
    /// product snapshot. The token captured at lookup is stale after the
    /// stock commit, so the write is unconditional.
    async fn roll_back_stock(&self, snapshot: &Versioned<Product>) -> RollbackOutcome {
        let state = PlacementState::RollingBack;
        tracing::warn!(
            state = %state,
            product_id = %snapshot.entity.id,
            "order commit failed, restoring stock snapshot"
        );

        match self
            .retry
            .run(|| self.products.update(&snapshot.entity, Precondition::Any))
            .await
        {
            Ok(_) => {
                self.reference.invalidate_products().await;
                metrics::counter!("order_rollbacks_completed").increment(1);
                RollbackOutcome::Restored
            }
            Err(err) => {
                metrics::counter!("order_rollbacks_failed").increment(1);
                tracing::error!(
                    product_id = %snapshot.entity.id,
                    restore_stock = snapshot.entity.stock_quantity,
                    error = %err,
                    "stock rollback failed, manual reconciliation required"
                );
                RollbackOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::InMemoryNotificationSink;
    use domain::Money;
    use std::time::Duration;
    use storage::InMemoryTableStore;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    struct Fixture {
        service: PlacementService<InMemoryTableStore, InMemoryNotificationSink>,
        store: InMemoryTableStore,
        reference: Arc<ReferenceData<InMemoryTableStore>>,
        sink: InMemoryNotificationSink,
    }

    fn setup() -> Fixture {
        let store = InMemoryTableStore::new();
        let reference = Arc::new(ReferenceData::with_retry(store.clone(), fast_retry()));
        let sink = InMemoryNotificationSink::new();
        let service = PlacementService::with_retry(
            store.clone(),
            reference.clone(),
            sink.clone(),
            fast_retry(),
        );
        Fixture {
            service,
            store,
            reference,
            sink,
        }
    }

    async fn seed_customer(store: &InMemoryTableStore) -> Customer {
        let customer = Customer {
            id: EntityId::new(),
            first_name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            address: "12 Analytical Way".to_string(),
            username: "ada".to_string(),
        };
        TypedTable::<Customer, _>::new(store.clone())
            .insert(&customer)
            .await
            .unwrap();
        customer
    }

    async fn seed_product(store: &InMemoryTableStore, price_cents: i64, stock: u32) -> Product {
        let product = Product {
            id: EntityId::new(),
            name: "Widget".to_string(),
            description: "A widget".to_string(),
            price: Money::from_cents(price_cents),
            stock_quantity: stock,
            image_url: String::new(),
        };
        TypedTable::<Product, _>::new(store.clone())
            .insert(&product)
            .await
            .unwrap();
        product
    }

    async fn stock_of(store: &InMemoryTableStore, product: &Product) -> u32 {
        TypedTable::<Product, _>::new(store.clone())
            .get(&product.id.to_string())
            .await
            .unwrap()
            .entity
            .stock_quantity
    }

    #[tokio::test]
    async fn happy_path_decrements_stock_and_snapshots_fields() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1500, 10).await;

        let order = fx
            .service
            .place_order(PlaceOrder::new(customer.id, product.id, 3))
            .await
            .unwrap();

        assert_eq!(order.quantity, 3);
        assert_eq!(order.status, "Pending");
        assert_eq!(order.unit_price, Money::from_cents(1500));
        assert_eq!(order.total_price(), Money::from_cents(4500));
        assert_eq!(order.product_name, "Widget");
        assert_eq!(order.customer_name, "Ada Lovelace");
        assert_eq!(order.username, "ada");

        assert_eq!(stock_of(&fx.store, &product).await, 7);
        assert_eq!(fx.store.partition_len("Order").await, 1);
        assert_eq!(fx.sink.message_count(), 1);
        let message = &fx.sink.messages_for(ORDERS_TOPIC)[0];
        assert!(message.contains("Ada Lovelace"));
        assert!(message.contains("$45.00"));
    }

    #[tokio::test]
    async fn custom_status_is_kept() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        let mut cmd = PlaceOrder::new(customer.id, product.id, 1);
        cmd.status = Some("Paid".to_string());
        let order = fx.service.place_order(cmd).await.unwrap();
        assert_eq!(order.status, "Paid");
    }

    #[tokio::test]
    async fn quantity_equal_to_stock_drives_stock_to_zero() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        fx.service
            .place_order(PlaceOrder::new(customer.id, product.id, 5))
            .await
            .unwrap();
        assert_eq!(stock_of(&fx.store, &product).await, 0);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        let err = fx
            .service
            .place_order(PlaceOrder::new(customer.id, product.id, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceOrderError::InvalidQuantity));
        assert_eq!(stock_of(&fx.store, &product).await, 5);
    }

    #[tokio::test]
    async fn insufficient_stock_reports_available_and_mutates_nothing() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 2).await;

        let err = fx
            .service
            .place_order(PlaceOrder::new(customer.id, product.id, 3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlaceOrderError::InsufficientStock {
                requested: 3,
                available: 2,
            }
        ));
        assert_eq!(stock_of(&fx.store, &product).await, 2);
        assert_eq!(fx.store.partition_len("Order").await, 0);
    }

    #[tokio::test]
    async fn unknown_customer_fails_before_any_mutation() {
        let fx = setup();
        let product = seed_product(&fx.store, 1000, 5).await;
        let missing = EntityId::new();

        let err = fx
            .service
            .place_order(PlaceOrder::new(missing, product.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceOrderError::CustomerNotFound(id) if id == missing));
        assert_eq!(stock_of(&fx.store, &product).await, 5);
        assert_eq!(fx.store.partition_len("Order").await, 0);
    }

    #[tokio::test]
    async fn unknown_product_fails_without_side_effects() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let missing = EntityId::new();

        let err = fx
            .service
            .place_order(PlaceOrder::new(customer.id, missing, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceOrderError::ProductNotFound(id) if id == missing));
        assert_eq!(fx.store.partition_len("Order").await, 0);
    }

    #[tokio::test]
    async fn failed_order_commit_rolls_stock_back() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        fx.store.set_fail_inserts("Order", true);

        let err = fx
            .service
            .place_order(PlaceOrder::new(customer.id, product.id, 2))
            .await
            .unwrap_err();

        match err {
            PlaceOrderError::OrderCreationFailed {
                stage,
                rollback: RollbackOutcome::Restored,
                ..
            } => assert_eq!(stage, PlacementState::OrderCommit),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stock_of(&fx.store, &product).await, 5);
        assert_eq!(fx.store.partition_len("Order").await, 0);
        assert_eq!(fx.sink.message_count(), 0);
    }

    #[tokio::test]
    async fn failed_rollback_surfaces_reconciliation_and_original_error() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        fx.store.set_fail_inserts("Order", true);
        fx.store.set_fail_force_updates(true);

        let err = fx
            .service
            .place_order(PlaceOrder::new(customer.id, product.id, 2))
            .await
            .unwrap_err();

        assert!(err.needs_reconciliation());
        assert!(matches!(
            err,
            PlaceOrderError::OrderCreationFailed {
                stage: PlacementState::OrderCommit,
                ..
            }
        ));
        // Stock stays decremented, and the call still reports failure.
        assert_eq!(stock_of(&fx.store, &product).await, 3);
        assert_eq!(fx.store.partition_len("Order").await, 0);
    }

    #[tokio::test]
    async fn stock_commit_failure_needs_no_rollback() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        fx.store.set_fail_updates("Product", true);

        let err = fx
            .service
            .place_order(PlaceOrder::new(customer.id, product.id, 2))
            .await
            .unwrap_err();

        match err {
            PlaceOrderError::OrderCreationFailed {
                stage,
                rollback: RollbackOutcome::NotNeeded,
                ..
            } => assert_eq!(stage, PlacementState::StockCommit),
            other => panic!("unexpected error: {other:?}"),
        }
        fx.store.set_fail_updates("Product", false);
        assert_eq!(stock_of(&fx.store, &product).await, 5);
    }

    #[tokio::test]
    async fn concurrent_placements_never_oversell() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        let (first, second) = tokio::join!(
            fx.service
                .place_order(PlaceOrder::new(customer.id, product.id, 5)),
            fx.service
                .place_order(PlaceOrder::new(customer.id, product.id, 5)),
        );

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one placement must win");

        let loser = if first.is_err() { first } else { second };
        assert!(matches!(
            loser.unwrap_err(),
            PlaceOrderError::VersionConflict
                | PlaceOrderError::InsufficientStock { .. }
        ));

        assert_eq!(stock_of(&fx.store, &product).await, 0);
        assert_eq!(fx.store.partition_len("Order").await, 1);
    }

    #[tokio::test]
    async fn product_cache_reflects_new_stock_on_next_read() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        // Warm the cache before placing
        let before = fx.reference.products_in_stock().await.unwrap();
        assert_eq!(before[0].stock_quantity, 5);

        fx.service
            .place_order(PlaceOrder::new(customer.id, product.id, 2))
            .await
            .unwrap();

        let after = fx.reference.products_in_stock().await.unwrap();
        assert_eq!(after[0].stock_quantity, 3);
    }

    #[tokio::test]
    async fn transient_failures_are_absorbed_by_retry() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        // Two transient failures, absorbed within three attempts
        fx.store.inject_transient_failures(2);

        let order = fx
            .service
            .place_order(PlaceOrder::new(customer.id, product.id, 1))
            .await
            .unwrap();
        assert_eq!(order.quantity, 1);
        assert_eq!(stock_of(&fx.store, &product).await, 4);
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_the_order() {
        let fx = setup();
        let customer = seed_customer(&fx.store).await;
        let product = seed_product(&fx.store, 1000, 5).await;

        fx.sink.set_fail_on_send(true);

        let order = fx
            .service
            .place_order(PlaceOrder::new(customer.id, product.id, 1))
            .await
            .unwrap();

        assert_eq!(fx.sink.message_count(), 0);
        assert_eq!(stock_of(&fx.store, &product).await, 4);
        // The committed order is retrievable
        let stored = TypedTable::<Order, _>::new(fx.store.clone())
            .get(&order.id.to_string())
            .await
            .unwrap();
        assert_eq!(stored.entity.id, order.id);
    }
}
