//! Order entity.

use chrono::{DateTime, Utc};
use common::EntityId;
use serde::{Deserialize, Serialize};
use storage::TableEntity;

use crate::money::Money;

/// A placed order.
///
/// `unit_price`, `product_name`, `customer_name`, and `username` are
/// snapshots captured at placement time and never resynchronized if the
/// source customer or product later changes. The total is always derived
/// from `unit_price * quantity`, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: EntityId,
    pub customer_id: EntityId,
    pub product_id: EntityId,
    pub quantity: u32,
    pub status: String,
    pub order_date: DateTime<Utc>,
    pub unit_price: Money,
    pub product_name: String,
    pub customer_name: String,
    pub username: String,
}

impl Order {
    /// Status assigned to freshly placed orders.
    pub const DEFAULT_STATUS: &'static str = "Pending";

    /// Total price, derived on read.
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

impl TableEntity for Order {
    const PARTITION: &'static str = "Order";

    fn row_key(&self) -> String {
        self.id.to_string()
    }
}
