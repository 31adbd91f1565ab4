//! Order placement workflow.
//!
//! Placing an order spans four remote writes/reads against a store with no
//! multi-entity transactions: customer lookup, product lookup, conditional
//! stock decrement, and order insert. The workflow is an explicit state
//! machine with a best-effort compensating rollback of the stock decrement
//! when the order insert fails.

mod error;
mod notify;
mod service;
mod state;

pub use error::{PlaceOrderError, RollbackOutcome};
pub use notify::{InMemoryNotificationSink, NotificationSink, NotifyError};
pub use service::{PlaceOrder, PlacementService, ORDERS_TOPIC};
pub use state::PlacementState;
