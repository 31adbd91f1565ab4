//! Placement error taxonomy.

use common::EntityId;
use storage::StorageError;
use thiserror::Error;

use crate::state::PlacementState;

/// What happened to the compensating stock write after a failed order
/// commit. A first-class outcome rather than a swallowed side effect, so
/// callers and operators can tell a clean abort from stock that needs
/// manual reconciliation.
#[derive(Debug)]
pub enum RollbackOutcome {
    /// Nothing had been committed when the failure occurred; there was
    /// nothing to undo.
    NotNeeded,

    /// The compensating write restored the pre-decrement snapshot.
    Restored,

    /// The compensating write itself failed. Stock remains decremented and
    /// must be reconciled manually.
    Failed(StorageError),
}

impl RollbackOutcome {
    /// Returns true if stock was left decremented without an order.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, RollbackOutcome::Failed(_))
    }
}

/// Errors that can occur when placing an order.
///
/// Lookup and validation failures carry no side effects. `VersionConflict`
/// means another placement won the stock-update race; the caller should
/// retry the whole placement. `OrderCreationFailed` may carry a rollback
/// outcome when the failure happened after the stock decrement.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// Customer not found. No state mutated.
    #[error("Customer not found: {0}")]
    CustomerNotFound(EntityId),

    /// Product not found. No state mutated.
    #[error("Product not found: {0}")]
    ProductNotFound(EntityId),

    /// Quantity must be a positive integer.
    #[error("Quantity must be a positive integer")]
    InvalidQuantity,

    /// Requested quantity exceeds stock on hand. No state mutated.
    #[error("Insufficient stock: requested {requested}, only {available} available")]
    InsufficientStock { requested: u32, available: u32 },

    /// Another placement updated the product first. No partial effect; the
    /// whole placement can be retried.
    #[error("Product was modified concurrently; retry the placement")]
    VersionConflict,

    /// The placement failed at the given stage. When `rollback` is
    /// `Failed`, stock was left decremented for operator reconciliation.
    #[error("Order creation failed at {stage}: {source}")]
    OrderCreationFailed {
        stage: PlacementState,
        rollback: RollbackOutcome,
        #[source]
        source: StorageError,
    },
}

impl PlaceOrderError {
    /// Returns the rollback outcome, if the error carries one.
    pub fn rollback(&self) -> Option<&RollbackOutcome> {
        match self {
            PlaceOrderError::OrderCreationFailed { rollback, .. } => Some(rollback),
            _ => None,
        }
    }

    /// Returns true if this failure left stock decremented without an
    /// order.
    pub fn needs_reconciliation(&self) -> bool {
        self.rollback()
            .is_some_and(RollbackOutcome::needs_reconciliation)
    }
}
