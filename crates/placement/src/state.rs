//! Placement state machine.

use serde::{Deserialize, Serialize};

/// The stage an order placement is in.
///
/// Transitions:
/// ```text
/// Start ──► CustomerLookup ──► ProductLookup ──► StockCheck
///   ──► StockCommit ──► OrderCommit ──► Notify ──► Done
///                            │
///                            └──► RollingBack ──► Failed
/// ```
/// Lookup and check stages fail directly to `Failed` with nothing to undo.
/// `RollingBack` is entered only after a successful stock commit whose
/// order insert then failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlacementState {
    /// Placement has not started yet.
    #[default]
    Start,

    /// Fetching the customer record.
    CustomerLookup,

    /// Fetching the product record and capturing the rollback snapshot.
    ProductLookup,

    /// Validating requested quantity against stock on hand.
    StockCheck,

    /// Conditionally decrementing stock with the snapshot's version token.
    StockCommit,

    /// Inserting the order row.
    OrderCommit,

    /// Issuing the compensating write restoring the stock snapshot.
    RollingBack,

    /// Best-effort notification of the committed order.
    Notify,

    /// Placement committed (terminal state).
    Done,

    /// Placement aborted (terminal state).
    Failed,
}

impl PlacementState {
    /// Returns true if stock has been decremented by the time this state is
    /// reached, meaning a failure from here needs compensation.
    pub fn stock_committed(&self) -> bool {
        matches!(
            self,
            PlacementState::OrderCommit
                | PlacementState::RollingBack
                | PlacementState::Notify
                | PlacementState::Done
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlacementState::Done | PlacementState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementState::Start => "Start",
            PlacementState::CustomerLookup => "CustomerLookup",
            PlacementState::ProductLookup => "ProductLookup",
            PlacementState::StockCheck => "StockCheck",
            PlacementState::StockCommit => "StockCommit",
            PlacementState::OrderCommit => "OrderCommit",
            PlacementState::RollingBack => "RollingBack",
            PlacementState::Notify => "Notify",
            PlacementState::Done => "Done",
            PlacementState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PlacementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
