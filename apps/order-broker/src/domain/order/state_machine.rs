//! Order status transitions.
//!
//! The broker merges gateway updates without consulting this table unless
//! strict transitions are enabled in its configuration.

use super::value_objects::OrderStatus;

/// An update would move an order along an illegal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal order transition {from} -> {to}")]
pub struct TransitionError {
    /// Current status.
    pub from: OrderStatus,
    /// Requested status.
    pub to: OrderStatus,
}

/// Order status state machine.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    ///
    /// Non-terminal states may repeat (further acks, further partial fills).
    #[must_use]
    pub const fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::{Cancelled, Filled, New, PartialFill, Rejected, Working};

        matches!(
            (from, to),
            (New, New | Working | PartialFill | Rejected | Cancelled)
                | (
                    Working | PartialFill,
                    Working | PartialFill | Filled | Cancelled | Rejected
                )
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if `to` is not reachable from `from`.
    pub const fn validate_transition(
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), TransitionError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(TransitionError { from, to })
        }
    }
}
