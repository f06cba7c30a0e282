//! Errors surfaced to broker callers.

use crate::domain::order::OrderIdentity;

/// Order broker error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// Cancel or replace referenced an identity with no history.
    #[error("order not found: {0}")]
    OrderNotFound(OrderIdentity),
}
