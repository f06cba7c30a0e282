//! Application Services
//!
//! - `OrderBroker`: tracks order history, merges gateway updates and
//!   republishes order, market-data and connectivity events

mod error;
mod order_broker;

pub use error::BrokerError;
pub use order_broker::{OrderBroker, UpdateOutcome};
