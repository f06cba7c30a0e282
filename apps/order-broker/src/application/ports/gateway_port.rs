//! Gateway Port (Driven Port)
//!
//! Interface for an exchange connectivity adapter. Sends are fire-and-forget:
//! the outcome of every request comes back later as a [`GatewayEvent`].

use rust_decimal::Decimal;

use crate::domain::market::{ConnectivityStatus, MarketBook};
use crate::domain::order::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, Exchange, GatewayOrderStatusReport,
};

/// Port for exchange gateway interactions.
#[cfg_attr(test, mockall::automock)]
pub trait OrderGateway: Send + Sync {
    /// Send a new order.
    fn send_order(&self, order: &BrokeredOrder);

    /// Send a cancel-replace.
    fn replace_order(&self, replace: &BrokeredReplace);

    /// Send a cancel.
    fn cancel_order(&self, cancel: &BrokeredCancel);

    /// Maker fee rate.
    fn make_fee(&self) -> Decimal;

    /// Taker fee rate.
    fn take_fee(&self) -> Decimal;

    /// Gateway name.
    fn name(&self) -> &str;

    /// Venue this gateway trades on.
    fn exchange(&self) -> Exchange;
}

/// Inbound notification from a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// New book snapshot.
    MarketData(MarketBook),
    /// Session state change.
    Connectivity(ConnectivityStatus),
    /// Partial order status update.
    OrderUpdate(GatewayOrderStatusReport),
}

impl GatewayEvent {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MarketData(_) => "market_data",
            Self::Connectivity(_) => "connectivity",
            Self::OrderUpdate(_) => "order_update",
        }
    }
}
