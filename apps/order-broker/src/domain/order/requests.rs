//! Order requests: what a consumer asks for and what the gateway is sent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::identifiers::{Exchange, ExchangeOrderId, OrderIdentity};
use super::value_objects::{OrderType, Side, TimeInForce};

/// A new order as issued by a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Order side.
    pub side: Side,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Order type.
    pub order_type: OrderType,
    /// Limit price (absent for market orders).
    pub price: Option<Decimal>,
    /// Time in force.
    pub time_in_force: TimeInForce,
}

impl NewOrder {
    /// Limit order.
    #[must_use]
    pub const fn limit(
        side: Side,
        quantity: Decimal,
        price: Decimal,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            side,
            quantity,
            order_type: OrderType::Limit,
            price: Some(price),
            time_in_force,
        }
    }

    /// Market order.
    #[must_use]
    pub const fn market(side: Side, quantity: Decimal, time_in_force: TimeInForce) -> Self {
        Self {
            side,
            quantity,
            order_type: OrderType::Market,
            price: None,
            time_in_force,
        }
    }
}

/// New-order message sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokeredOrder {
    /// Identity assigned by the broker.
    pub order_id: OrderIdentity,
    /// Order side.
    pub side: Side,
    /// Quantity.
    pub quantity: Decimal,
    /// Order type.
    pub order_type: OrderType,
    /// Limit price.
    pub price: Option<Decimal>,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Target venue.
    pub exchange: Exchange,
}

/// Cancel-replace message sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokeredReplace {
    /// Fresh identity for the replace message.
    pub order_id: OrderIdentity,
    /// Identity of the order being replaced.
    pub orig_order_id: OrderIdentity,
    /// Side, carried from the original order.
    pub side: Side,
    /// Replacement quantity.
    pub quantity: Decimal,
    /// Order type, carried from the original order.
    pub order_type: OrderType,
    /// Replacement price.
    pub price: Option<Decimal>,
    /// Time in force, carried from the original order.
    pub time_in_force: TimeInForce,
    /// Venue of the original order.
    pub exchange: Exchange,
    /// Exchange id of the original order, if acknowledged.
    pub exchange_id: Option<ExchangeOrderId>,
}

/// Cancel message sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokeredCancel {
    /// Identity of the order being cancelled.
    pub orig_order_id: OrderIdentity,
    /// Fresh identity for the cancel message.
    pub order_id: OrderIdentity,
    /// Side of the original order.
    pub side: Side,
    /// Exchange id of the original order, if acknowledged.
    pub exchange_id: Option<ExchangeOrderId>,
}

/// Consumer request to cancel an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancel {
    /// Identity of the order to cancel.
    pub orig_order_id: OrderIdentity,
    /// Venue the order was sent to.
    pub exchange: Exchange,
}

impl OrderCancel {
    /// Cancel `orig_order_id` on `exchange`.
    #[must_use]
    pub const fn new(orig_order_id: OrderIdentity, exchange: Exchange) -> Self {
        Self {
            orig_order_id,
            exchange,
        }
    }
}

/// Consumer request to replace an order's quantity and price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReplaceOrder {
    /// Identity of the order to replace.
    pub orig_order_id: OrderIdentity,
    /// New quantity.
    pub quantity: Decimal,
    /// New price.
    pub price: Option<Decimal>,
}

impl CancelReplaceOrder {
    /// Replace `orig_order_id` with a new quantity and price.
    #[must_use]
    pub const fn new(
        orig_order_id: OrderIdentity,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> Self {
        Self {
            orig_order_id,
            quantity,
            price,
        }
    }
}
