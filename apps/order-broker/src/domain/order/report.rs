//! Order status reports and the partial-update merge.
//!
//! [`OrderStatusReport`] is the canonical, fully-populated snapshot the broker
//! keeps in history. [`GatewayOrderStatusReport`] is what a gateway sends: any
//! field may be absent, and absence means "unchanged". A present value always
//! wins, including zero quantities and empty strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::identifiers::{Exchange, ExchangeOrderId, OrderIdentity};
use super::requests::NewOrder;
use super::value_objects::{OrderStatus, OrderType, Side, TimeInForce};

/// Immutable snapshot of an order at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    /// Broker-local identity.
    pub order_id: OrderIdentity,
    /// Order side.
    pub side: Side,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Order type.
    pub order_type: OrderType,
    /// Time of the event this snapshot reflects.
    pub time: DateTime<Utc>,
    /// Limit price.
    pub price: Option<Decimal>,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Venue.
    pub exchange: Exchange,
    /// Exchange-assigned id, known after acknowledgment.
    pub exchange_id: Option<ExchangeOrderId>,
    /// Quantity of the most recent fill.
    pub last_quantity: Option<Decimal>,
    /// Price of the most recent fill.
    pub last_price: Option<Decimal>,
    /// Quantity still open.
    pub leaves_quantity: Decimal,
    /// Cumulative filled quantity.
    pub cum_quantity: Decimal,
    /// Average fill price.
    pub average_price: Option<Decimal>,
    /// Reject reason.
    pub reject_message: Option<String>,
}

impl OrderStatusReport {
    /// Initial `New` report recorded when an order is submitted.
    #[must_use]
    pub fn submitted(
        order_id: OrderIdentity,
        order: &NewOrder,
        exchange: Exchange,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            side: order.side,
            quantity: order.quantity,
            order_type: order.order_type,
            time,
            price: order.price,
            time_in_force: order.time_in_force,
            status: OrderStatus::New,
            exchange,
            exchange_id: None,
            last_quantity: None,
            last_price: None,
            leaves_quantity: order.quantity,
            cum_quantity: Decimal::ZERO,
            average_price: None,
            reject_message: None,
        }
    }

    /// Apply a partial gateway update on top of this report.
    ///
    /// Side, quantity, type, price, time-in-force and exchange are carried
    /// forward from `self` whatever the update says.
    #[must_use]
    pub fn merge(&self, update: &GatewayOrderStatusReport) -> Self {
        Self {
            order_id: self.order_id.clone(),
            side: self.side,
            quantity: self.quantity,
            order_type: self.order_type,
            time: update.time.unwrap_or(self.time),
            price: self.price,
            time_in_force: self.time_in_force,
            status: update.status.unwrap_or(self.status),
            exchange: self.exchange.clone(),
            exchange_id: update
                .exchange_id
                .clone()
                .or_else(|| self.exchange_id.clone()),
            last_quantity: update.last_quantity.or(self.last_quantity),
            last_price: update.last_price.or(self.last_price),
            leaves_quantity: update.leaves_quantity.unwrap_or(self.leaves_quantity),
            cum_quantity: update.cum_quantity.unwrap_or(self.cum_quantity),
            average_price: update.average_price.or(self.average_price),
            reject_message: update
                .reject_message
                .clone()
                .or_else(|| self.reject_message.clone()),
        }
    }
}

/// Partial order update as reported by a gateway.
///
/// The immutable order attributes (`side` through `exchange`) are accepted so
/// gateways can pass through whatever their venue sends, but the merge never
/// reads them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatewayOrderStatusReport {
    /// Identity the update refers to.
    pub order_id: OrderIdentity,
    /// New status.
    pub status: Option<OrderStatus>,
    /// Reject reason.
    pub reject_message: Option<String>,
    /// Event time.
    pub time: Option<DateTime<Utc>>,
    /// Last fill quantity.
    pub last_quantity: Option<Decimal>,
    /// Last fill price.
    pub last_price: Option<Decimal>,
    /// Open quantity.
    pub leaves_quantity: Option<Decimal>,
    /// Cumulative filled quantity.
    pub cum_quantity: Option<Decimal>,
    /// Average fill price.
    pub average_price: Option<Decimal>,
    /// Exchange-assigned id.
    pub exchange_id: Option<ExchangeOrderId>,
    /// Ignored by the merge.
    pub side: Option<Side>,
    /// Ignored by the merge.
    pub quantity: Option<Decimal>,
    /// Ignored by the merge.
    pub order_type: Option<OrderType>,
    /// Ignored by the merge.
    pub price: Option<Decimal>,
    /// Ignored by the merge.
    pub time_in_force: Option<TimeInForce>,
    /// Ignored by the merge.
    pub exchange: Option<Exchange>,
}

impl GatewayOrderStatusReport {
    /// Empty update for an identity.
    #[must_use]
    pub fn new(order_id: OrderIdentity) -> Self {
        Self {
            order_id,
            ..Self::default()
        }
    }

    /// Set the status.
    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the exchange-assigned id.
    #[must_use]
    pub fn with_exchange_id(mut self, exchange_id: ExchangeOrderId) -> Self {
        self.exchange_id = Some(exchange_id);
        self
    }

    /// Set the event time.
    #[must_use]
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Record a fill and the resulting open/cumulative quantities.
    #[must_use]
    pub fn with_fill(
        mut self,
        last_quantity: Decimal,
        last_price: Decimal,
        leaves_quantity: Decimal,
        cum_quantity: Decimal,
        average_price: Decimal,
    ) -> Self {
        self.last_quantity = Some(last_quantity);
        self.last_price = Some(last_price);
        self.leaves_quantity = Some(leaves_quantity);
        self.cum_quantity = Some(cum_quantity);
        self.average_price = Some(average_price);
        self
    }

    /// Set the open quantity.
    #[must_use]
    pub fn with_leaves_quantity(mut self, leaves_quantity: Decimal) -> Self {
        self.leaves_quantity = Some(leaves_quantity);
        self
    }

    /// Set the reject reason.
    #[must_use]
    pub fn with_reject_message(mut self, message: impl Into<String>) -> Self {
        self.reject_message = Some(message.into());
        self
    }
}
