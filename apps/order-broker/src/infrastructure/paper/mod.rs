//! Paper Gateway
//!
//! In-process [`OrderGateway`] that acknowledges everything it is sent and
//! reports back over the broker's event queue, the same way a venue adapter
//! would. Fills, books and connectivity changes are injected by the caller.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::application::ports::{GatewayEvent, OrderGateway};
use crate::domain::market::{ConnectivityStatus, MarketBook};
use crate::domain::order::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, Exchange, ExchangeOrderId,
    GatewayOrderStatusReport, OrderIdentity, OrderStatus,
};
use crate::infrastructure::config::GatewaySettings;

const GATEWAY_NAME: &str = "paper";

#[derive(Debug, Clone)]
struct PaperOrder {
    exchange_id: ExchangeOrderId,
    leaves_quantity: Decimal,
    cum_quantity: Decimal,
    notional: Decimal,
}

/// Simulated gateway for local runs and tests.
#[derive(Debug)]
pub struct PaperGateway {
    settings: GatewaySettings,
    events: mpsc::Sender<GatewayEvent>,
    orders: Mutex<HashMap<OrderIdentity, PaperOrder>>,
}

impl PaperGateway {
    /// Create a gateway that reports to `events`.
    #[must_use]
    pub fn new(settings: GatewaySettings, events: mpsc::Sender<GatewayEvent>) -> Self {
        Self {
            settings,
            events,
            orders: Mutex::new(HashMap::new()),
        }
    }

    /// Report a new book snapshot.
    pub fn publish_book(&self, book: MarketBook) {
        self.emit(GatewayEvent::MarketData(book));
    }

    /// Report a connectivity change.
    pub fn set_connectivity(&self, status: ConnectivityStatus) {
        self.emit(GatewayEvent::Connectivity(status));
    }

    /// Execute `quantity` of a working order at `price`.
    ///
    /// The fill is capped at the open quantity. Returns `false` if the order
    /// is not open on this gateway.
    pub fn fill(&self, order_id: &OrderIdentity, quantity: Decimal, price: Decimal) -> bool {
        let update = {
            let mut orders = self.orders.lock();
            let Some(order) = orders.get_mut(order_id) else {
                return false;
            };

            let executed = quantity.min(order.leaves_quantity);
            if executed <= Decimal::ZERO {
                return false;
            }
            order.leaves_quantity -= executed;
            order.cum_quantity += executed;
            order.notional += executed * price;

            let status = if order.leaves_quantity.is_zero() {
                OrderStatus::Filled
            } else {
                OrderStatus::PartialFill
            };
            let update = GatewayOrderStatusReport::new(order_id.clone())
                .with_status(status)
                .with_time(Utc::now())
                .with_fill(
                    executed,
                    price,
                    order.leaves_quantity,
                    order.cum_quantity,
                    order.notional / order.cum_quantity,
                );

            if status == OrderStatus::Filled {
                orders.remove(order_id);
            }
            update
        };

        self.emit(GatewayEvent::OrderUpdate(update));
        true
    }

    /// Number of orders open on this gateway.
    #[must_use]
    pub fn open_order_count(&self) -> usize {
        self.orders.lock().len()
    }

    fn emit(&self, event: GatewayEvent) {
        if let Err(e) = self.events.try_send(event) {
            tracing::warn!(error = %e, "Paper gateway event dropped");
        }
    }
}

impl OrderGateway for PaperGateway {
    fn send_order(&self, order: &BrokeredOrder) {
        let exchange_id = ExchangeOrderId::new(uuid::Uuid::new_v4().to_string());
        self.orders.lock().insert(
            order.order_id.clone(),
            PaperOrder {
                exchange_id: exchange_id.clone(),
                leaves_quantity: order.quantity,
                cum_quantity: Decimal::ZERO,
                notional: Decimal::ZERO,
            },
        );

        tracing::debug!(
            order_id = %order.order_id,
            exchange_id = %exchange_id,
            "Paper order acknowledged"
        );
        self.emit(GatewayEvent::OrderUpdate(
            GatewayOrderStatusReport::new(order.order_id.clone())
                .with_status(OrderStatus::Working)
                .with_exchange_id(exchange_id)
                .with_leaves_quantity(order.quantity)
                .with_time(Utc::now()),
        ));
    }

    fn replace_order(&self, replace: &BrokeredReplace) {
        let update = {
            let mut orders = self.orders.lock();
            match orders.get_mut(&replace.orig_order_id) {
                Some(order) if replace.quantity > order.cum_quantity => {
                    order.leaves_quantity = replace.quantity - order.cum_quantity;
                    let mut update = GatewayOrderStatusReport::new(replace.orig_order_id.clone())
                        .with_status(OrderStatus::Working)
                        .with_exchange_id(order.exchange_id.clone())
                        .with_leaves_quantity(order.leaves_quantity)
                        .with_time(Utc::now());
                    update.quantity = Some(replace.quantity);
                    update.price = replace.price;
                    update
                }
                Some(_) => GatewayOrderStatusReport::new(replace.orig_order_id.clone())
                    .with_reject_message("replace quantity does not exceed filled quantity")
                    .with_time(Utc::now()),
                None => GatewayOrderStatusReport::new(replace.orig_order_id.clone())
                    .with_reject_message("order is not open")
                    .with_time(Utc::now()),
            }
        };

        tracing::debug!(
            order_id = %replace.order_id,
            orig_order_id = %replace.orig_order_id,
            rejected = update.reject_message.is_some(),
            "Paper replace handled"
        );
        self.emit(GatewayEvent::OrderUpdate(update));
    }

    fn cancel_order(&self, cancel: &BrokeredCancel) {
        let update = if self.orders.lock().remove(&cancel.orig_order_id).is_some() {
            GatewayOrderStatusReport::new(cancel.orig_order_id.clone())
                .with_status(OrderStatus::Cancelled)
                .with_leaves_quantity(Decimal::ZERO)
                .with_time(Utc::now())
        } else {
            GatewayOrderStatusReport::new(cancel.orig_order_id.clone())
                .with_reject_message("order is not open")
                .with_time(Utc::now())
        };

        tracing::debug!(
            order_id = %cancel.order_id,
            orig_order_id = %cancel.orig_order_id,
            rejected = update.reject_message.is_some(),
            "Paper cancel handled"
        );
        self.emit(GatewayEvent::OrderUpdate(update));
    }

    fn make_fee(&self) -> Decimal {
        self.settings.make_fee
    }

    fn take_fee(&self) -> Decimal {
        self.settings.take_fee
    }

    fn name(&self) -> &str {
        GATEWAY_NAME
    }

    fn exchange(&self) -> Exchange {
        self.settings.exchange.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
