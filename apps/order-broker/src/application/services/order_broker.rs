//! Order Broker Service
//!
//! Sits between a strategy and a single exchange gateway. Assigns order
//! identities, keeps the append-only history of every order, merges partial
//! gateway updates into canonical reports, deduplicates book snapshots and
//! republishes all three inbound streams to its own subscribers.
//!
//! All mutable state sits behind one mutex. Broadcasts happen under the lock
//! so subscribers observe the same order as history; `broadcast::Sender::send`
//! never blocks. The lock is released before any gateway call, so gateways may
//! report back into the broker synchronously.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::error::BrokerError;
use crate::application::ports::{GatewayEvent, OrderGateway};
use crate::domain::market::{ConnectivityStatus, MarketBook};
use crate::domain::order::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, CancelReplaceOrder, Exchange,
    GatewayOrderStatusReport, IdentityGenerator, NewOrder, OrderCancel, OrderIdentity,
    OrderStateMachine, OrderStatusReport, TransitionError,
};
use crate::infrastructure::broadcast::SharedBroadcastHub;
use crate::infrastructure::metrics;

/// What happened to a gateway order update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Merged, appended to history and published.
    Merged(OrderStatusReport),
    /// No history for the identity; dropped.
    UnknownOrder,
    /// Strict mode refused the status change; dropped.
    IllegalTransition(TransitionError),
}

#[derive(Debug, Default)]
struct BrokerState {
    orders: BTreeMap<OrderIdentity, Vec<OrderStatusReport>>,
    book: Option<MarketBook>,
}

/// Order state tracker and event-merge engine for one gateway.
pub struct OrderBroker<G> {
    gateway: Arc<G>,
    hub: SharedBroadcastHub,
    identities: IdentityGenerator,
    strict_transitions: bool,
    state: Mutex<BrokerState>,
}

impl<G: OrderGateway> OrderBroker<G> {
    /// Create a broker in front of `gateway`, publishing through `hub`.
    #[must_use]
    pub fn new(gateway: Arc<G>, hub: SharedBroadcastHub) -> Self {
        Self {
            gateway,
            hub,
            identities: IdentityGenerator::new(),
            strict_transitions: false,
            state: Mutex::new(BrokerState::default()),
        }
    }

    /// Drop updates that would make an illegal status transition.
    #[must_use]
    pub fn with_strict_transitions(mut self, strict: bool) -> Self {
        self.strict_transitions = strict;
        self
    }

    /// Whether strict transition checking is on.
    #[must_use]
    pub const fn strict_transitions(&self) -> bool {
        self.strict_transitions
    }

    /// The gateway this broker drives.
    #[must_use]
    pub const fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    // =========================================================================
    // Outbound: consumer requests
    // =========================================================================

    /// Submit a new order and return its identity.
    ///
    /// The initial `New` report is recorded before the gateway is called, but
    /// no order update is published for it.
    pub fn submit(&self, order: &NewOrder) -> OrderIdentity {
        let order_id = self.identities.next_identity();
        let report = OrderStatusReport::submitted(
            order_id.clone(),
            order,
            self.gateway.exchange(),
            Utc::now(),
        );
        let brokered = BrokeredOrder {
            order_id: order_id.clone(),
            side: report.side,
            quantity: report.quantity,
            order_type: report.order_type,
            price: report.price,
            time_in_force: report.time_in_force,
            exchange: report.exchange.clone(),
        };

        self.state.lock().orders.insert(order_id.clone(), vec![report]);

        tracing::info!(
            order_id = %order_id,
            side = %brokered.side,
            quantity = %brokered.quantity,
            price = ?brokered.price,
            exchange = %brokered.exchange,
            "Sending order"
        );
        self.gateway.send_order(&brokered);
        metrics::record_order_submitted();

        order_id
    }

    /// Cancel an order and return the identity of the cancel message.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::OrderNotFound`] if the order was never
    /// submitted through this broker. The gateway is not called.
    pub fn cancel(&self, cancel: &OrderCancel) -> Result<OrderIdentity, BrokerError> {
        let current = self.require_current(&cancel.orig_order_id)?;
        Ok(self.send_cancel(&current))
    }

    /// Cancel-replace an order and return the identity of the replace message.
    ///
    /// Side, type, time-in-force and exchange come from the original order.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::OrderNotFound`] if the order was never
    /// submitted through this broker. The gateway is not called.
    pub fn replace(&self, replace: &CancelReplaceOrder) -> Result<OrderIdentity, BrokerError> {
        let current = self.require_current(&replace.orig_order_id)?;
        let brokered = BrokeredReplace {
            order_id: self.identities.next_identity(),
            orig_order_id: current.order_id.clone(),
            side: current.side,
            quantity: replace.quantity,
            order_type: current.order_type,
            price: replace.price,
            time_in_force: current.time_in_force,
            exchange: current.exchange.clone(),
            exchange_id: current.exchange_id.clone(),
        };

        tracing::info!(
            order_id = %brokered.order_id,
            orig_order_id = %brokered.orig_order_id,
            status = %current.status,
            quantity = %brokered.quantity,
            price = ?brokered.price,
            "Cancel-replacing order"
        );
        self.gateway.replace_order(&brokered);
        metrics::record_replace_sent();

        Ok(brokered.order_id)
    }

    /// Cancel every order whose current status is open.
    ///
    /// Returns how many cancels were sent.
    pub fn cancel_all_open_orders(&self) -> usize {
        let open = self.open_orders();
        for report in &open {
            self.send_cancel(report);
        }
        tracing::info!(count = open.len(), "Cancelled open orders");
        open.len()
    }

    fn send_cancel(&self, current: &OrderStatusReport) -> OrderIdentity {
        let cancel = BrokeredCancel {
            orig_order_id: current.order_id.clone(),
            order_id: self.identities.next_identity(),
            side: current.side,
            exchange_id: current.exchange_id.clone(),
        };

        tracing::info!(
            order_id = %cancel.order_id,
            orig_order_id = %cancel.orig_order_id,
            status = %current.status,
            exchange_id = ?cancel.exchange_id,
            "Cancelling order"
        );
        self.gateway.cancel_order(&cancel);
        metrics::record_cancel_sent();

        cancel.order_id
    }

    fn require_current(&self, order_id: &OrderIdentity) -> Result<OrderStatusReport, BrokerError> {
        self.current_report(order_id).ok_or_else(|| {
            tracing::warn!(order_id = %order_id, "Order not found");
            BrokerError::OrderNotFound(order_id.clone())
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Every report of every order, grouped by identity, oldest first.
    ///
    /// This is the full history, not just current states.
    #[must_use]
    pub fn all_order_states(&self) -> Vec<OrderStatusReport> {
        self.state
            .lock()
            .orders
            .values()
            .flat_map(|history| history.iter().cloned())
            .collect()
    }

    /// History of one order, oldest first.
    #[must_use]
    pub fn order_history(&self, order_id: &OrderIdentity) -> Option<Vec<OrderStatusReport>> {
        self.state.lock().orders.get(order_id).cloned()
    }

    /// Current (latest) report of one order.
    #[must_use]
    pub fn current_report(&self, order_id: &OrderIdentity) -> Option<OrderStatusReport> {
        self.state
            .lock()
            .orders
            .get(order_id)
            .and_then(|history| history.last().cloned())
    }

    /// Current reports of every order that is still open.
    #[must_use]
    pub fn open_orders(&self) -> Vec<OrderStatusReport> {
        self.state
            .lock()
            .orders
            .values()
            .filter_map(|history| history.last())
            .filter(|report| report.status.is_open())
            .cloned()
            .collect()
    }

    /// Last accepted book, if any has arrived.
    #[must_use]
    pub fn current_book(&self) -> Option<MarketBook> {
        self.state.lock().book.clone()
    }

    // =========================================================================
    // Inbound: gateway events
    // =========================================================================

    /// Merge a partial gateway update into the order's history.
    ///
    /// Updates for unknown identities are logged and dropped; they are
    /// expected for stale or foreign orders and are not an error.
    pub fn on_order_update(&self, update: &GatewayOrderStatusReport) -> UpdateOutcome {
        let merged = match self.apply_update(update) {
            Ok(merged) => merged,
            Err(outcome) => {
                match &outcome {
                    UpdateOutcome::IllegalTransition(e) => {
                        tracing::warn!(
                            order_id = %update.order_id,
                            from = %e.from,
                            to = %e.to,
                            "Dropping illegal order transition"
                        );
                        metrics::record_update_rejected(e.from, e.to);
                    }
                    _ => {
                        tracing::warn!(
                            order_id = %update.order_id,
                            status = ?update.status,
                            "Dropping update for unknown order"
                        );
                        metrics::record_update_dropped();
                    }
                }
                return outcome;
            }
        };

        tracing::debug!(
            order_id = %merged.order_id,
            status = %merged.status,
            leaves_quantity = %merged.leaves_quantity,
            cum_quantity = %merged.cum_quantity,
            "Applied gateway update"
        );
        metrics::record_update_merged(merged.status);

        UpdateOutcome::Merged(merged)
    }

    fn apply_update(
        &self,
        update: &GatewayOrderStatusReport,
    ) -> Result<OrderStatusReport, UpdateOutcome> {
        let mut state = self.state.lock();
        let history = state
            .orders
            .get_mut(&update.order_id)
            .ok_or(UpdateOutcome::UnknownOrder)?;
        let previous = history.last().ok_or(UpdateOutcome::UnknownOrder)?;

        if self.strict_transitions
            && let Some(to) = update.status
        {
            OrderStateMachine::validate_transition(previous.status, to)
                .map_err(UpdateOutcome::IllegalTransition)?;
        }

        let merged = previous.merge(update);
        history.push(merged.clone());
        if self.hub.send_order_update(merged.clone()).is_none() {
            tracing::trace!(order_id = %merged.order_id, "No order update subscribers");
        }
        drop(state);

        Ok(merged)
    }

    /// Accept a book snapshot unless its levels match the held book.
    ///
    /// Returns `true` if the book was accepted and published.
    pub fn on_market_data(&self, book: MarketBook) -> bool {
        {
            let mut state = self.state.lock();
            if state
                .book
                .as_ref()
                .is_some_and(|held| held.same_levels(&book))
            {
                drop(state);
                metrics::record_market_data_deduplicated();
                return false;
            }
            state.book = Some(book.clone());
            if self.hub.send_market_data(book.clone()).is_none() {
                tracing::trace!("No market data subscribers");
            }
        }

        tracing::trace!(
            bid = %book.top.bid.price,
            ask = %book.top.ask.price,
            "Market book changed"
        );
        metrics::record_market_data_published();
        true
    }

    /// Log and republish a connectivity change.
    pub fn on_connectivity_change(&self, status: ConnectivityStatus) {
        match status {
            ConnectivityStatus::Connected => {
                tracing::info!(gateway = self.gateway.name(), "Gateway connected");
            }
            ConnectivityStatus::Disconnected => {
                tracing::warn!(gateway = self.gateway.name(), "Gateway disconnected");
            }
        }
        metrics::record_connectivity_change(status);
        if self.hub.send_connectivity(status).is_none() {
            tracing::trace!(status = %status, "No connectivity subscribers");
        }
    }

    /// Route one gateway event to its handler.
    pub fn dispatch(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::MarketData(book) => {
                self.on_market_data(book);
            }
            GatewayEvent::Connectivity(status) => self.on_connectivity_change(status),
            GatewayEvent::OrderUpdate(update) => {
                self.on_order_update(&update);
            }
        }
    }

    /// Drain gateway events in arrival order until the channel closes or
    /// `shutdown` is cancelled.
    ///
    /// On shutdown, events already queued are still dispatched so late
    /// confirmations reach history.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<GatewayEvent>,
        shutdown: CancellationToken,
    ) {
        tracing::info!(
            gateway = self.gateway.name(),
            "Order broker event loop started"
        );

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    let drained = self.drain_pending(&mut events);
                    tracing::info!(drained, "Order broker event loop shutting down");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        tracing::info!("Gateway event channel closed");
                        break;
                    };
                    tracing::trace!(kind = event.kind(), "Gateway event");
                    self.dispatch(event);
                }
            }
        }
    }

    /// Dispatch whatever the gateway had already queued.
    fn drain_pending(&self, events: &mut mpsc::Receiver<GatewayEvent>) -> usize {
        let mut drained = 0;
        while let Ok(event) = events.try_recv() {
            self.dispatch(event);
            drained += 1;
        }
        drained
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Receive every merged order report.
    #[must_use]
    pub fn subscribe_order_updates(&self) -> broadcast::Receiver<OrderStatusReport> {
        self.hub.order_updates_rx()
    }

    /// Receive deduplicated book snapshots.
    #[must_use]
    pub fn subscribe_market_data(&self) -> broadcast::Receiver<MarketBook> {
        self.hub.market_data_rx()
    }

    /// Receive gateway connectivity changes.
    #[must_use]
    pub fn subscribe_connectivity(&self) -> broadcast::Receiver<ConnectivityStatus> {
        self.hub.connectivity_rx()
    }

    // =========================================================================
    // Gateway passthrough
    // =========================================================================

    /// Maker fee rate.
    #[must_use]
    pub fn make_fee(&self) -> Decimal {
        self.gateway.make_fee()
    }

    /// Taker fee rate.
    #[must_use]
    pub fn take_fee(&self) -> Decimal {
        self.gateway.take_fee()
    }

    /// Gateway name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.gateway.name()
    }

    /// Venue identifier.
    #[must_use]
    pub fn exchange(&self) -> Exchange {
        self.gateway.exchange()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::ports::MockOrderGateway;
    use crate::domain::market::{MarketQuote, MarketSide};
    use crate::domain::order::{ExchangeOrderId, OrderStatus, Side, TimeInForce};
    use crate::infrastructure::broadcast::BroadcastHub;

    fn make_gateway() -> MockOrderGateway {
        let mut gateway = MockOrderGateway::new();
        gateway
            .expect_exchange()
            .return_const(Exchange::new("paper"));
        gateway.expect_name().return_const("mock".to_string());
        gateway
    }

    fn make_broker(gateway: MockOrderGateway) -> OrderBroker<MockOrderGateway> {
        OrderBroker::new(Arc::new(gateway), Arc::new(BroadcastHub::with_defaults()))
    }

    fn make_order() -> NewOrder {
        NewOrder::limit(Side::Bid, dec!(5), dec!(99.5), TimeInForce::Gtc)
    }

    fn make_book(bid: Decimal) -> MarketBook {
        let quote = MarketQuote::new(
            MarketSide::new(bid, dec!(1)),
            MarketSide::new(bid + dec!(1), dec!(1)),
        );
        MarketBook::new(quote, quote, DateTime::<Utc>::UNIX_EPOCH)
    }

    #[test]
    fn submit_records_new_report_and_sends_order() {
        let mut gateway = make_gateway();
        gateway
            .expect_send_order()
            .withf(|order: &BrokeredOrder| {
                order.quantity == dec!(5)
                    && order.price == Some(dec!(99.5))
                    && order.exchange.as_str() == "paper"
            })
            .times(1)
            .return_const(());
        let broker = make_broker(gateway);

        let id = broker.submit(&make_order());

        let history = broker.order_history(&id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OrderStatus::New);
        assert_eq!(history[0].order_id, id);
        assert!(broker.current_book().is_none());
    }

    #[test]
    fn submit_publishes_nothing() {
        let mut gateway = make_gateway();
        gateway.expect_send_order().return_const(());
        let broker = make_broker(gateway);
        let mut updates = broker.subscribe_order_updates();

        broker.submit(&make_order());

        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn cancel_unknown_order_fails_without_gateway_call() {
        let mut gateway = make_gateway();
        gateway.expect_cancel_order().never();
        gateway.expect_replace_order().never();
        let broker = make_broker(gateway);
        let missing = OrderIdentity::new("missing");

        let err = broker
            .cancel(&OrderCancel::new(missing.clone(), Exchange::new("paper")))
            .unwrap_err();
        assert_eq!(err, BrokerError::OrderNotFound(missing.clone()));

        let err = broker
            .replace(&CancelReplaceOrder::new(missing.clone(), dec!(1), None))
            .unwrap_err();
        assert_eq!(err, BrokerError::OrderNotFound(missing));
    }

    #[test]
    fn cancel_carries_side_and_exchange_id() {
        let mut gateway = make_gateway();
        gateway.expect_send_order().return_const(());
        gateway
            .expect_cancel_order()
            .withf(|cancel: &BrokeredCancel| {
                cancel.side == Side::Bid
                    && cancel.exchange_id == Some(ExchangeOrderId::new("x-1"))
            })
            .times(1)
            .return_const(());
        let broker = make_broker(gateway);
        let id = broker.submit(&make_order());
        broker.on_order_update(
            &GatewayOrderStatusReport::new(id.clone())
                .with_status(OrderStatus::Working)
                .with_exchange_id(ExchangeOrderId::new("x-1")),
        );

        let cancel_id = broker
            .cancel(&OrderCancel::new(id.clone(), Exchange::new("paper")))
            .unwrap();

        assert_ne!(cancel_id, id);
        assert_eq!(broker.order_history(&id).unwrap().len(), 2);
    }

    #[test]
    fn replace_keeps_original_attributes() {
        let mut gateway = make_gateway();
        gateway.expect_send_order().return_const(());
        gateway
            .expect_replace_order()
            .withf(|replace: &BrokeredReplace| {
                replace.side == Side::Bid
                    && replace.time_in_force == TimeInForce::Gtc
                    && replace.quantity == dec!(7)
                    && replace.price == Some(dec!(98))
                    && replace.exchange.as_str() == "paper"
                    && replace.exchange_id.is_none()
            })
            .times(1)
            .return_const(());
        let broker = make_broker(gateway);
        let id = broker.submit(&make_order());

        let replace_id = broker
            .replace(&CancelReplaceOrder::new(id.clone(), dec!(7), Some(dec!(98))))
            .unwrap();

        assert_ne!(replace_id, id);
        assert_eq!(broker.order_history(&id).unwrap().len(), 1);
    }

    #[test]
    fn unknown_update_is_dropped() {
        let broker = make_broker(make_gateway());
        let mut updates = broker.subscribe_order_updates();

        let outcome = broker.on_order_update(
            &GatewayOrderStatusReport::new(OrderIdentity::new("ghost"))
                .with_status(OrderStatus::Filled),
        );

        assert_eq!(outcome, UpdateOutcome::UnknownOrder);
        assert!(broker.all_order_states().is_empty());
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn permissive_mode_merges_post_terminal_update() {
        let mut gateway = make_gateway();
        gateway.expect_send_order().return_const(());
        let broker = make_broker(gateway);
        let id = broker.submit(&make_order());

        broker.on_order_update(
            &GatewayOrderStatusReport::new(id.clone()).with_status(OrderStatus::Cancelled),
        );
        let outcome = broker.on_order_update(
            &GatewayOrderStatusReport::new(id.clone()).with_status(OrderStatus::PartialFill),
        );

        assert!(matches!(
            outcome,
            UpdateOutcome::Merged(ref report) if report.status == OrderStatus::PartialFill
        ));
        assert_eq!(broker.order_history(&id).unwrap().len(), 3);
    }

    #[test]
    fn strict_mode_drops_illegal_transition() {
        let mut gateway = make_gateway();
        gateway.expect_send_order().return_const(());
        let broker = make_broker(gateway).with_strict_transitions(true);
        let id = broker.submit(&make_order());
        broker.on_order_update(
            &GatewayOrderStatusReport::new(id.clone()).with_status(OrderStatus::Cancelled),
        );
        let mut updates = broker.subscribe_order_updates();

        let outcome = broker.on_order_update(
            &GatewayOrderStatusReport::new(id.clone()).with_status(OrderStatus::PartialFill),
        );

        assert_eq!(
            outcome,
            UpdateOutcome::IllegalTransition(TransitionError {
                from: OrderStatus::Cancelled,
                to: OrderStatus::PartialFill,
            })
        );
        assert_eq!(broker.order_history(&id).unwrap().len(), 2);
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn strict_mode_allows_status_less_update() {
        let mut gateway = make_gateway();
        gateway.expect_send_order().return_const(());
        let broker = make_broker(gateway).with_strict_transitions(true);
        let id = broker.submit(&make_order());
        for status in [OrderStatus::Working, OrderStatus::Filled] {
            broker.on_order_update(&GatewayOrderStatusReport::new(id.clone()).with_status(status));
        }
        assert_eq!(broker.current_report(&id).unwrap().status, OrderStatus::Filled);

        let outcome = broker.on_order_update(
            &GatewayOrderStatusReport::new(id.clone())
                .with_exchange_id(ExchangeOrderId::new("late-ack")),
        );

        assert!(matches!(outcome, UpdateOutcome::Merged(_)));
    }

    #[test]
    fn duplicate_book_is_suppressed() {
        let broker = make_broker(make_gateway());
        let mut books = broker.subscribe_market_data();

        assert!(broker.on_market_data(make_book(dec!(100))));
        assert!(!broker.on_market_data(make_book(dec!(100))));
        assert!(broker.on_market_data(make_book(dec!(101))));

        assert_eq!(books.try_recv().unwrap().top.bid.price, dec!(100));
        assert_eq!(books.try_recv().unwrap().top.bid.price, dec!(101));
        assert!(books.try_recv().is_err());
        assert_eq!(broker.current_book().unwrap().top.bid.price, dec!(101));
    }

    #[test]
    fn events_without_subscribers_still_update_state() {
        let mut gateway = make_gateway();
        gateway.expect_send_order().return_const(());
        let broker = make_broker(gateway);
        let id = broker.submit(&make_order());

        let outcome = broker.on_order_update(
            &GatewayOrderStatusReport::new(id.clone()).with_status(OrderStatus::Working),
        );
        let accepted = broker.on_market_data(make_book(dec!(100)));
        broker.on_connectivity_change(ConnectivityStatus::Connected);

        assert!(matches!(outcome, UpdateOutcome::Merged(_)));
        assert_eq!(broker.order_history(&id).unwrap().len(), 2);
        assert!(accepted);
        assert_eq!(broker.current_book().unwrap().top.bid.price, dec!(100));
    }

    #[test]
    fn connectivity_is_republished() {
        let broker = make_broker(make_gateway());
        let mut connectivity = broker.subscribe_connectivity();

        broker.dispatch(GatewayEvent::Connectivity(ConnectivityStatus::Disconnected));

        assert_eq!(
            connectivity.try_recv().unwrap(),
            ConnectivityStatus::Disconnected
        );
    }

    #[test]
    fn fees_and_identity_are_forwarded() {
        let mut gateway = make_gateway();
        gateway.expect_make_fee().return_const(dec!(-0.0002));
        gateway.expect_take_fee().return_const(dec!(0.0007));
        let broker = make_broker(gateway);

        assert_eq!(broker.make_fee(), dec!(-0.0002));
        assert_eq!(broker.take_fee(), dec!(0.0007));
        assert_eq!(broker.name(), "mock");
        assert_eq!(broker.exchange().as_str(), "paper");
    }
}
