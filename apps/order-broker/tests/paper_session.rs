//! Paper Session Integration Tests
//!
//! Runs the broker event loop against the paper gateway and observes the
//! republished streams the way a strategy would.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use order_broker::{
    BroadcastHub, ConnectivityStatus, GatewayEvent, GatewaySettings, MarketBook, MarketQuote,
    MarketSide, NewOrder, OrderBroker, OrderCancel, OrderStatus, OrderStatusReport, PaperGateway,
    Side, TimeInForce,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct Session {
    gateway: Arc<PaperGateway>,
    broker: Arc<OrderBroker<PaperGateway>>,
    shutdown: CancellationToken,
    event_loop: JoinHandle<()>,
}

fn start_session() -> Session {
    let (tx, rx) = mpsc::channel::<GatewayEvent>(256);
    let gateway = Arc::new(PaperGateway::new(GatewaySettings::default(), tx));
    let broker = Arc::new(OrderBroker::new(
        Arc::clone(&gateway),
        Arc::new(BroadcastHub::with_defaults()),
    ));
    let shutdown = CancellationToken::new();

    let event_loop = {
        let broker = Arc::clone(&broker);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { broker.run(rx, shutdown).await })
    };

    Session {
        gateway,
        broker,
        shutdown,
        event_loop,
    }
}

async fn next<T: Clone>(rx: &mut broadcast::Receiver<T>) -> T {
    timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for broker event")
        .expect("broker channel closed")
}

async fn next_report(rx: &mut broadcast::Receiver<OrderStatusReport>) -> OrderStatusReport {
    next(rx).await
}

fn book(bid: Decimal, ask: Decimal) -> MarketBook {
    MarketBook::new(
        MarketQuote::new(MarketSide::new(bid, dec!(2)), MarketSide::new(ask, dec!(3))),
        MarketQuote::new(
            MarketSide::new(bid - dec!(0.5), dec!(5)),
            MarketSide::new(ask + dec!(0.5), dec!(5)),
        ),
        Utc::now(),
    )
}

#[tokio::test]
async fn order_is_acknowledged_filled_and_republished() {
    let session = start_session();
    let mut updates = session.broker.subscribe_order_updates();

    let id = session
        .broker
        .submit(&NewOrder::limit(Side::Ask, dec!(4), dec!(20), TimeInForce::Gtc));

    let ack = next_report(&mut updates).await;
    assert_eq!(ack.order_id, id);
    assert_eq!(ack.status, OrderStatus::Working);
    assert!(ack.exchange_id.is_some());

    assert!(session.gateway.fill(&id, dec!(1), dec!(20)));
    let partial = next_report(&mut updates).await;
    assert_eq!(partial.status, OrderStatus::PartialFill);
    assert_eq!(partial.leaves_quantity, dec!(3));
    assert_eq!(partial.exchange_id, ack.exchange_id);

    assert!(session.gateway.fill(&id, dec!(3), dec!(22)));
    let filled = next_report(&mut updates).await;
    assert_eq!(filled.status, OrderStatus::Filled);
    assert_eq!(filled.cum_quantity, dec!(4));
    assert_eq!(filled.average_price, Some(dec!(21.5)));
    assert_eq!(filled.side, Side::Ask);

    let history = session.broker.order_history(&id).unwrap();
    let statuses: Vec<_> = history.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            OrderStatus::New,
            OrderStatus::Working,
            OrderStatus::PartialFill,
            OrderStatus::Filled,
        ]
    );
    assert!(session.broker.open_orders().is_empty());

    session.shutdown.cancel();
    session.event_loop.await.unwrap();
}

#[tokio::test]
async fn cancel_is_confirmed_through_update_stream() {
    let session = start_session();
    let mut updates = session.broker.subscribe_order_updates();

    let id = session
        .broker
        .submit(&NewOrder::market(Side::Bid, dec!(2), TimeInForce::Ioc));
    let _ack = next_report(&mut updates).await;

    tokio_test::assert_ok!(
        session
            .broker
            .cancel(&OrderCancel::new(id.clone(), session.broker.exchange()))
    );

    let confirm = next_report(&mut updates).await;
    assert_eq!(confirm.order_id, id);
    assert_eq!(confirm.status, OrderStatus::Cancelled);
    assert_eq!(confirm.leaves_quantity, Decimal::ZERO);
    assert_eq!(session.gateway.open_order_count(), 0);

    session.shutdown.cancel();
    session.event_loop.await.unwrap();
}

#[tokio::test]
async fn repeated_book_is_published_once() {
    let session = start_session();
    let mut books = session.broker.subscribe_market_data();
    let first = book(dec!(100), dec!(101));

    session.gateway.publish_book(first.clone());
    session.gateway.publish_book(book(dec!(100), dec!(101)));
    session.gateway.publish_book(book(dec!(100.5), dec!(101)));

    let received = next(&mut books).await;
    assert!(received.same_levels(&first));
    let changed = next(&mut books).await;
    assert_eq!(changed.top.bid.price, dec!(100.5));
    assert!(books.try_recv().is_err());

    assert_eq!(
        session.broker.current_book().unwrap().top.bid.price,
        dec!(100.5)
    );

    session.shutdown.cancel();
    session.event_loop.await.unwrap();
}

#[tokio::test]
async fn connectivity_passes_through_to_every_subscriber() {
    let session = start_session();
    let mut first = session.broker.subscribe_connectivity();
    let mut second = session.broker.subscribe_connectivity();

    session.gateway.set_connectivity(ConnectivityStatus::Connected);
    session
        .gateway
        .set_connectivity(ConnectivityStatus::Disconnected);

    assert_eq!(next(&mut first).await, ConnectivityStatus::Connected);
    assert_eq!(next(&mut first).await, ConnectivityStatus::Disconnected);
    assert_eq!(next(&mut second).await, ConnectivityStatus::Connected);
    assert_eq!(next(&mut second).await, ConnectivityStatus::Disconnected);

    session.shutdown.cancel();
    session.event_loop.await.unwrap();
}

#[tokio::test]
async fn dropped_subscriber_does_not_block_others() {
    let session = start_session();
    let dropped = session.broker.subscribe_order_updates();
    let mut kept = session.broker.subscribe_order_updates();
    drop(dropped);

    let id = session
        .broker
        .submit(&NewOrder::limit(Side::Bid, dec!(1), dec!(9), TimeInForce::Gtc));

    assert_eq!(next_report(&mut kept).await.order_id, id);

    session.shutdown.cancel();
    session.event_loop.await.unwrap();
}

#[tokio::test]
async fn event_loop_stops_when_gateway_channel_closes() {
    // The paper gateway keeps its own sender, so feed the loop from a
    // separate channel that can be closed.
    let (paper_tx, _paper_rx) = mpsc::channel::<GatewayEvent>(8);
    let gateway = Arc::new(PaperGateway::new(GatewaySettings::default(), paper_tx));
    let broker = OrderBroker::new(gateway, Arc::new(BroadcastHub::with_defaults()));
    let mut connectivity = broker.subscribe_connectivity();

    let (tx, rx) = mpsc::channel::<GatewayEvent>(8);
    tx.send(GatewayEvent::Connectivity(ConnectivityStatus::Connected))
        .await
        .unwrap();
    drop(tx);

    timeout(RECV_TIMEOUT, broker.run(rx, CancellationToken::new()))
        .await
        .expect("event loop must stop once the channel is closed");

    assert_eq!(
        connectivity.try_recv().unwrap(),
        ConnectivityStatus::Connected
    );
}

#[tokio::test]
async fn shutdown_cancels_open_orders_on_paper_gateway() {
    let session = start_session();
    let mut updates = session.broker.subscribe_order_updates();

    for _ in 0..3 {
        session
            .broker
            .submit(&NewOrder::limit(Side::Bid, dec!(1), dec!(5), TimeInForce::Gtc));
        let _ack = next_report(&mut updates).await;
    }

    assert_eq!(session.broker.cancel_all_open_orders(), 3);
    for _ in 0..3 {
        assert_eq!(next_report(&mut updates).await.status, OrderStatus::Cancelled);
    }
    assert!(session.broker.open_orders().is_empty());
    assert_eq!(session.broker.cancel_all_open_orders(), 0);

    session.shutdown.cancel();
    session.event_loop.await.unwrap();
}

#[tokio::test]
async fn shutdown_merges_confirmations_already_queued() {
    let session = start_session();
    let mut updates = session.broker.subscribe_order_updates();

    for _ in 0..3 {
        session
            .broker
            .submit(&NewOrder::limit(Side::Ask, dec!(2), dec!(7), TimeInForce::Gtc));
        let _ack = next_report(&mut updates).await;
    }

    // Same sequence as the binary: cancel, then stop the loop immediately.
    let cancelled = session.broker.cancel_all_open_orders();
    session.shutdown.cancel();
    session.event_loop.await.unwrap();

    assert_eq!(cancelled, 3);
    assert!(session.broker.open_orders().is_empty());
    let cancelled_reports = session
        .broker
        .all_order_states()
        .into_iter()
        .filter(|r| r.status == OrderStatus::Cancelled)
        .count();
    assert_eq!(cancelled_reports, 3);
}
