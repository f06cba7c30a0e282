//! Order Broker Binary
//!
//! Runs the broker against the paper gateway and logs every republished event.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-broker
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_BROKER_EXCHANGE`: Exchange identifier (default: paper)
//! - `ORDER_BROKER_STRICT_TRANSITIONS`: Drop illegal status transitions (default: false)
//! - `ORDER_BROKER_MAKE_FEE` / `ORDER_BROKER_TAKE_FEE`: Paper fees (default: -0.0001 / 0.0005)
//! - `ORDER_BROKER_GATEWAY_QUEUE_CAPACITY`: Inbound event queue size (default: 4096)
//! - `ORDER_BROKER_ORDER_UPDATES_CAPACITY`: Order update channel size (default: 1024)
//! - `ORDER_BROKER_MARKET_DATA_CAPACITY`: Market data channel size (default: 4096)
//! - `ORDER_BROKER_CONNECTIVITY_CAPACITY`: Connectivity channel size (default: 64)
//! - `ORDER_BROKER_METRICS_ENABLED`: Install the Prometheus recorder (default: true)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: order-broker)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use order_broker::infrastructure::broadcast::{BroadcastConfig, BroadcastHub};
use order_broker::infrastructure::telemetry;
use order_broker::{
    BrokerConfig, ConnectivityStatus, GatewayEvent, OrderBroker, PaperGateway, init_metrics,
};
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting order broker");

    let config = BrokerConfig::from_env()?;
    log_config(&config);

    let metrics_handle = config.metrics_enabled.then(init_metrics);

    let shutdown_token = CancellationToken::new();

    let broadcast_hub = Arc::new(BroadcastHub::new(BroadcastConfig::from(config.broadcast)));

    let (gateway_tx, gateway_rx) = mpsc::channel::<GatewayEvent>(config.gateway.queue_capacity);
    let gateway = Arc::new(PaperGateway::new(config.gateway.clone(), gateway_tx));

    let broker = Arc::new(
        OrderBroker::new(Arc::clone(&gateway), Arc::clone(&broadcast_hub))
            .with_strict_transitions(config.strict_transitions),
    );

    // Subscribe before the event loop starts so nothing is missed
    spawn_logger(
        "order_update",
        broker.subscribe_order_updates(),
        shutdown_token.clone(),
        |report| {
            tracing::info!(
                order_id = %report.order_id,
                status = %report.status,
                leaves_quantity = %report.leaves_quantity,
                cum_quantity = %report.cum_quantity,
                average_price = ?report.average_price,
                "Order update"
            );
        },
    );
    spawn_logger(
        "market_data",
        broker.subscribe_market_data(),
        shutdown_token.clone(),
        |book| {
            tracing::debug!(
                bid = %book.top.bid.price,
                ask = %book.top.ask.price,
                "Market data"
            );
        },
    );
    spawn_logger(
        "connectivity",
        broker.subscribe_connectivity(),
        shutdown_token.clone(),
        |status| tracing::info!(status = %status, "Connectivity"),
    );

    let event_loop = {
        let broker = Arc::clone(&broker);
        let shutdown = shutdown_token.clone();
        tokio::spawn(async move { broker.run(gateway_rx, shutdown).await })
    };

    gateway.set_connectivity(ConnectivityStatus::Connected);

    let subscribers = broadcast_hub.stats();
    tracing::info!(
        name = broker.name(),
        exchange = %broker.exchange(),
        make_fee = %broker.make_fee(),
        take_fee = %broker.take_fee(),
        subscribers = subscribers.total_receivers(),
        "Order broker ready"
    );

    await_shutdown().await;

    let cancelled = broker.cancel_all_open_orders();
    shutdown_token.cancel();
    if let Err(e) = event_loop.await {
        tracing::error!(error = %e, "Broker event loop failed");
    }

    if let Some(handle) = metrics_handle {
        tracing::debug!(metrics = %handle.render(), "Final metrics");
    }

    tracing::info!(
        cancelled,
        reports = broker.all_order_states().len(),
        "Order broker stopped"
    );
    Ok(())
}

/// Log every message from a broker stream until shutdown.
fn spawn_logger<T, F>(
    stream: &'static str,
    mut rx: broadcast::Receiver<T>,
    shutdown: CancellationToken,
    log: F,
) where
    T: Clone + Send + 'static,
    F: Fn(&T) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(message) => log(&message),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(stream, skipped, "Subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                () = shutdown.cancelled() => break,
            }
        }
    });
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &BrokerConfig) {
    tracing::info!(
        exchange = %config.gateway.exchange,
        strict_transitions = config.strict_transitions,
        metrics_enabled = config.metrics_enabled,
        queue_capacity = config.gateway.queue_capacity,
        "Configuration loaded"
    );
    tracing::debug!(
        order_updates_capacity = config.broadcast.order_updates_capacity,
        market_data_capacity = config.broadcast.market_data_capacity,
        connectivity_capacity = config.broadcast.connectivity_capacity,
        "Broadcast capacities"
    );
}

/// Walk up from the working directory looking for a .env file.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
