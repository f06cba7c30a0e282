//! Prometheus Metrics Module
//!
//! Counters for order flow, update merging and market-data deduplication.
//!
//! # Metrics Categories
//!
//! - **Orders**: submits, cancels and replaces sent to the gateway
//! - **Updates**: gateway order updates merged, dropped or rejected
//! - **Market data**: books published and books suppressed as duplicates
//! - **Connectivity**: gateway session changes
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::market::ConnectivityStatus;
use crate::domain::order::OrderStatus;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder is already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Outbound requests
    describe_counter!(
        "order_broker_orders_submitted_total",
        "Total new orders sent to the gateway"
    );
    describe_counter!(
        "order_broker_cancels_sent_total",
        "Total cancels sent to the gateway"
    );
    describe_counter!(
        "order_broker_replaces_sent_total",
        "Total cancel-replaces sent to the gateway"
    );

    // Inbound order updates
    describe_counter!(
        "order_broker_updates_merged_total",
        "Gateway order updates merged into history, by resulting status"
    );
    describe_counter!(
        "order_broker_updates_dropped_total",
        "Gateway order updates dropped because the identity is unknown"
    );
    describe_counter!(
        "order_broker_updates_rejected_total",
        "Gateway order updates rejected as illegal transitions"
    );

    // Market data
    describe_counter!(
        "order_broker_market_data_published_total",
        "Book snapshots republished to subscribers"
    );
    describe_counter!(
        "order_broker_market_data_deduplicated_total",
        "Book snapshots suppressed because levels were unchanged"
    );

    // Connectivity
    describe_counter!(
        "order_broker_connectivity_changes_total",
        "Gateway connectivity changes, by status"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a new order sent to the gateway.
pub fn record_order_submitted() {
    counter!("order_broker_orders_submitted_total").increment(1);
}

/// Record a cancel sent to the gateway.
pub fn record_cancel_sent() {
    counter!("order_broker_cancels_sent_total").increment(1);
}

/// Record a cancel-replace sent to the gateway.
pub fn record_replace_sent() {
    counter!("order_broker_replaces_sent_total").increment(1);
}

/// Record a merged order update.
pub fn record_update_merged(status: OrderStatus) {
    counter!(
        "order_broker_updates_merged_total",
        "status" => status_label(status)
    )
    .increment(1);
}

/// Record an update dropped for an unknown identity.
pub fn record_update_dropped() {
    counter!("order_broker_updates_dropped_total").increment(1);
}

/// Record an update rejected as an illegal transition.
pub fn record_update_rejected(from: OrderStatus, to: OrderStatus) {
    counter!(
        "order_broker_updates_rejected_total",
        "from" => status_label(from),
        "to" => status_label(to)
    )
    .increment(1);
}

/// Record a book republished to subscribers.
pub fn record_market_data_published() {
    counter!("order_broker_market_data_published_total").increment(1);
}

/// Record a book suppressed as a duplicate.
pub fn record_market_data_deduplicated() {
    counter!("order_broker_market_data_deduplicated_total").increment(1);
}

/// Record a connectivity change.
pub fn record_connectivity_change(status: ConnectivityStatus) {
    let label = match status {
        ConnectivityStatus::Connected => "connected",
        ConnectivityStatus::Disconnected => "disconnected",
    };
    counter!(
        "order_broker_connectivity_changes_total",
        "status" => label
    )
    .increment(1);
}

const fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::New => "new",
        OrderStatus::Working => "working",
        OrderStatus::PartialFill => "partial_fill",
        OrderStatus::Filled => "filled",
        OrderStatus::Cancelled => "cancelled",
        OrderStatus::Rejected => "rejected",
        OrderStatus::Complete => "complete",
    }
}

// =============================================================================
// Tests
// =============================================================================
