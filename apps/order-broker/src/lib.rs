#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Order Broker - Order state tracking and gateway event merging
//!
//! Sits between a trading strategy and one exchange gateway. Every order
//! submitted through the broker gets a local identity and an append-only
//! history of status reports; partial updates from the gateway are merged
//! onto the latest report and republished, together with deduplicated market
//! data and connectivity changes.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Order and market value types
//!   - `order`: identities, requests, status reports, merge, state machine
//!   - `market`: book snapshots and connectivity status
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: `OrderGateway` and the inbound `GatewayEvent`
//!   - `services`: the `OrderBroker`
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `broadcast`: channel-based fan-out to subscribers
//!   - `config`: environment configuration
//!   - `metrics`: Prometheus counters
//!   - `paper`: simulated gateway
//!   - `telemetry`: tracing and OpenTelemetry
//!
//! # Data Flow
//!
//! ```text
//! strategy --submit/cancel/replace--> OrderBroker --send--> gateway
//!                                          ^                   |
//!                                          +--- GatewayEvent --+ (mpsc)
//!                                          |
//!                                          +--> order updates / market data /
//!                                               connectivity (broadcast)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Order and market types with no I/O.
pub mod domain;

/// Application layer - Broker service and gateway port.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::market::{ConnectivityStatus, MarketBook, MarketQuote, MarketSide};
pub use domain::order::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, CancelReplaceOrder, Exchange,
    ExchangeOrderId, GatewayOrderStatusReport, IdentityGenerator, NewOrder, OrderCancel,
    OrderIdentity, OrderStateMachine, OrderStatus, OrderStatusReport, OrderType, Side,
    TimeInForce, TransitionError,
};

// Application
pub use application::ports::{GatewayEvent, OrderGateway};
pub use application::services::{BrokerError, OrderBroker, UpdateOutcome};

// Infrastructure config
pub use infrastructure::config::{BroadcastSettings, BrokerConfig, ConfigError, GatewaySettings};

// Broadcast hub
pub use infrastructure::broadcast::{
    BroadcastConfig, BroadcastHub, BroadcastStats, SharedBroadcastHub,
};

// Paper gateway
pub use infrastructure::paper::PaperGateway;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
