//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations behind the application layer's ports, plus the
//! ambient concerns every binary needs.

/// Broadcast channel adapters for event fan-out.
pub mod broadcast;

/// Environment-driven configuration.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// In-process paper trading gateway.
pub mod paper;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
