//! Application Layer - Use cases and port definitions.
//!
//! Holds the order broker service and the gateway contract it drives.

/// Port interfaces for the exchange gateway.
pub mod ports;

/// Application services (the order broker).
pub mod services;
