//! Configuration Module
//!
//! Environment-driven configuration for the broker, its paper gateway and
//! its broadcast channels.

mod settings;

pub use settings::{BroadcastSettings, BrokerConfig, ConfigError, GatewaySettings};
