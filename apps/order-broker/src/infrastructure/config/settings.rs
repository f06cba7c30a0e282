//! Broker Configuration Settings
//!
//! Configuration types for the order broker, loaded from environment variables.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::order::Exchange;

const ENV_PREFIX: &str = "ORDER_BROKER_";

/// Broadcast channel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSettings {
    /// Capacity of the order update broadcast channel.
    pub order_updates_capacity: usize,
    /// Capacity of the market data broadcast channel.
    pub market_data_capacity: usize,
    /// Capacity of the connectivity broadcast channel.
    pub connectivity_capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            order_updates_capacity: 1_024,
            market_data_capacity: 4_096,
            connectivity_capacity: 64,
        }
    }
}

/// Paper gateway settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Exchange identifier reported by the gateway.
    pub exchange: Exchange,
    /// Maker fee rate (negative is a rebate).
    pub make_fee: Decimal,
    /// Taker fee rate.
    pub take_fee: Decimal,
    /// Capacity of the inbound gateway event queue.
    pub queue_capacity: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            exchange: Exchange::new("paper"),
            make_fee: dec!(-0.0001),
            take_fee: dec!(0.0005),
            queue_capacity: 4_096,
        }
    }
}

/// Complete broker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Drop gateway updates that would make an illegal status transition.
    pub strict_transitions: bool,
    /// Install the Prometheus recorder at startup.
    pub metrics_enabled: bool,
    /// Gateway settings.
    pub gateway: GatewaySettings,
    /// Broadcast channel settings.
    pub broadcast: BroadcastSettings,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            strict_transitions: false,
            metrics_enabled: true,
            gateway: GatewaySettings::default(),
            broadcast: BroadcastSettings::default(),
        }
    }
}

impl BrokerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// Keys are the full variable names, e.g. `ORDER_BROKER_EXCHANGE`.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is present but cannot be parsed, or if the
    /// exchange identifier is empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let defaults = Self::default();

        let exchange = match env.raw("EXCHANGE") {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::EmptyValue(env.key("EXCHANGE")));
            }
            Some(value) => Exchange::new(value.trim()),
            None => defaults.gateway.exchange,
        };

        let gateway = GatewaySettings {
            exchange,
            make_fee: env.parse("MAKE_FEE", defaults.gateway.make_fee)?,
            take_fee: env.parse("TAKE_FEE", defaults.gateway.take_fee)?,
            queue_capacity: env.capacity(
                "GATEWAY_QUEUE_CAPACITY",
                defaults.gateway.queue_capacity,
            )?,
        };

        let broadcast = BroadcastSettings {
            order_updates_capacity: env.capacity(
                "ORDER_UPDATES_CAPACITY",
                defaults.broadcast.order_updates_capacity,
            )?,
            market_data_capacity: env.capacity(
                "MARKET_DATA_CAPACITY",
                defaults.broadcast.market_data_capacity,
            )?,
            connectivity_capacity: env.capacity(
                "CONNECTIVITY_CAPACITY",
                defaults.broadcast.connectivity_capacity,
            )?,
        };

        Ok(Self {
            strict_transitions: env.flag("STRICT_TRANSITIONS", defaults.strict_transitions)?,
            metrics_enabled: env.flag("METRICS_ENABLED", defaults.metrics_enabled)?,
            gateway,
            broadcast,
        })
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
        /// What was expected.
        reason: String,
    },
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn key(&self, name: &str) -> String {
        format!("{ENV_PREFIX}{name}")
    }

    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(&self.key(name))
    }

    fn parse<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.raw(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: self.key(name),
                    value,
                    reason: e.to_string(),
                }),
        }
    }

    fn capacity(&self, name: &str, default: usize) -> Result<usize, ConfigError> {
        let capacity = self.parse(name, default)?;
        if capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: self.key(name),
                value: capacity.to_string(),
                reason: "capacity must be greater than zero".to_string(),
            });
        }
        Ok(capacity)
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool, ConfigError> {
        match self.raw(name) {
            None => Ok(default),
            Some(value) => match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: self.key(name),
                    value,
                    reason: "expected a boolean".to_string(),
                }),
            },
        }
    }
}
