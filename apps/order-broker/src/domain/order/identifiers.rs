//! Strongly-typed identifiers for orders and venues.
//!
//! Broker-local order identities are minted by [`IdentityGenerator`]; exchange
//! order ids and exchange names arrive from the gateway and are only wrapped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(
    OrderIdentity,
    "Broker-local identity of an order or order message."
);
define_id!(
    ExchangeOrderId,
    "Identifier assigned by the exchange once it acknowledges an order."
);
define_id!(Exchange, "Identifier of the venue a gateway connects to.");

/// Mints unique, sortable [`OrderIdentity`] values.
///
/// Identities are `{epoch}-{sequence}` in fixed-width lowercase hex, where
/// `epoch` is the generator's creation time in milliseconds and `sequence` is
/// a per-generator counter. Two generators started in the same millisecond
/// would collide, so a broker owns exactly one.
#[derive(Debug)]
pub struct IdentityGenerator {
    epoch_ms: u64,
    sequence: AtomicU64,
}

impl IdentityGenerator {
    /// Create a generator anchored at the current wall-clock time.
    #[must_use]
    pub fn new() -> Self {
        let epoch_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        Self::with_epoch(epoch_ms)
    }

    /// Create a generator with an explicit epoch.
    #[must_use]
    pub const fn with_epoch(epoch_ms: u64) -> Self {
        Self {
            epoch_ms,
            sequence: AtomicU64::new(0),
        }
    }

    /// Mint the next identity.
    pub fn next_identity(&self) -> OrderIdentity {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        OrderIdentity(format!("{:012x}-{sequence:012x}", self.epoch_ms))
    }

    /// Number of identities minted so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}
