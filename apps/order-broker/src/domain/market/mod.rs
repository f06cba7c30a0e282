//! Market book snapshots and gateway connectivity.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price and size at one side of one book level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSide {
    /// Price.
    pub price: Decimal,
    /// Size available at that price.
    pub size: Decimal,
}

impl MarketSide {
    /// Create a side.
    #[must_use]
    pub const fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Bid and ask at one book level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Best bid at this level.
    pub bid: MarketSide,
    /// Best ask at this level.
    pub ask: MarketSide,
}

impl MarketQuote {
    /// Create a quote.
    #[must_use]
    pub const fn new(bid: MarketSide, ask: MarketSide) -> Self {
        Self { bid, ask }
    }
}

/// Top-of-book and second-level snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketBook {
    /// Best level.
    pub top: MarketQuote,
    /// Next-best level.
    pub second: MarketQuote,
    /// When the gateway produced the snapshot.
    pub time: DateTime<Utc>,
}

impl MarketBook {
    /// Create a book.
    #[must_use]
    pub const fn new(top: MarketQuote, second: MarketQuote, time: DateTime<Utc>) -> Self {
        Self { top, second, time }
    }

    /// True when both levels match `other`.
    ///
    /// The snapshot time is ignored: a re-sent book with identical levels is
    /// the same market.
    #[must_use]
    pub fn same_levels(&self, other: &Self) -> bool {
        self.top == other.top && self.second == other.second
    }
}

/// Gateway session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectivityStatus {
    /// Session established.
    Connected,
    /// Session lost or not yet established.
    Disconnected,
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}
