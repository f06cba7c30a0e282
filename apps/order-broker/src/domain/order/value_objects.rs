//! Order attribute value objects.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Buy order.
    Bid,
    /// Sell order.
    Ask,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "BID"),
            Self::Ask => write!(f, "ASK"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute at the specified price or better.
    Limit,
    /// Execute at the best available price.
    Market,
}

/// Time in force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Immediate-or-cancel (fill immediately, cancel remainder).
    Ioc,
    /// Fill-or-kill (all or nothing, immediate execution required).
    Fok,
    /// Good-til-canceled.
    Gtc,
}

/// Order status in the lifecycle.
///
/// `New` is the broker's own synthetic state between submission and the
/// first gateway report; every other state is reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Submitted by the broker, not yet acknowledged.
    New,
    /// Acknowledged and resting on the exchange.
    Working,
    /// Partially filled; some quantity remains open.
    PartialFill,
    /// Completely filled.
    Filled,
    /// Cancelled by request or by the exchange.
    Cancelled,
    /// Rejected by the exchange.
    Rejected,
    /// Done for the day without further detail.
    Complete,
}

impl OrderStatus {
    /// Returns true if no further transitions are legal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Complete
        )
    }

    /// Returns true if the order may still trade and can be cancelled.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::Working | Self::PartialFill)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Working => "WORKING",
            Self::PartialFill => "PARTIAL_FILL",
            Self::Filled => "FILLED",
            Self::Cancelled => "CANCELLED",
            Self::Rejected => "REJECTED",
            Self::Complete => "COMPLETE",
        };
        write!(f, "{s}")
    }
}
