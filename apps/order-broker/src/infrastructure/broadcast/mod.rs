//! Broadcast Channel Adapters
//!
//! Fan-out of the broker's outbound streams using tokio broadcast channels.
//!
//! # Architecture
//!
//! The `BroadcastHub` provides one channel per stream:
//! - Merged order status reports
//! - Deduplicated market book snapshots
//! - Gateway connectivity changes
//!
//! Each channel supports any number of receivers. A receiver that falls
//! behind sees `RecvError::Lagged` on its own handle; other receivers and
//! the sender are unaffected.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::market::{ConnectivityStatus, MarketBook};
use crate::domain::order::OrderStatusReport;
use crate::infrastructure::config::BroadcastSettings;

// =============================================================================
// Broadcast Hub
// =============================================================================

/// Configuration for broadcast channel capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastConfig {
    /// Capacity for the order update channel.
    pub order_updates_capacity: usize,
    /// Capacity for the market data channel.
    pub market_data_capacity: usize,
    /// Capacity for the connectivity channel.
    pub connectivity_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            order_updates_capacity: 1_024,
            market_data_capacity: 4_096,
            connectivity_capacity: 64,
        }
    }
}

impl From<BroadcastSettings> for BroadcastConfig {
    fn from(settings: BroadcastSettings) -> Self {
        Self {
            order_updates_capacity: settings.order_updates_capacity,
            market_data_capacity: settings.market_data_capacity,
            connectivity_capacity: settings.connectivity_capacity,
        }
    }
}

/// Central hub for the broker's outbound channels.
///
/// # Example
///
/// ```rust
/// use order_broker::infrastructure::broadcast::{BroadcastConfig, BroadcastHub};
///
/// let hub = BroadcastHub::new(BroadcastConfig::default());
///
/// // Subscribe before publishing; receivers only see later messages.
/// let _rx = hub.order_updates_rx();
/// assert_eq!(hub.order_updates_receiver_count(), 1);
/// ```
#[derive(Debug)]
#[allow(clippy::struct_field_names)]
pub struct BroadcastHub {
    order_updates_tx: broadcast::Sender<OrderStatusReport>,
    market_data_tx: broadcast::Sender<MarketBook>,
    connectivity_tx: broadcast::Sender<ConnectivityStatus>,
}

impl BroadcastHub {
    /// Create a new broadcast hub with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if any capacity is zero.
    #[must_use]
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            order_updates_tx: broadcast::channel(config.order_updates_capacity).0,
            market_data_tx: broadcast::channel(config.market_data_capacity).0,
            connectivity_tx: broadcast::channel(config.connectivity_capacity).0,
        }
    }

    /// Create a new broadcast hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BroadcastConfig::default())
    }

    // =========================================================================
    // Order Updates Channel
    // =========================================================================

    /// Send a merged order report to all subscribers.
    ///
    /// Returns the number of receivers that received the message, or `None`
    /// if there are no active receivers.
    #[must_use]
    pub fn send_order_update(&self, report: OrderStatusReport) -> Option<usize> {
        self.order_updates_tx.send(report).ok()
    }

    /// Get a new receiver for order updates.
    #[must_use]
    pub fn order_updates_rx(&self) -> broadcast::Receiver<OrderStatusReport> {
        self.order_updates_tx.subscribe()
    }

    /// Get the number of active order update receivers.
    #[must_use]
    pub fn order_updates_receiver_count(&self) -> usize {
        self.order_updates_tx.receiver_count()
    }

    // =========================================================================
    // Market Data Channel
    // =========================================================================

    /// Send a book snapshot to all subscribers.
    #[must_use]
    pub fn send_market_data(&self, book: MarketBook) -> Option<usize> {
        self.market_data_tx.send(book).ok()
    }

    /// Get a new receiver for market data.
    #[must_use]
    pub fn market_data_rx(&self) -> broadcast::Receiver<MarketBook> {
        self.market_data_tx.subscribe()
    }

    /// Get the number of active market data receivers.
    #[must_use]
    pub fn market_data_receiver_count(&self) -> usize {
        self.market_data_tx.receiver_count()
    }

    // =========================================================================
    // Connectivity Channel
    // =========================================================================

    /// Send a connectivity change to all subscribers.
    #[must_use]
    pub fn send_connectivity(&self, status: ConnectivityStatus) -> Option<usize> {
        self.connectivity_tx.send(status).ok()
    }

    /// Get a new receiver for connectivity changes.
    #[must_use]
    pub fn connectivity_rx(&self) -> broadcast::Receiver<ConnectivityStatus> {
        self.connectivity_tx.subscribe()
    }

    /// Get the number of active connectivity receivers.
    #[must_use]
    pub fn connectivity_receiver_count(&self) -> usize {
        self.connectivity_tx.receiver_count()
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get statistics about all channels.
    #[must_use]
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            order_updates_receivers: self.order_updates_receiver_count(),
            market_data_receivers: self.market_data_receiver_count(),
            connectivity_receivers: self.connectivity_receiver_count(),
        }
    }
}

/// Shared broadcast hub reference.
pub type SharedBroadcastHub = Arc<BroadcastHub>;

/// Statistics about broadcast channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Number of order update receivers.
    pub order_updates_receivers: usize,
    /// Number of market data receivers.
    pub market_data_receivers: usize,
    /// Number of connectivity receivers.
    pub connectivity_receivers: usize,
}

impl BroadcastStats {
    /// Get total number of receivers across all channels.
    #[must_use]
    pub const fn total_receivers(&self) -> usize {
        self.order_updates_receivers + self.market_data_receivers + self.connectivity_receivers
    }
}

// =============================================================================
// Tests
// =============================================================================
