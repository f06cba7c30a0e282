//! Port Interfaces
//!
//! Contracts between the broker and the exchange gateway.
//!
//! ## Driven Ports (Outbound)
//!
//! - `OrderGateway`: sends new, replace and cancel messages to a venue
//!
//! ## Driver Ports (Inbound)
//!
//! - `GatewayEvent`: market data, connectivity and partial order updates
//!   pushed by the gateway onto the broker's event queue

mod gateway_port;

#[cfg(test)]
pub use gateway_port::MockOrderGateway;
pub use gateway_port::{GatewayEvent, OrderGateway};
