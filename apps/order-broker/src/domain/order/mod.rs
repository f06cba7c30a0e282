//! Order lifecycle domain.
//!
//! Identities, order attributes, status reports, and the merge that turns a
//! partial gateway update into the next canonical report.

mod identifiers;
mod report;
mod requests;
mod state_machine;
mod value_objects;

pub use identifiers::{Exchange, ExchangeOrderId, IdentityGenerator, OrderIdentity};
pub use report::{GatewayOrderStatusReport, OrderStatusReport};
pub use requests::{
    BrokeredCancel, BrokeredOrder, BrokeredReplace, CancelReplaceOrder, NewOrder, OrderCancel,
};
pub use state_machine::{OrderStateMachine, TransitionError};
pub use value_objects::{OrderStatus, OrderType, Side, TimeInForce};
