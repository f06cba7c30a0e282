//! Domain Layer - Order lifecycle and market state.
//!
//! Pure value types and rules with no I/O. The broker service in the
//! application layer owns the mutable state built from these types.

/// Market book snapshots and gateway connectivity.
pub mod market;

/// Order identities, reports, and the partial-update merge.
pub mod order;
