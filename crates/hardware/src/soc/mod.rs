//! Shared-bus components.
//!
//! This module organizes what sits between the private caches: the snooping bus arbiter
//! and the transactions it carries.

/// Snooping bus arbiter: queueing, snoop broadcast, service timing.
pub mod interconnect;

/// Bus operations and transactions.
pub mod transaction;

pub use interconnect::BusArbiter;
pub use transaction::{BusOperation, BusTransaction};
