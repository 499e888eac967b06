//! Common utilities and types used throughout the coherence simulator.
//!
//! This module provides the building blocks shared by the cache, bus, and simulator:
//! 1. **Addresses:** A strong address type and the tag/index decomposition for a geometry.
//! 2. **Error Handling:** Configuration, trace, address-decoding, and coherence errors.

/// Address type and tag/index decomposition.
pub mod addr;

/// Error types for configuration, trace loading, and simulation.
pub mod error;

pub use addr::{Address, AddressLayout, CoreId};
pub use error::{AddressError, CoherenceViolation, ConfigError, SimError, TraceError};
