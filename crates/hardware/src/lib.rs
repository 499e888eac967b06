//! MESI cache coherence simulator library.
//!
//! This crate implements a cycle-accurate model of private per-core caches kept coherent
//! by a MESI snooping protocol over a single shared bus:
//! 1. **Cache:** Set-associative tag/state arrays with LRU replacement and snoop handling.
//! 2. **Core:** Per-core trace runners that stall, hit, miss, or wait for the bus.
//! 3. **Interconnect:** The bus arbiter that broadcasts snoops, synthesizes responses,
//!    and accounts service time cycle by cycle.
//! 4. **Simulation:** Trace loading, the cycle-driven orchestrator, and coherence checks.
//! 5. **Statistics:** Per-core and system counters with text, CSV, and JSON reports.

/// Common types (address decomposition, error types).
pub mod common;
/// Simulator configuration (cache geometry, timing policy, run controls).
pub mod config;
/// Per-core state: the trace runner and its private cache.
pub mod core;
/// Trace loading, the cycle loop, and coherence invariant checks.
pub mod sim;
/// The shared snooping bus and its transactions.
pub mod soc;
/// Statistics counters and report rendering.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// A single core: instruction queue, stall counter, and private cache.
pub use crate::core::Core;
/// Top-level simulator; construct with `Simulator::new`.
pub use crate::sim::Simulator;
