//! Simulation driver, trace loading, and coherence checking.
//!
//! Provides the cycle loop that ties cores to the bus, the loader that turns trace files
//! into per-core instruction sequences, and the MESI invariant checker.

/// MESI invariant checks across all caches.
pub mod coherence;

/// Trace file parsing and loading.
pub mod loader;

/// The cycle-driven simulator.
pub mod simulator;

pub use coherence::check_coherence;
pub use loader::{Trace, load_trace, load_trace_set, parse_trace, trace_paths};
pub use simulator::Simulator;
