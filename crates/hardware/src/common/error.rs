//! Error definitions for the coherence simulator.
//!
//! This module defines every failure the engine can report. It provides:
//! 1. **Configuration faults:** Invalid geometry or timing, rejected before any state exists.
//! 2. **Trace faults:** Trace files that are missing or unreadable.
//! 3. **Address faults:** A set index outside the configured geometry; the access is refused.
//! 4. **Coherence violations:** A broken MESI invariant detected by the checker.
//! 5. **Simulation errors:** The umbrella type returned by `Simulator` operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::addr::{Address, CoreId};
use crate::core::units::cache::MesiState;

/// Invalid simulator configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The system must contain at least one core.
    #[error("core count must be at least 1")]
    NoCores,

    /// Each set must hold at least one line.
    #[error("associativity (E) must be at least 1")]
    ZeroAssociativity,

    /// The block cannot hold a single bus word.
    #[error("block offset bits (b = {offset_bits}) must be at least {min} so a block holds one {word_bytes}-byte bus word")]
    BlockTooSmall {
        /// Configured block-offset bits.
        offset_bits: u32,
        /// Smallest accepted value.
        min: u32,
        /// Bus word width in bytes.
        word_bytes: usize,
    },

    /// Index and offset fields do not fit in a 32-bit address.
    #[error("set index bits (s = {index_bits}) plus block offset bits (b = {offset_bits}) exceed 32 address bits")]
    AddressTooWide {
        /// Configured set-index bits.
        index_bits: u32,
        /// Configured block-offset bits.
        offset_bits: u32,
    },

    /// One private cache would hold more lines or bytes than the simulator allocates.
    #[error("cache of {lines} lines ({bytes} bytes) per core exceeds the limit of {max_lines} lines or {max_bytes} bytes")]
    CacheTooLarge {
        /// Lines per cache (`2^s * E`).
        lines: u64,
        /// Bytes per cache (`2^s * E * 2^b`).
        bytes: u64,
        /// Largest accepted line count.
        max_lines: u64,
        /// Largest accepted capacity in bytes.
        max_bytes: u64,
    },

    /// A cache geometry parameter was given neither on the command line nor in the file.
    #[error("cache geometry parameter {0} is required")]
    MissingGeometry(&'static str),

    /// The bus word width must be a nonzero power of two.
    #[error("bus word size must be a nonzero power of two (got {0})")]
    InvalidWordSize(usize),

    /// The JSON configuration could not be parsed.
    #[error("invalid configuration JSON: {0}")]
    Json(String),
}

/// Failure to open or read a trace file.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace file does not exist or cannot be opened.
    #[error("trace file {} does not exist or cannot be opened", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The trace file was opened but could not be read.
    #[error("failed to read trace file {}", path.display())]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// An address whose set index falls outside the configured geometry.
///
/// The access is refused without mutating any line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("core {core}: set index {index} out of range for {sets} sets (address {address})")]
pub struct AddressError {
    /// Core whose cache refused the access.
    pub core: CoreId,
    /// Faulting address.
    pub address: Address,
    /// Computed set index.
    pub index: usize,
    /// Number of sets in the cache.
    pub sets: usize,
}

/// A broken MESI invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoherenceViolation {
    /// An invalid line carries a non-Invalid state.
    #[error("core {core} set {index} way {way}: invalid line in state {state:?}")]
    InvalidLineState {
        /// Owning core.
        core: CoreId,
        /// Set index.
        index: usize,
        /// Way within the set.
        way: usize,
        /// Offending state.
        state: MesiState,
    },

    /// A dirty line is not Modified.
    #[error("core {core} set {index} way {way}: dirty line in state {state:?}")]
    DirtyNotModified {
        /// Owning core.
        core: CoreId,
        /// Set index.
        index: usize,
        /// Way within the set.
        way: usize,
        /// Offending state.
        state: MesiState,
    },

    /// A block held Exclusive or Modified has another valid copy somewhere.
    #[error("block tag {tag:#x} set {index}: core {owner} holds it {owner_state:?} while core {other} holds it {other_state:?}")]
    MultipleOwners {
        /// Tag of the block.
        tag: u32,
        /// Set index of the block.
        index: usize,
        /// Core holding the block Exclusive or Modified.
        owner: CoreId,
        /// State at the owner.
        owner_state: MesiState,
        /// Another core with a valid copy.
        other: CoreId,
        /// State at the other core.
        other_state: MesiState,
    },
}

/// Errors returned by simulator construction and execution.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration rejected by validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A trace file could not be loaded.
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// The number of traces does not match the number of cores.
    #[error("expected {expected} traces (one per core), got {got}")]
    TraceCount {
        /// Configured core count.
        expected: usize,
        /// Number of traces supplied.
        got: usize,
    },

    /// The coherence checker found a broken invariant.
    #[error("coherence violation at cycle {cycle}: {violation}")]
    Coherence {
        /// Global cycle at which the check failed.
        cycle: u64,
        /// The broken invariant.
        #[source]
        violation: CoherenceViolation,
    },

    /// The run exceeded the configured cycle limit.
    #[error("simulation exceeded the cycle limit of {0} cycles")]
    CycleLimit(u64),
}
