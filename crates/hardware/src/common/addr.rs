//! Addresses and their set-associative decomposition.
//!
//! This module defines the strong address type used by traces, caches, and bus transactions,
//! and the fixed tag/index split for a cache geometry:
//! 1. **Type Safety:** Trace addresses are wrapped so they cannot be confused with tags or indices.
//! 2. **Decomposition:** `tag = addr >> (s + b)`, `index = (addr >> b) & (2^s - 1)`.
//!    The block offset is ignored; the simulation is block-granular.

use std::fmt;

/// Index of a core (and of its private cache) within the system.
pub type CoreId = usize;

/// A 32-bit byte address as read from a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub u32);

impl Address {
    /// Creates a new address from a raw 32-bit value.
    #[inline(always)]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Returns the raw 32-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u32 {
        self.0
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Fixed address split for one cache geometry.
///
/// Built once per run from the set-index and block-offset bit counts. Every cache in the
/// system shares the same layout, so a tag/index pair names the same block everywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressLayout {
    index_bits: u32,
    offset_bits: u32,
}

impl AddressLayout {
    /// Creates a layout with `index_bits` set-index bits and `offset_bits` block-offset bits.
    ///
    /// The caller guarantees `index_bits + offset_bits <= 32`; `Config::validate` enforces it.
    pub const fn new(index_bits: u32, offset_bits: u32) -> Self {
        Self {
            index_bits,
            offset_bits,
        }
    }

    /// Number of set-index bits (`s`).
    pub const fn index_bits(&self) -> u32 {
        self.index_bits
    }

    /// Number of block-offset bits (`b`).
    pub const fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    /// Number of sets addressed by this layout (`2^s`).
    pub const fn num_sets(&self) -> usize {
        1usize << self.index_bits
    }

    /// Block size in bytes (`2^b`).
    pub const fn block_bytes(&self) -> usize {
        1usize << self.offset_bits
    }

    /// Extracts the tag: every bit above the index and offset fields.
    pub fn tag(&self, addr: Address) -> u32 {
        addr.0
            .checked_shr(self.index_bits + self.offset_bits)
            .unwrap_or(0)
    }

    /// Extracts the set index.
    pub fn index(&self, addr: Address) -> usize {
        let mask = (1u64 << self.index_bits) - 1;
        let shifted = u64::from(addr.0) >> self.offset_bits;
        (shifted & mask) as usize
    }

    /// Returns `(tag, index)` for an address.
    pub fn split(&self, addr: Address) -> (u32, usize) {
        (self.tag(addr), self.index(addr))
    }
}
