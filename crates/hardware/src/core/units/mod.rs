//! Functional units owned by a core.
//!
//! The only unit modeled is the private data cache; execution itself is abstracted to a
//! trace of loads and stores.

/// Private set-associative cache with MESI state and LRU replacement.
pub mod cache;
