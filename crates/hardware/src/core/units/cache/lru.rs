//! Least Recently Used (LRU) replacement.
//!
//! Each cache owns a monotonic clock. Every hit and every install stamps the touched line
//! with the next clock value, so the smallest stamp in a set marks the least recently used
//! way. Snoops never stamp.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `tick()`: O(1)
//!   - `select_victim()`: O(W) where W is the number of ways (associativity)
//! - **Space Complexity:** one `u64` per line plus one per cache

use super::line::CacheLine;

/// Per-cache monotonic access clock.
#[derive(Clone, Debug, Default)]
pub struct LruClock {
    now: u64,
}

impl LruClock {
    /// Creates a clock starting at zero.
    pub const fn new() -> Self {
        Self { now: 0 }
    }

    /// Returns a fresh stamp, strictly larger than every earlier one.
    pub const fn tick(&mut self) -> u64 {
        self.now += 1;
        self.now
    }

    /// The most recently issued stamp.
    pub const fn now(&self) -> u64 {
        self.now
    }
}

/// Chooses the way to fill in `set`.
///
/// The first invalid way wins; otherwise the way with the smallest LRU stamp, with ties
/// going to the lower way.
///
/// # Arguments
///
/// * `set` - The lines of one set, in way order
///
/// # Returns
///
/// The victim way index (0 for an empty slice).
pub fn select_victim(set: &[CacheLine]) -> usize {
    if let Some(way) = set.iter().position(|line| !line.valid) {
        return way;
    }
    set.iter()
        .enumerate()
        .min_by_key(|(_, line)| line.lru_counter)
        .map_or(0, |(way, _)| way)
}
