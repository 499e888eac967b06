//! Private set-associative cache with MESI state.
//!
//! This module implements the per-core tag/state array. It provides:
//! 1. **Local access:** Hit, miss, or Shared-write upgrade, decided before any mutation.
//! 2. **Snooping:** Responses to other cores' bus transactions per the MESI rules.
//! 3. **Installation:** LRU victim selection with eviction and write-back accounting.
//!
//! Lines live in one flat array indexed by `set * ways + way`.

/// Cache line storage and the MESI state enum.
pub mod line;

/// LRU clock and victim selection.
pub mod lru;

pub use self::line::{CacheLine, MesiState};

use self::lru::LruClock;
use crate::common::{Address, AddressError, AddressLayout, CoreId};
use crate::config::{CacheConfig, TimingConfig};
use crate::soc::transaction::{BusOperation, BusTransaction};
use crate::stats::CoreStats;

/// Outcome of a local access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    /// The access completed in the cache.
    Hit,
    /// Write hit on a Shared line with the bus free. The line is already Modified;
    /// the carried `Invalidate` must be broadcast this cycle.
    Upgrade(BusTransaction),
    /// Write hit on a Shared line while the bus is busy. Nothing changed; retry later.
    Blocked,
    /// The block is absent; the carried `BusRead` or `BusReadX` must go on the bus.
    Miss(BusTransaction),
}

/// A cache's answer to a snooped transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnoopResponse {
    /// No copy, or nothing to contribute.
    None,
    /// Clean copy supplied cache-to-cache.
    Supply(Vec<u8>),
    /// Dirty copy written back (and, for a read, forwarded to the requester).
    Flush(Vec<u8>),
}

/// One core's private cache.
#[derive(Debug)]
pub struct Cache {
    core: CoreId,
    layout: AddressLayout,
    ways: usize,
    lines: Vec<CacheLine>,
    lru: LruClock,
    writeback_latency: u64,
    stats: CoreStats,
}

impl Cache {
    /// Creates an empty cache for `core`.
    ///
    /// # Arguments
    ///
    /// * `core` - Owning core index, used in errors and logs
    /// * `geometry` - Set-index bits, associativity, and block-offset bits
    /// * `timing` - Supplies the write-back latency charged for dirty evictions
    ///
    /// # Returns
    ///
    /// A cache whose lines are all `Invalid`.
    pub fn new(core: CoreId, geometry: &CacheConfig, timing: &TimingConfig) -> Self {
        let ways = geometry.associativity.max(1);
        let lines = vec![CacheLine::empty(geometry.block_bytes()); geometry.num_sets() * ways];
        Self {
            core,
            layout: geometry.layout(),
            ways,
            lines,
            lru: LruClock::new(),
            writeback_latency: timing.writeback_latency,
            stats: CoreStats::default(),
        }
    }

    /// Number of sets.
    pub const fn num_sets(&self) -> usize {
        self.layout.num_sets()
    }

    /// Lines per set.
    pub const fn ways(&self) -> usize {
        self.ways
    }

    /// Block size in bytes.
    pub const fn block_bytes(&self) -> usize {
        self.layout.block_bytes()
    }

    /// Counters accumulated by this cache and its core.
    pub const fn stats(&self) -> &CoreStats {
        &self.stats
    }

    pub(crate) const fn stats_mut(&mut self) -> &mut CoreStats {
        &mut self.stats
    }

    /// Iterates over every line as `(set index, way, line)`.
    pub fn lines(&self) -> impl Iterator<Item = (usize, usize, &CacheLine)> {
        let ways = self.ways;
        self.lines
            .iter()
            .enumerate()
            .map(move |(slot, line)| (slot / ways, slot % ways, line))
    }

    #[cfg(test)]
    pub(crate) fn lines_mut(&mut self) -> &mut [CacheLine] {
        &mut self.lines
    }

    /// Current state of the block containing `addr` (`Invalid` when absent).
    pub fn state_of(&self, addr: Address) -> MesiState {
        self.locate(addr)
            .ok()
            .and_then(|(tag, index)| self.find(tag, index))
            .map_or(MesiState::Invalid, |slot| self.lines[slot].state)
    }

    /// Returns the line holding `addr`, if any.
    pub fn line_of(&self, addr: Address) -> Option<&CacheLine> {
        let (tag, index) = self.locate(addr).ok()?;
        self.find(tag, index).map(|slot| &self.lines[slot])
    }

    /// Splits `addr`. The index is already masked to `num_sets`, so this only fails if
    /// `layout` and `lines` disagree.
    fn locate(&self, addr: Address) -> Result<(u32, usize), AddressError> {
        let (tag, index) = self.layout.split(addr);
        if index >= self.num_sets() {
            return Err(AddressError {
                core: self.core,
                address: addr,
                index,
                sets: self.num_sets(),
            });
        }
        Ok((tag, index))
    }

    fn find(&self, tag: u32, index: usize) -> Option<usize> {
        let base = index * self.ways;
        (base..base + self.ways).find(|&slot| self.lines[slot].matches(tag))
    }

    /// Performs a local read or write.
    ///
    /// Hits stamp the line with a fresh LRU value. A write hit on an Exclusive line moves
    /// silently to Modified; a write hit on a Shared line needs the bus.
    ///
    /// # Arguments
    ///
    /// * `addr` - Byte address from the trace
    /// * `is_write` - Whether the access is a store
    /// * `bus_free` - Whether the bus could accept an `Invalidate` this cycle
    ///
    /// # Returns
    ///
    /// The access outcome. A `Blocked` outcome leaves every line and the LRU clock untouched.
    ///
    /// # Errors
    ///
    /// Returns `AddressError` if the set index falls outside the geometry; nothing is mutated.
    pub fn access(
        &mut self,
        addr: Address,
        is_write: bool,
        bus_free: bool,
    ) -> Result<Access, AddressError> {
        let (tag, index) = self.locate(addr)?;
        let Some(slot) = self.find(tag, index) else {
            let operation = if is_write {
                BusOperation::BusReadX
            } else {
                BusOperation::BusRead
            };
            return Ok(Access::Miss(BusTransaction::request(
                operation, addr, self.core,
            )));
        };

        let upgrade = is_write && self.lines[slot].state == MesiState::Shared;
        if upgrade && !bus_free {
            return Ok(Access::Blocked);
        }

        let stamp = self.lru.tick();
        let line = &mut self.lines[slot];
        line.lru_counter = stamp;
        if is_write {
            line.state = MesiState::Modified;
            line.dirty = true;
        }

        if upgrade {
            self.stats.invalidations += 1;
            return Ok(Access::Upgrade(BusTransaction::request(
                BusOperation::Invalidate,
                addr,
                self.core,
            )));
        }
        Ok(Access::Hit)
    }

    /// Reacts to a transaction observed on the bus.
    ///
    /// Snoops never touch LRU state.
    ///
    /// # Arguments
    ///
    /// * `tx` - Transaction issued by another core
    ///
    /// # Returns
    ///
    /// * `Flush(block)` - this cache held the block Modified (BusRead) or dirty (BusReadX)
    /// * `Supply(block)` - this cache held a clean copy and a BusRead asked for it
    /// * `None` - no copy, or an invalidation
    pub fn handle_snoop(&mut self, tx: &BusTransaction) -> SnoopResponse {
        let Ok((tag, index)) = self.locate(tx.address) else {
            return SnoopResponse::None;
        };
        let Some(slot) = self.find(tag, index) else {
            return SnoopResponse::None;
        };
        let line = &mut self.lines[slot];

        match tx.operation {
            BusOperation::BusRead => match line.state {
                MesiState::Modified => {
                    line.state = MesiState::Shared;
                    line.dirty = false;
                    self.stats.writebacks += 1;
                    SnoopResponse::Flush(line.block.clone())
                }
                MesiState::Exclusive | MesiState::Shared => {
                    line.state = MesiState::Shared;
                    SnoopResponse::Supply(line.block.clone())
                }
                MesiState::Invalid => SnoopResponse::None,
            },
            BusOperation::BusReadX => {
                let was_dirty = line.dirty;
                line.invalidate();
                if was_dirty {
                    self.stats.writebacks += 1;
                    SnoopResponse::Flush(line.block.clone())
                } else {
                    SnoopResponse::None
                }
            }
            BusOperation::Invalidate => {
                line.invalidate();
                self.stats.invalidations += 1;
                SnoopResponse::None
            }
            BusOperation::Flush | BusOperation::Update => SnoopResponse::None,
        }
    }

    /// Installs the block for `addr` in `final_state`.
    ///
    /// Selects a victim (first invalid way, else least recently used). Evicting a valid
    /// line counts an eviction; evicting a dirty line also counts a write-back and charges
    /// the write-back latency. The new line is dirty only when installed `Modified`.
    /// A clean-on-install policy would differ here: a block fetched for a write miss
    /// is written back when evicted even if no later store touches it.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address of the requested block
    /// * `data` - Block contents (resized to the block size)
    /// * `final_state` - MESI state granted by the bus
    ///
    /// # Returns
    ///
    /// The eviction penalty in cycles (0 or the write-back latency).
    ///
    /// # Errors
    ///
    /// Returns `AddressError` if the set index falls outside the geometry; nothing is mutated.
    pub fn install(
        &mut self,
        addr: Address,
        mut data: Vec<u8>,
        final_state: MesiState,
    ) -> Result<u64, AddressError> {
        let (tag, index) = self.locate(addr)?;
        let base = index * self.ways;
        let way = lru::select_victim(&self.lines[base..base + self.ways]);
        let slot = base + way;

        let mut penalty = 0;
        let victim = &self.lines[slot];
        if victim.valid {
            self.stats.evictions += 1;
            if victim.dirty {
                self.stats.writebacks += 1;
                penalty += self.writeback_latency;
            }
            tracing::trace!(
                core = self.core,
                set = index,
                way,
                victim_tag = victim.tag,
                dirty = victim.dirty,
                "evict"
            );
        }

        let block_bytes = self.block_bytes();
        data.resize(block_bytes, 0);
        self.lines[slot] = CacheLine {
            tag,
            valid: true,
            dirty: final_state == MesiState::Modified,
            state: final_state,
            lru_counter: self.lru.tick(),
            block: data,
        };
        self.stats.data_traffic_bytes += block_bytes as u64;

        Ok(penalty)
    }
}
