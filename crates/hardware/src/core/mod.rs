//! Core trace runner.
//!
//! A core replays its trace of loads and stores in order against its private cache. It
//! coordinates the following:
//! 1. **Stalls:** While a bus transaction it issued or answered is being serviced, the core
//!    burns one busy cycle per step.
//! 2. **Accesses:** Otherwise the front instruction is tried against the cache; hits retire
//!    immediately, misses and Shared-write upgrades are handed to the simulator.
//! 3. **Bus waits:** A core that could not get the bus is charged one idle cycle for every
//!    step it starts unstalled while still waiting.

/// Execution units (the private cache).
pub mod units;

use std::collections::VecDeque;

use crate::common::{Address, CoreId};
use crate::config::Config;
use crate::core::units::cache::{Access, Cache};
use crate::soc::transaction::BusTransaction;
use crate::stats::CoreStats;

/// One trace entry: a load or store to a byte address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// Whether the access is a store.
    pub is_write: bool,
    /// Byte address accessed.
    pub address: Address,
}

impl Instruction {
    /// A load from `addr`.
    pub const fn read(addr: u32) -> Self {
        Self {
            is_write: false,
            address: Address::new(addr),
        }
    }

    /// A store to `addr`.
    pub const fn write(addr: u32) -> Self {
        Self {
            is_write: true,
            address: Address::new(addr),
        }
    }
}

/// What a core did in one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Burned a stall cycle (counted busy).
    Stalled,
    /// Nothing left to run.
    Idle,
    /// The front instruction hit and retired.
    Hit,
    /// A Shared-write hit retired; the `Invalidate` must be broadcast now.
    Upgrade(BusTransaction),
    /// The front instruction missed; the request needs the bus.
    Miss(BusTransaction),
    /// A Shared-write hit could not get the bus.
    Blocked,
    /// The cache refused the address; the instruction was dropped.
    Refused,
}

/// A core: instruction queue, stall counter, and private cache.
#[derive(Debug)]
pub struct Core {
    id: CoreId,
    cache: Cache,
    instructions: VecDeque<Instruction>,
    /// Remaining cycles of the current bus stall.
    pub stall_cycles: u64,
    /// Set while the core has a request the bus could not accept.
    pub waiting_for_bus: bool,
}

impl Core {
    /// Creates core `id` with an empty cache and the given trace.
    ///
    /// Reads and writes are tallied here, once per loaded instruction.
    ///
    /// # Arguments
    ///
    /// * `id` - Core index
    /// * `config` - Supplies the cache geometry and write-back latency
    /// * `trace` - Instructions in program order
    pub fn new(id: CoreId, config: &Config, trace: Vec<Instruction>) -> Self {
        let mut cache = Cache::new(id, &config.cache, &config.timing);
        let writes = trace.iter().filter(|i| i.is_write).count() as u64;
        let stats = cache.stats_mut();
        stats.writes = writes;
        stats.reads = trace.len() as u64 - writes;

        Self {
            id,
            cache,
            instructions: trace.into(),
            stall_cycles: 0,
            waiting_for_bus: false,
        }
    }

    /// Core index.
    pub const fn id(&self) -> CoreId {
        self.id
    }

    /// The private cache.
    pub const fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Mutable access to the private cache (used by the bus for snoops and installs).
    pub const fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    /// Counters for this core.
    pub const fn stats(&self) -> &CoreStats {
        self.cache.stats()
    }

    pub(crate) const fn stats_mut(&mut self) -> &mut CoreStats {
        self.cache.stats_mut()
    }

    /// Instructions not yet retired.
    pub fn pending(&self) -> usize {
        self.instructions.len()
    }

    /// Whether every instruction has retired.
    pub fn is_drained(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Whether the core is burning stall cycles.
    pub const fn is_stalled(&self) -> bool {
        self.stall_cycles > 0
    }

    /// Advances the core by one cycle.
    ///
    /// # Arguments
    ///
    /// * `bus_free` - Whether the bus has no active or queued transaction
    ///
    /// # Returns
    ///
    /// The step outcome. `Miss` does not retire the instruction; the simulator decides
    /// whether it goes on the bus or the core waits.
    pub fn step(&mut self, bus_free: bool) -> StepOutcome {
        if self.stall_cycles > 0 {
            self.stall_cycles -= 1;
            self.cache.stats_mut().busy_cycles += 1;
            return StepOutcome::Stalled;
        }
        if self.waiting_for_bus {
            self.cache.stats_mut().idle_cycles += 1;
        }
        let Some(&instr) = self.instructions.front() else {
            return StepOutcome::Idle;
        };

        match self.cache.access(instr.address, instr.is_write, bus_free) {
            Ok(Access::Hit) => {
                self.retire_hit();
                StepOutcome::Hit
            }
            Ok(Access::Upgrade(tx)) => {
                self.retire_hit();
                StepOutcome::Upgrade(tx)
            }
            Ok(Access::Miss(tx)) => StepOutcome::Miss(tx),
            Ok(Access::Blocked) => {
                self.waiting_for_bus = true;
                StepOutcome::Blocked
            }
            // Unreachable with a layout built from the same geometry: the index is masked.
            Err(e) => {
                tracing::warn!(core = self.id, error = %e, "dropping instruction");
                let _ = self.instructions.pop_front();
                self.waiting_for_bus = false;
                StepOutcome::Refused
            }
        }
    }

    fn retire_hit(&mut self) {
        let _ = self.instructions.pop_front();
        self.waiting_for_bus = false;
        let stats = self.cache.stats_mut();
        stats.hits += 1;
        stats.busy_cycles += 1;
    }

    /// Retires the front instruction once its bus transaction completes.
    pub fn complete_pending(&mut self) {
        let _ = self.instructions.pop_front();
        self.stall_cycles = 0;
    }
}
