//! Simulator: owns the cores and the bus side by side.
//!
//! Each cycle steps cores `0..N` in order, then the bus. Lower-numbered cores therefore win
//! simultaneous requests for the bus. The run ends once every trace has drained and the bus
//! holds nothing queued or in flight.

use crate::common::SimError;
use crate::config::Config;
use crate::core::{Core, StepOutcome};
use crate::sim::coherence::check_coherence;
use crate::sim::loader::Trace;
use crate::soc::BusArbiter;
use crate::stats::{ReportParameters, SimReport};

/// Top-level simulator: per-core runners plus the shared bus.
#[derive(Debug)]
pub struct Simulator {
    cores: Vec<Core>,
    bus: BusArbiter,
    cycle: u64,
    check_coherence: bool,
    max_cycles: Option<u64>,
}

impl Simulator {
    /// Creates a simulator with one core per trace.
    ///
    /// # Arguments
    ///
    /// * `config` - Geometry, timing, and run controls
    /// * `traces` - One instruction sequence per core, in core order
    ///
    /// # Errors
    ///
    /// * `SimError::Config` - the configuration failed validation
    /// * `SimError::TraceCount` - the number of traces differs from `general.cores`
    pub fn new(config: &Config, traces: Vec<Trace>) -> Result<Self, SimError> {
        config.validate()?;
        if traces.len() != config.general.cores {
            return Err(SimError::TraceCount {
                expected: config.general.cores,
                got: traces.len(),
            });
        }

        let cores = traces
            .into_iter()
            .enumerate()
            .map(|(id, trace)| Core::new(id, config, trace))
            .collect();

        Ok(Self {
            cores,
            bus: BusArbiter::new(config.timing.clone(), config.cache.block_bytes()),
            cycle: 0,
            check_coherence: config.general.check_coherence,
            max_cycles: config.general.max_cycles,
        })
    }

    /// Global cycles elapsed.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// All cores, indexed by id.
    pub fn cores(&self) -> &[Core] {
        &self.cores
    }

    /// Core `id`, if it exists.
    pub fn core(&self, id: usize) -> Option<&Core> {
        self.cores.get(id)
    }

    /// The shared bus.
    pub const fn bus(&self) -> &BusArbiter {
        &self.bus
    }

    /// Whether every trace has drained and the bus is empty.
    pub fn is_finished(&self) -> bool {
        self.cores.iter().all(Core::is_drained) && self.bus.is_free()
    }

    /// Advances the whole system by one clock cycle.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Coherence` if checking is enabled and a completed transaction
    /// left the caches in a state that breaks MESI.
    pub fn tick(&mut self) -> Result<(), SimError> {
        for id in 0..self.cores.len() {
            let bus_free = self.bus.is_free();
            let outcome = self.cores[id].step(bus_free);
            tracing::trace!(cycle = self.cycle, core = id, ?outcome, "step");

            match outcome {
                StepOutcome::Upgrade(tx) => self.bus.submit_invalidate(tx, &mut self.cores),
                StepOutcome::Miss(tx) => {
                    let core = &mut self.cores[id];
                    if bus_free {
                        core.stats_mut().misses += 1;
                        core.waiting_for_bus = false;
                        self.bus.enqueue(tx);
                    } else {
                        core.waiting_for_bus = true;
                    }
                }
                StepOutcome::Stalled
                | StepOutcome::Idle
                | StepOutcome::Hit
                | StepOutcome::Blocked
                | StepOutcome::Refused => {}
            }
        }

        let completed = self.bus.step(&mut self.cores);
        if completed.is_some() && self.check_coherence {
            check_coherence(&self.cores).map_err(|violation| SimError::Coherence {
                cycle: self.cycle,
                violation,
            })?;
        }

        self.cycle += 1;
        Ok(())
    }

    /// Runs until every trace drains.
    ///
    /// # Returns
    ///
    /// The total number of global cycles.
    ///
    /// # Errors
    ///
    /// * `SimError::CycleLimit` - `general.max_cycles` was reached first
    /// * `SimError::Coherence` - a coherence check failed
    pub fn run(&mut self) -> Result<u64, SimError> {
        while !self.is_finished() {
            if let Some(limit) = self.max_cycles.filter(|&limit| self.cycle >= limit) {
                return Err(SimError::CycleLimit(limit));
            }
            self.tick()?;
        }

        let bus = self.bus.stats();
        tracing::info!(
            cycles = self.cycle,
            transactions = bus.transactions,
            traffic_bytes = bus.traffic_bytes,
            "simulation finished"
        );
        Ok(self.cycle)
    }

    /// Snapshot of every counter, for rendering.
    pub fn report(&self, parameters: ReportParameters) -> SimReport {
        SimReport::new(
            parameters,
            self.cores.iter().map(Core::stats),
            self.bus.stats(),
            self.cycle,
        )
    }
}
