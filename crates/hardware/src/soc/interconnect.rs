//! Snooping bus arbiter.
//!
//! This module implements the single shared bus that keeps the private caches coherent. It
//! provides:
//! 1. **Arbitration:** A FIFO of pending requests; at most one transaction is in flight.
//! 2. **Snooping:** Every request is broadcast to all other caches, whose responses decide
//!    where the data comes from and what MESI state the requester is granted.
//! 3. **Timing:** Service time (memory fetch, cache-to-cache transfer, write-backs) is
//!    charged to the requester and to any responding cache as stall cycles.
//! 4. **Accounting:** Transaction, traffic, and invalidation counters.
//!
//! Phases of a transaction: `Idle -> Dispatched -> Servicing -> Complete -> Idle`.
//! `Invalidate` broadcasts are synchronous: they are snooped the cycle they are issued and
//! hold the bus only until the end of that cycle.

use std::collections::VecDeque;

use crate::common::CoreId;
use crate::config::TimingConfig;
use crate::core::Core;
use crate::core::units::cache::{MesiState, SnoopResponse};
use crate::soc::transaction::{BusOperation, BusTransaction};
use crate::stats::BusStats;

/// Lifecycle phase of the bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BusPhase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// A transaction was just accepted and snooped.
    Dispatched,
    /// The in-flight transaction is counting down its service time.
    Servicing,
    /// The in-flight transaction finished this cycle.
    Complete,
}

/// Transaction that finished during a bus step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// The finished transaction.
    pub transaction: BusTransaction,
    /// Core whose instruction retired, if the transaction had an originator.
    pub requester: Option<CoreId>,
}

/// Single shared snooping bus.
#[derive(Debug)]
pub struct BusArbiter {
    queue: VecDeque<BusTransaction>,
    active: Option<BusTransaction>,
    phase: BusPhase,
    timing: TimingConfig,
    block_bytes: usize,
    stats: BusStats,
}

impl BusArbiter {
    /// Creates an idle bus.
    ///
    /// # Arguments
    ///
    /// * `timing` - Memory, write-back, and transfer latencies
    /// * `block_bytes` - Block size, used for transfer time and traffic
    pub const fn new(timing: TimingConfig, block_bytes: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            active: None,
            phase: BusPhase::Idle,
            timing,
            block_bytes,
            stats: BusStats {
                transactions: 0,
                traffic_bytes: 0,
                invalidations: 0,
            },
        }
    }

    /// Whether the bus would accept a request: nothing queued and nothing in flight.
    pub fn is_free(&self) -> bool {
        self.queue.is_empty() && self.active.is_none()
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> BusPhase {
        self.phase
    }

    /// The in-flight transaction, if any.
    pub const fn active(&self) -> Option<&BusTransaction> {
        self.active.as_ref()
    }

    /// Requests waiting for dispatch.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Bus counters.
    pub const fn stats(&self) -> &BusStats {
        &self.stats
    }

    /// Accepts a `BusRead` or `BusReadX` request for dispatch on a later bus step.
    pub fn enqueue(&mut self, tx: BusTransaction) {
        tracing::trace!(%tx, "enqueue");
        self.stats.transactions += 1;
        self.queue.push_back(tx);
    }

    /// Broadcasts an `Invalidate` immediately.
    ///
    /// Every core other than the originator drops its copy. The transaction then occupies
    /// the bus until the next bus step.
    ///
    /// # Arguments
    ///
    /// * `tx` - The `Invalidate` produced by a Shared-write upgrade
    /// * `cores` - All cores, indexed by id
    pub fn submit_invalidate(&mut self, tx: BusTransaction, cores: &mut [Core]) {
        tracing::debug!(%tx, "broadcast");
        for core in cores
            .iter_mut()
            .filter(|c| Some(c.id()) != tx.originating_core)
        {
            let _ = core.cache_mut().handle_snoop(&tx);
        }
        self.stats.transactions += 1;
        self.stats.invalidations += 1;
        self.active = Some(tx);
        self.phase = BusPhase::Dispatched;
    }

    /// Advances the bus by one cycle.
    ///
    /// An in-flight transaction counts down; when it reaches zero the requester's
    /// instruction retires and the bus frees. An idle bus dispatches the head of the queue.
    ///
    /// # Returns
    ///
    /// The transaction that completed this cycle, if any.
    pub fn step(&mut self, cores: &mut [Core]) -> Option<Completion> {
        if let Some(tx) = self.active.as_mut() {
            if tx.operation == BusOperation::Invalidate {
                return self.finish(cores);
            }
            tx.remaining_cycles = tx.remaining_cycles.saturating_sub(1);
            self.phase = BusPhase::Servicing;
            if tx.remaining_cycles == 0 {
                return self.finish(cores);
            }
            return None;
        }

        self.phase = BusPhase::Idle;
        if let Some(tx) = self.queue.pop_front() {
            self.dispatch(tx, cores);
        }
        None
    }

    fn finish(&mut self, cores: &mut [Core]) -> Option<Completion> {
        let tx = self.active.take()?;
        self.phase = BusPhase::Complete;
        let requester = tx.originating_core;
        let retires = requester.filter(|_| tx.operation != BusOperation::Invalidate);
        if let Some(core) = retires.and_then(|id| cores.get_mut(id)) {
            core.complete_pending();
        }
        tracing::debug!(%tx, "complete");
        Some(Completion {
            transaction: tx,
            requester,
        })
    }

    /// Snoops, prices, and installs a read or read-exclusive request.
    fn dispatch(&mut self, mut tx: BusTransaction, cores: &mut [Core]) {
        self.phase = BusPhase::Dispatched;
        let Some(requester) = tx.originating_core.filter(|&id| id < cores.len()) else {
            tracing::warn!(%tx, "dropping transaction without a valid requester");
            return;
        };

        let block = self.block_bytes as u64;
        let (mut cycles, data, final_state) = match tx.operation {
            BusOperation::BusRead => self.snoop_read(&tx, requester, cores),
            BusOperation::BusReadX => self.snoop_read_exclusive(&tx, requester, cores),
            BusOperation::Invalidate | BusOperation::Flush | BusOperation::Update => {
                tracing::warn!(%tx, "unexpected queued operation");
                return;
            }
        };

        let core = &mut cores[requester];
        match core.cache_mut().install(tx.address, data, final_state) {
            Ok(penalty) => {
                if penalty > 0 {
                    self.stats.traffic_bytes += block;
                }
                cycles += penalty;
            }
            Err(e) => tracing::warn!(error = %e, "install refused"),
        }
        self.stats.traffic_bytes += block;

        let cycles = cycles.max(1);
        core.stall_cycles = cycles;
        tx.remaining_cycles = cycles;
        tracing::debug!(%tx, cycles, state = %final_state.letter(), "dispatch");
        self.active = Some(tx);
    }

    /// BusRead: the first other cache holding the block answers; otherwise memory does.
    fn snoop_read(
        &self,
        tx: &BusTransaction,
        requester: CoreId,
        cores: &mut [Core],
    ) -> (u64, Vec<u8>, MesiState) {
        let transfer = self.timing.transfer_cycles(self.block_bytes);
        for core in cores.iter_mut().filter(|c| c.id() != requester) {
            let (cycles, hold, data) = match core.cache_mut().handle_snoop(tx) {
                SnoopResponse::None => continue,
                SnoopResponse::Flush(data) => {
                    let cycles = self.timing.writeback_latency + transfer;
                    (cycles, cycles, data)
                }
                SnoopResponse::Supply(data) => (transfer, transfer, data),
            };
            core.stall_cycles = hold;
            core.stats_mut().data_traffic_bytes += self.block_bytes as u64;
            return (cycles, data, MesiState::Shared);
        }
        (self.timing.memory_latency, Vec::new(), MesiState::Exclusive)
    }

    /// BusReadX: every other copy is invalidated; a dirty one is flushed before memory
    /// supplies the block.
    fn snoop_read_exclusive(
        &mut self,
        tx: &BusTransaction,
        requester: CoreId,
        cores: &mut [Core],
    ) -> (u64, Vec<u8>, MesiState) {
        let mut cycles = 0;
        let mut data = Vec::new();
        for core in cores.iter_mut().filter(|c| c.id() != requester) {
            if let SnoopResponse::Flush(flushed) = core.cache_mut().handle_snoop(tx) {
                core.stall_cycles = self.timing.writeback_latency;
                core.stats_mut().data_traffic_bytes += self.block_bytes as u64;
                self.stats.traffic_bytes += self.block_bytes as u64;
                cycles += self.timing.writeback_latency;
                data = flushed;
            }
        }
        (
            cycles + self.timing.memory_latency,
            data,
            MesiState::Modified,
        )
    }
}
