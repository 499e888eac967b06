//! Bus Arbiter Tests.
//!
//! Verifies dispatch pricing for each snoop outcome, responder stalls, completion,
//! synchronous invalidation, and bus traffic accounting. Cores are driven by hand so
//! each bus step can be observed.

use mesisim_core::common::Address;
use mesisim_core::config::Config;
use mesisim_core::core::units::cache::MesiState;
use mesisim_core::core::{Core, Instruction, StepOutcome};
use mesisim_core::soc::interconnect::BusPhase;
use mesisim_core::soc::{BusArbiter, BusOperation, BusTransaction};

use crate::common::harness::{config, r, w};

/// 1 set, 2 ways, 16-byte blocks: transfer = 2 * (16 / 4) = 8 cycles.
fn test_config() -> Config {
    config(0, 2, 4)
}

fn system(per_core: [Vec<Instruction>; 2]) -> (BusArbiter, Vec<Core>) {
    let config = test_config();
    let bus = BusArbiter::new(config.timing.clone(), config.cache.block_bytes());
    let cores = per_core
        .into_iter()
        .enumerate()
        .map(|(id, trace)| Core::new(id, &config, trace))
        .collect();
    (bus, cores)
}

fn preload(core: &mut Core, addr: u32, state: MesiState) {
    let _ = core
        .cache_mut()
        .install(Address::new(addr), Vec::new(), state)
        .unwrap();
}

/// Steps core 0 once, puts its miss on the bus, and runs one bus step (dispatch).
fn issue_from_core0(bus: &mut BusArbiter, cores: &mut [Core]) {
    let StepOutcome::Miss(tx) = cores[0].step(bus.is_free()) else {
        panic!("core 0 should miss");
    };
    bus.enqueue(tx);
    assert!(!bus.is_free());
    assert_eq!(bus.step(cores), None);
    assert_eq!(bus.phase(), BusPhase::Dispatched);
}

// ══════════════════════════════════════════════════════════
// 1. BusRead
// ══════════════════════════════════════════════════════════

#[test]
fn read_from_memory_grants_exclusive() {
    let (mut bus, mut cores) = system([vec![r(0)], vec![]]);
    issue_from_core0(&mut bus, &mut cores);

    assert_eq!(cores[0].stall_cycles, 100);
    assert_eq!(bus.active().unwrap().remaining_cycles, 100);
    assert_eq!(cores[0].cache().state_of(Address::new(0)), MesiState::Exclusive);
    assert_eq!(bus.stats().transactions, 1);
    assert_eq!(bus.stats().traffic_bytes, 16);
}

#[test]
fn read_supplied_by_clean_peer() {
    let (mut bus, mut cores) = system([vec![r(0)], vec![]]);
    preload(&mut cores[1], 0, MesiState::Exclusive);
    issue_from_core0(&mut bus, &mut cores);

    assert_eq!(cores[0].stall_cycles, 8);
    assert_eq!(cores[1].stall_cycles, 8);
    assert_eq!(cores[0].cache().state_of(Address::new(0)), MesiState::Shared);
    assert_eq!(cores[1].cache().state_of(Address::new(0)), MesiState::Shared);
    assert_eq!(cores[1].stats().data_traffic_bytes, 32);
    assert_eq!(cores[1].stats().writebacks, 0);
}

#[test]
fn read_flushed_by_modified_peer() {
    let (mut bus, mut cores) = system([vec![r(0)], vec![]]);
    preload(&mut cores[1], 0, MesiState::Modified);
    issue_from_core0(&mut bus, &mut cores);

    assert_eq!(cores[0].stall_cycles, 108);
    assert_eq!(cores[1].stall_cycles, 108);
    assert_eq!(cores[0].cache().state_of(Address::new(0)), MesiState::Shared);
    assert_eq!(cores[1].cache().state_of(Address::new(0)), MesiState::Shared);
    assert_eq!(cores[1].stats().writebacks, 1);
    assert_eq!(bus.stats().traffic_bytes, 16, "a read flush is one transfer");
}

// ══════════════════════════════════════════════════════════
// 2. BusReadX
// ══════════════════════════════════════════════════════════

#[test]
fn read_exclusive_invalidates_clean_copies() {
    let (mut bus, mut cores) = system([vec![w(0)], vec![]]);
    preload(&mut cores[1], 0, MesiState::Shared);
    issue_from_core0(&mut bus, &mut cores);

    assert_eq!(cores[0].stall_cycles, 100);
    assert_eq!(cores[1].stall_cycles, 0);
    assert_eq!(cores[0].cache().state_of(Address::new(0)), MesiState::Modified);
    assert_eq!(cores[1].cache().state_of(Address::new(0)), MesiState::Invalid);
}

#[test]
fn read_exclusive_waits_for_dirty_flush() {
    let (mut bus, mut cores) = system([vec![w(0)], vec![]]);
    preload(&mut cores[1], 0, MesiState::Modified);
    issue_from_core0(&mut bus, &mut cores);

    assert_eq!(cores[0].stall_cycles, 200);
    assert_eq!(cores[1].stall_cycles, 100);
    assert_eq!(cores[1].stats().writebacks, 1);
    assert_eq!(cores[1].cache().state_of(Address::new(0)), MesiState::Invalid);
    assert_eq!(bus.stats().traffic_bytes, 32);
}

#[test]
fn dirty_eviction_extends_service_time() {
    let (mut bus, mut cores) = system([vec![r(0x40)], vec![]]);
    preload(&mut cores[0], 0x00, MesiState::Modified);
    preload(&mut cores[0], 0x10, MesiState::Shared);
    issue_from_core0(&mut bus, &mut cores);

    assert_eq!(cores[0].stall_cycles, 200);
    assert_eq!(cores[0].stats().evictions, 1);
    assert_eq!(cores[0].stats().writebacks, 1);
    assert_eq!(bus.stats().traffic_bytes, 32);
}

// ══════════════════════════════════════════════════════════
// 3. Completion
// ══════════════════════════════════════════════════════════

#[test]
fn completes_after_service_time() {
    let (mut bus, mut cores) = system([vec![r(0)], vec![]]);
    preload(&mut cores[1], 0, MesiState::Shared);
    issue_from_core0(&mut bus, &mut cores);

    for _ in 0..7 {
        assert_eq!(bus.step(&mut cores), None);
        assert_eq!(bus.phase(), BusPhase::Servicing);
    }
    let done = bus.step(&mut cores).unwrap();
    assert_eq!(done.requester, Some(0));
    assert_eq!(done.transaction.operation, BusOperation::BusRead);
    assert_eq!(bus.phase(), BusPhase::Complete);
    assert!(bus.is_free());
    assert!(cores[0].is_drained());
    assert_eq!(cores[0].stall_cycles, 0);

    assert_eq!(bus.step(&mut cores), None);
    assert_eq!(bus.phase(), BusPhase::Idle);
}

#[test]
fn queue_is_first_in_first_out() {
    let (mut bus, mut cores) = system([vec![r(0)], vec![r(0x10)]]);
    bus.enqueue(BusTransaction::request(BusOperation::BusRead, Address::new(0), 0));
    bus.enqueue(BusTransaction::request(BusOperation::BusRead, Address::new(0x10), 1));
    assert_eq!(bus.queued(), 2);

    let _ = bus.step(&mut cores);
    assert_eq!(bus.active().unwrap().originating_core, Some(0));
    assert_eq!(bus.queued(), 1);
}

// ══════════════════════════════════════════════════════════
// 4. Invalidate
// ══════════════════════════════════════════════════════════

#[test]
fn invalidate_is_synchronous_and_holds_bus_one_step() {
    let (mut bus, mut cores) = system([vec![w(0)], vec![]]);
    preload(&mut cores[0], 0, MesiState::Shared);
    preload(&mut cores[1], 0, MesiState::Shared);

    let StepOutcome::Upgrade(tx) = cores[0].step(bus.is_free()) else {
        panic!("core 0 should upgrade");
    };
    bus.submit_invalidate(tx, &mut cores);

    assert_eq!(cores[1].cache().state_of(Address::new(0)), MesiState::Invalid);
    assert_eq!(cores[1].stats().invalidations, 1);
    assert_eq!(cores[0].stats().invalidations, 1);
    assert!(!bus.is_free());

    let done = bus.step(&mut cores).unwrap();
    assert_eq!(done.transaction.operation, BusOperation::Invalidate);
    assert!(bus.is_free());
    assert_eq!(bus.stats().invalidations, 1);
    assert_eq!(bus.stats().transactions, 1);
    assert_eq!(bus.stats().traffic_bytes, 0);
}
