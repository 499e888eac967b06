//! Cache Snoop Tests.
//!
//! Verifies the snoop response table: what every (transaction, local state) pair
//! answers, which state it leaves behind, and what it counts.

use mesisim_core::common::Address;
use mesisim_core::config::{CacheConfig, TimingConfig};
use mesisim_core::core::units::cache::{Cache, MesiState, SnoopResponse};
use mesisim_core::soc::{BusOperation, BusTransaction};
use rstest::rstest;

const A: Address = Address::new(0x80);

fn cache_holding(state: MesiState) -> Cache {
    let geometry = CacheConfig {
        set_index_bits: 1,
        associativity: 2,
        block_offset_bits: 3,
    };
    let mut cache = Cache::new(2, &geometry, &TimingConfig::default());
    if state != MesiState::Invalid {
        let _ = cache.install(A, vec![0xab; 8], state).unwrap();
    }
    cache
}

#[derive(Debug, PartialEq, Eq)]
enum Kind {
    None,
    Supply,
    Flush,
}

fn kind(response: &SnoopResponse) -> Kind {
    match response {
        SnoopResponse::None => Kind::None,
        SnoopResponse::Supply(_) => Kind::Supply,
        SnoopResponse::Flush(_) => Kind::Flush,
    }
}

#[rstest]
#[case::read_modified(BusOperation::BusRead, MesiState::Modified, Kind::Flush, MesiState::Shared, 1, 0)]
#[case::read_exclusive(BusOperation::BusRead, MesiState::Exclusive, Kind::Supply, MesiState::Shared, 0, 0)]
#[case::read_shared(BusOperation::BusRead, MesiState::Shared, Kind::Supply, MesiState::Shared, 0, 0)]
#[case::read_absent(BusOperation::BusRead, MesiState::Invalid, Kind::None, MesiState::Invalid, 0, 0)]
#[case::readx_modified(BusOperation::BusReadX, MesiState::Modified, Kind::Flush, MesiState::Invalid, 1, 0)]
#[case::readx_exclusive(BusOperation::BusReadX, MesiState::Exclusive, Kind::None, MesiState::Invalid, 0, 0)]
#[case::readx_shared(BusOperation::BusReadX, MesiState::Shared, Kind::None, MesiState::Invalid, 0, 0)]
#[case::readx_absent(BusOperation::BusReadX, MesiState::Invalid, Kind::None, MesiState::Invalid, 0, 0)]
#[case::inval_shared(BusOperation::Invalidate, MesiState::Shared, Kind::None, MesiState::Invalid, 0, 1)]
#[case::inval_absent(BusOperation::Invalidate, MesiState::Invalid, Kind::None, MesiState::Invalid, 0, 0)]
#[case::flush_ignored(BusOperation::Flush, MesiState::Exclusive, Kind::None, MesiState::Exclusive, 0, 0)]
#[case::update_ignored(BusOperation::Update, MesiState::Shared, Kind::None, MesiState::Shared, 0, 0)]
fn snoop_table(
    #[case] operation: BusOperation,
    #[case] initial: MesiState,
    #[case] expected: Kind,
    #[case] after: MesiState,
    #[case] writebacks: u64,
    #[case] invalidations: u64,
) {
    let mut cache = cache_holding(initial);
    let response = cache.handle_snoop(&BusTransaction::request(operation, A, 0));

    assert_eq!(kind(&response), expected);
    assert_eq!(cache.state_of(A), after);
    assert_eq!(cache.stats().writebacks, writebacks);
    assert_eq!(cache.stats().invalidations, invalidations);
}

#[test]
fn flush_carries_block_and_clears_dirty() {
    let mut cache = cache_holding(MesiState::Modified);
    let response = cache.handle_snoop(&BusTransaction::request(BusOperation::BusRead, A, 0));

    assert_eq!(response, SnoopResponse::Flush(vec![0xab; 8]));
    let line = cache.line_of(A).unwrap();
    assert!(!line.dirty);
    assert_eq!(line.state, MesiState::Shared);
}

#[test]
fn snoop_does_not_touch_lru() {
    let mut cache = cache_holding(MesiState::Exclusive);
    let before = cache.line_of(A).unwrap().lru_counter;
    let _ = cache.handle_snoop(&BusTransaction::request(BusOperation::BusRead, A, 0));
    assert_eq!(cache.line_of(A).unwrap().lru_counter, before);
}

#[test]
fn snoop_for_other_tag_in_same_set_is_ignored() {
    let mut cache = cache_holding(MesiState::Modified);
    let other = Address::new(0x180);
    let response = cache.handle_snoop(&BusTransaction::request(BusOperation::BusReadX, other, 0));
    assert_eq!(response, SnoopResponse::None);
    assert_eq!(cache.state_of(A), MesiState::Modified);
}

#[test]
fn invalidated_line_keeps_invariants() {
    let mut cache = cache_holding(MesiState::Modified);
    let _ = cache.handle_snoop(&BusTransaction::request(BusOperation::BusReadX, A, 0));
    for (_, _, line) in cache.lines() {
        if !line.valid {
            assert_eq!(line.state, MesiState::Invalid);
            assert!(!line.dirty);
        }
    }
}
