//! Error Type Tests.
//!
//! Verifies error messages and the conversions into `SimError`.

use std::io;
use std::path::PathBuf;

use mesisim_core::common::{
    Address, AddressError, CoherenceViolation, ConfigError, SimError, TraceError,
};
use mesisim_core::core::units::cache::MesiState;

#[test]
fn config_error_converts_into_sim_error() {
    let err: SimError = ConfigError::NoCores.into();
    assert!(matches!(err, SimError::Config(ConfigError::NoCores)));
    assert_eq!(err.to_string(), "core count must be at least 1");
}

#[test]
fn trace_open_error_names_the_file() {
    let err = TraceError::Open {
        path: PathBuf::from("missing_proc2.trace"),
        source: io::Error::new(io::ErrorKind::NotFound, "not found"),
    };
    assert_eq!(
        err.to_string(),
        "trace file missing_proc2.trace does not exist or cannot be opened"
    );
    let err: SimError = err.into();
    assert!(matches!(err, SimError::Trace(TraceError::Open { .. })));
}

#[test]
fn address_error_reports_geometry() {
    let err = AddressError {
        core: 3,
        address: Address::new(0x40),
        index: 9,
        sets: 4,
    };
    assert_eq!(
        err.to_string(),
        "core 3: set index 9 out of range for 4 sets (address 0x40)"
    );
}

#[test]
fn coherence_error_carries_cycle() {
    let err = SimError::Coherence {
        cycle: 17,
        violation: CoherenceViolation::DirtyNotModified {
            core: 1,
            index: 0,
            way: 1,
            state: MesiState::Shared,
        },
    };
    assert_eq!(
        err.to_string(),
        "coherence violation at cycle 17: core 1 set 0 way 1: dirty line in state Shared"
    );
}

#[test]
fn oversized_cache_names_both_limits() {
    let err = ConfigError::CacheTooLarge {
        lines: 1 << 25,
        bytes: 1 << 27,
        max_lines: 1 << 24,
        max_bytes: 1 << 30,
    };
    assert_eq!(
        err.to_string(),
        "cache of 33554432 lines (134217728 bytes) per core exceeds the limit of 16777216 lines or 1073741824 bytes"
    );
}
