//! Randomized Simulation Properties.
//!
//! Random four-core traces over a small address pool, so blocks are shared and sets
//! conflict constantly. Properties checked:
//! - MESI invariants hold after every cycle.
//! - Every instruction retires exactly once, as a hit or a miss.
//! - Runs are deterministic.

use mesisim_core::Simulator;
use mesisim_core::config::Config;
use mesisim_core::core::Instruction;
use mesisim_core::sim::{Trace, check_coherence};
use mesisim_core::stats::ReportParameters;
use proptest::prelude::*;

use crate::common::harness::config;

fn instruction() -> impl Strategy<Value = Instruction> {
    (any::<bool>(), 0u32..32).prop_map(|(is_write, slot)| Instruction {
        is_write,
        address: (slot * 4).into(),
    })
}

fn traces() -> impl Strategy<Value = Vec<Trace>> {
    prop::collection::vec(prop::collection::vec(instruction(), 0..24), 4)
}

fn geometry() -> impl Strategy<Value = Config> {
    (0u32..3, 1usize..3, 2u32..4).prop_map(|(s, e, b)| config(s, e, b))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_every_cycle(config in geometry(), traces in traces()) {
        let mut sim = Simulator::new(&config, traces).unwrap();
        while !sim.is_finished() {
            sim.tick().unwrap();
            prop_assert_eq!(check_coherence(sim.cores()), Ok(()));
            prop_assert!(sim.cycle() < 100_000);
        }
    }

    #[test]
    fn every_instruction_retires_once(config in geometry(), traces in traces()) {
        let mut sim = Simulator::new(&config, traces).unwrap();
        let _ = sim.run().unwrap();
        for core in sim.cores() {
            let s = core.stats();
            prop_assert_eq!(s.hits + s.misses, s.reads + s.writes);
            prop_assert!(core.is_drained());
        }
        let misses: u64 = sim.cores().iter().map(|c| c.stats().misses).sum();
        prop_assert_eq!(
            sim.bus().stats().transactions,
            misses + sim.bus().stats().invalidations
        );
    }

    #[test]
    fn runs_are_deterministic(config in geometry(), traces in traces()) {
        let params = ReportParameters::new("prop", &config.cache);

        let mut first = Simulator::new(&config, traces.clone()).unwrap();
        let mut second = Simulator::new(&config, traces).unwrap();
        prop_assert_eq!(first.run().unwrap(), second.run().unwrap());
        prop_assert_eq!(first.report(params.clone()), second.report(params));
    }
}
