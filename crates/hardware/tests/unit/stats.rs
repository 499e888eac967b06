//! Statistics and Report Tests.
//!
//! Verifies derived metrics and the exact text, CSV, and JSON renderings of a report.

use mesisim_core::config::CacheConfig;
use mesisim_core::stats::{BusStats, CoreStats, ReportParameters, SimReport};
use pretty_assertions::assert_eq;

fn sample_core() -> CoreStats {
    CoreStats {
        reads: 3,
        writes: 1,
        hits: 3,
        misses: 1,
        evictions: 0,
        writebacks: 0,
        invalidations: 1,
        idle_cycles: 7,
        busy_cycles: 105,
        data_traffic_bytes: 32,
    }
}

fn sample_report() -> SimReport {
    let cache = CacheConfig {
        set_index_bits: 6,
        associativity: 2,
        block_offset_bits: 5,
    };
    let bus = BusStats {
        transactions: 2,
        traffic_bytes: 64,
        invalidations: 1,
    };
    let cores = [sample_core(), CoreStats::default()];
    SimReport::new(ReportParameters::new("app1", &cache), &cores, &bus, 120)
}

#[test]
fn miss_rate_is_zero_without_accesses() {
    assert!(CoreStats::default().miss_rate().abs() < f64::EPSILON);
}

#[test]
fn miss_rate_percent_is_rounded() {
    let stats = CoreStats {
        hits: 2,
        misses: 1,
        ..CoreStats::default()
    };
    let report = SimReport::new(
        ReportParameters::new("x", &CacheConfig::default()),
        [&stats],
        &BusStats::default(),
        0,
    );
    assert!((report.cores[0].miss_rate_percent - 33.33).abs() < 1e-9);
}

#[test]
fn max_execution_time_includes_idle() {
    let report = sample_report();
    assert_eq!(report.summary.max_execution_time, 112);
    assert_eq!(report.cores[0].total_instructions, 4);
    assert!((report.parameters.cache_kb_per_core - 4.0).abs() < f64::EPSILON);
}

#[test]
fn text_rendering() {
    let mut out = Vec::new();
    sample_report().write_text(&mut out).unwrap();
    let expected = "\
==========================================================
MESI CACHE COHERENCE SIMULATION
==========================================================
Simulation Parameters:
Trace Prefix: app1
Set Index Bits: 6
Associativity: 2
Block Bits: 5
Block Size (Bytes): 32
Number of Sets: 64
Cache Size (KB per core): 4.00
MESI Protocol: Enabled
Write Policy: Write-back Write-allocate
Replacement Policy: LRU
Bus: Central snooping bus
----------------------------------------------------------
Core 0 Statistics:
Total Instructions: 4
Total Reads: 3
Total Writes: 1
Total Execution Cycles: 105
Idle Cycles: 7
Cache Misses: 1
Cache Miss Rate: 25.00%
Cache Evictions: 0
Writebacks: 0
Bus Invalidations: 1
Data Traffic (Bytes): 32
----------------------------------------------------------
Core 1 Statistics:
Total Instructions: 0
Total Reads: 0
Total Writes: 0
Total Execution Cycles: 0
Idle Cycles: 0
Cache Misses: 0
Cache Miss Rate: 0.00%
Cache Evictions: 0
Writebacks: 0
Bus Invalidations: 0
Data Traffic (Bytes): 0
----------------------------------------------------------
Overall Bus Summary:
Total Bus Transactions: 2
Total Bus Traffic (Bytes): 64
Total Invalidation Broadcasts: 1
Simulated Cycles: 120
Maximum Execution Time: 112
==========================================================
";
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn csv_rendering() {
    let mut out = Vec::new();
    sample_report().write_csv(&mut out).unwrap();
    let expected = "\
Parameter,Value
Trace_Prefix,app1
Set_Index_Bits,6
Associativity,2
Block_Bits,5
Block_Size_Bytes,32
Number_of_Sets,64
Cache_Size_KB_per_core,4.00
MESI_Protocol,Enabled
Write_Policy,Write-back Write-allocate
Replacement_Policy,LRU
Bus,Central snooping bus

Core,Total_Instructions,Reads,Writes,Total_Execution_Cycles,Idle_Cycles,Misses,Miss_Rate,Evictions,Writebacks,Invalidations,Data_Traffic
0,4,3,1,105,7,1,25.00,0,0,1,32
1,0,0,0,0,0,0,0.00,0,0,0,0

Overall_Bus_Summary,Value
Total_Bus_Transactions,2
Total_Bus_Traffic_Bytes,64
Total_Invalidations,1
Total_Cycles,120
Max_Execution_Time,112
";
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn json_rendering_matches_fields() {
    let json = sample_report().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["parameters"]["trace_prefix"], "app1");
    assert_eq!(value["parameters"]["num_sets"], 64);
    assert_eq!(value["cores"][0]["total_execution_cycles"], 105);
    assert_eq!(value["cores"][0]["miss_rate_percent"], 25.0);
    assert_eq!(value["cores"][1]["core_id"], 1);
    assert_eq!(value["summary"]["max_execution_time"], 112);
    assert_eq!(value["summary"]["total_bus_traffic_bytes"], 64);
}
