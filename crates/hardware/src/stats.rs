//! Simulation statistics collection and reporting.
//!
//! This module tracks the counters of a coherence run. It provides:
//! 1. **Per-core counters:** Reads, writes, hits, misses, evictions, write-backs,
//!    invalidations, busy and idle cycles, and data traffic.
//! 2. **Bus counters:** Transactions, traffic bytes, and invalidation broadcasts.
//! 3. **Reports:** A snapshot (`SimReport`) rendered as text, CSV, or JSON with identical values.

use std::io::{self, Write};

use serde::Serialize;

use crate::config::CacheConfig;

/// Counters kept by one core and its cache. All are monotonically increasing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoreStats {
    /// Loads in the trace.
    pub reads: u64,
    /// Stores in the trace.
    pub writes: u64,
    /// Accesses that completed in the cache (including Shared-write upgrades).
    pub hits: u64,
    /// Accesses whose request was accepted by the bus.
    pub misses: u64,
    /// Valid lines displaced by an install.
    pub evictions: u64,
    /// Dirty blocks written back (snoop flushes and dirty evictions).
    pub writebacks: u64,
    /// Invalidations issued (upgrades) or received (snoops).
    pub invalidations: u64,
    /// Cycles spent waiting for the bus.
    pub idle_cycles: u64,
    /// Cycles spent executing or stalled on a bus transfer.
    pub busy_cycles: u64,
    /// Bytes of block data moved into or out of this cache.
    pub data_traffic_bytes: u64,
}

impl CoreStats {
    /// Hits plus misses.
    pub const fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Miss rate in percent; 0 when there were no accesses.
    pub fn miss_rate(&self) -> f64 {
        match self.accesses() {
            0 => 0.0,
            n => self.misses as f64 / n as f64 * 100.0,
        }
    }

    /// Busy plus idle cycles.
    pub const fn execution_time(&self) -> u64 {
        self.busy_cycles + self.idle_cycles
    }
}

/// System-wide bus counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Requests accepted by the bus (misses and invalidations).
    pub transactions: u64,
    /// Bytes of block data carried by the bus.
    pub traffic_bytes: u64,
    /// Invalidation broadcasts.
    pub invalidations: u64,
}

/// Fixed protocol description lines: text label, CSV key, value.
const PROTOCOL: [(&str, &str, &str); 4] = [
    ("MESI Protocol", "MESI_Protocol", "Enabled"),
    ("Write Policy", "Write_Policy", "Write-back Write-allocate"),
    ("Replacement Policy", "Replacement_Policy", "LRU"),
    ("Bus", "Bus", "Central snooping bus"),
];

/// Run parameters echoed at the top of a report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportParameters {
    /// Trace file prefix.
    pub trace_prefix: String,
    /// Set-index bits (`s`).
    pub set_index_bits: u32,
    /// Lines per set (`E`).
    pub associativity: usize,
    /// Block-offset bits (`b`).
    pub block_offset_bits: u32,
    /// Block size in bytes.
    pub block_bytes: usize,
    /// Number of sets.
    pub num_sets: usize,
    /// Capacity of one cache in KiB.
    pub cache_kb_per_core: f64,
}

impl ReportParameters {
    /// Builds the parameter block for `trace_prefix` and a cache geometry.
    pub fn new(trace_prefix: impl Into<String>, cache: &CacheConfig) -> Self {
        Self {
            trace_prefix: trace_prefix.into(),
            set_index_bits: cache.set_index_bits,
            associativity: cache.associativity,
            block_offset_bits: cache.block_offset_bits,
            block_bytes: cache.block_bytes(),
            num_sets: cache.num_sets(),
            cache_kb_per_core: cache.size_bytes() as f64 / 1024.0,
        }
    }
}

/// Per-core section of a report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CoreReport {
    /// Core index.
    pub core_id: usize,
    /// Reads plus writes.
    pub total_instructions: u64,
    /// Loads in the trace.
    pub reads: u64,
    /// Stores in the trace.
    pub writes: u64,
    /// Busy cycles.
    pub total_execution_cycles: u64,
    /// Cycles spent waiting for the bus.
    pub idle_cycles: u64,
    /// Bus-accepted misses.
    pub misses: u64,
    /// Miss rate in percent, rounded to two decimals.
    pub miss_rate_percent: f64,
    /// Valid lines evicted.
    pub evictions: u64,
    /// Dirty blocks written back.
    pub writebacks: u64,
    /// Invalidations issued or received.
    pub invalidations: u64,
    /// Bytes moved into or out of the cache.
    pub data_traffic_bytes: u64,
}

impl CoreReport {
    fn from_stats(core_id: usize, stats: &CoreStats) -> Self {
        Self {
            core_id,
            total_instructions: stats.reads + stats.writes,
            reads: stats.reads,
            writes: stats.writes,
            total_execution_cycles: stats.busy_cycles,
            idle_cycles: stats.idle_cycles,
            misses: stats.misses,
            miss_rate_percent: (stats.miss_rate() * 100.0).round() / 100.0,
            evictions: stats.evictions,
            writebacks: stats.writebacks,
            invalidations: stats.invalidations,
            data_traffic_bytes: stats.data_traffic_bytes,
        }
    }
}

/// System totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SystemSummary {
    /// Requests accepted by the bus.
    pub total_bus_transactions: u64,
    /// Bytes carried by the bus.
    pub total_bus_traffic_bytes: u64,
    /// Invalidation broadcasts.
    pub total_invalidations: u64,
    /// Global cycles simulated.
    pub total_cycles: u64,
    /// Largest busy-plus-idle time over all cores.
    pub max_execution_time: u64,
}

/// Snapshot of a finished (or stopped) run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimReport {
    /// Run parameters.
    pub parameters: ReportParameters,
    /// One record per core, in core order.
    pub cores: Vec<CoreReport>,
    /// System totals.
    pub summary: SystemSummary,
}

const RULE: &str = "==========================================================";
const SEPARATOR: &str = "----------------------------------------------------------";

impl SimReport {
    /// Builds a report from per-core and bus counters.
    ///
    /// # Arguments
    ///
    /// * `parameters` - Run parameters to echo
    /// * `cores` - Per-core counters, in core order
    /// * `bus` - Bus counters
    /// * `total_cycles` - Global cycle count
    pub fn new<'a>(
        parameters: ReportParameters,
        cores: impl IntoIterator<Item = &'a CoreStats>,
        bus: &BusStats,
        total_cycles: u64,
    ) -> Self {
        let cores: Vec<CoreReport> = cores
            .into_iter()
            .enumerate()
            .map(|(id, stats)| CoreReport::from_stats(id, stats))
            .collect();
        let max_execution_time = cores
            .iter()
            .map(|c| c.total_execution_cycles + c.idle_cycles)
            .max()
            .unwrap_or(0);

        Self {
            parameters,
            cores,
            summary: SystemSummary {
                total_bus_transactions: bus.transactions,
                total_bus_traffic_bytes: bus.traffic_bytes,
                total_invalidations: bus.invalidations,
                total_cycles,
                max_execution_time,
            },
        }
    }

    /// Writes the human-readable report.
    ///
    /// # Errors
    ///
    /// Propagates any I/O error from `out`.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let p = &self.parameters;
        writeln!(out, "{RULE}")?;
        writeln!(out, "MESI CACHE COHERENCE SIMULATION")?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "Simulation Parameters:")?;
        writeln!(out, "Trace Prefix: {}", p.trace_prefix)?;
        writeln!(out, "Set Index Bits: {}", p.set_index_bits)?;
        writeln!(out, "Associativity: {}", p.associativity)?;
        writeln!(out, "Block Bits: {}", p.block_offset_bits)?;
        writeln!(out, "Block Size (Bytes): {}", p.block_bytes)?;
        writeln!(out, "Number of Sets: {}", p.num_sets)?;
        writeln!(out, "Cache Size (KB per core): {:.2}", p.cache_kb_per_core)?;
        for (label, _, value) in PROTOCOL {
            writeln!(out, "{label}: {value}")?;
        }

        for c in &self.cores {
            writeln!(out, "{SEPARATOR}")?;
            writeln!(out, "Core {} Statistics:", c.core_id)?;
            writeln!(out, "Total Instructions: {}", c.total_instructions)?;
            writeln!(out, "Total Reads: {}", c.reads)?;
            writeln!(out, "Total Writes: {}", c.writes)?;
            writeln!(out, "Total Execution Cycles: {}", c.total_execution_cycles)?;
            writeln!(out, "Idle Cycles: {}", c.idle_cycles)?;
            writeln!(out, "Cache Misses: {}", c.misses)?;
            writeln!(out, "Cache Miss Rate: {:.2}%", c.miss_rate_percent)?;
            writeln!(out, "Cache Evictions: {}", c.evictions)?;
            writeln!(out, "Writebacks: {}", c.writebacks)?;
            writeln!(out, "Bus Invalidations: {}", c.invalidations)?;
            writeln!(out, "Data Traffic (Bytes): {}", c.data_traffic_bytes)?;
        }

        let s = &self.summary;
        writeln!(out, "{SEPARATOR}")?;
        writeln!(out, "Overall Bus Summary:")?;
        writeln!(out, "Total Bus Transactions: {}", s.total_bus_transactions)?;
        writeln!(out, "Total Bus Traffic (Bytes): {}", s.total_bus_traffic_bytes)?;
        writeln!(out, "Total Invalidation Broadcasts: {}", s.total_invalidations)?;
        writeln!(out, "Simulated Cycles: {}", s.total_cycles)?;
        writeln!(out, "Maximum Execution Time: {}", s.max_execution_time)?;
        writeln!(out, "{RULE}")
    }

    /// Writes the report as three CSV tables (parameters, cores, summary).
    ///
    /// # Errors
    ///
    /// Propagates any I/O error from `out`.
    pub fn write_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let p = &self.parameters;
        writeln!(out, "Parameter,Value")?;
        writeln!(out, "Trace_Prefix,{}", p.trace_prefix)?;
        writeln!(out, "Set_Index_Bits,{}", p.set_index_bits)?;
        writeln!(out, "Associativity,{}", p.associativity)?;
        writeln!(out, "Block_Bits,{}", p.block_offset_bits)?;
        writeln!(out, "Block_Size_Bytes,{}", p.block_bytes)?;
        writeln!(out, "Number_of_Sets,{}", p.num_sets)?;
        writeln!(out, "Cache_Size_KB_per_core,{:.2}", p.cache_kb_per_core)?;
        for (_, key, value) in PROTOCOL {
            writeln!(out, "{key},{value}")?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "Core,Total_Instructions,Reads,Writes,Total_Execution_Cycles,Idle_Cycles,Misses,\
             Miss_Rate,Evictions,Writebacks,Invalidations,Data_Traffic"
        )?;
        for c in &self.cores {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{:.2},{},{},{},{}",
                c.core_id,
                c.total_instructions,
                c.reads,
                c.writes,
                c.total_execution_cycles,
                c.idle_cycles,
                c.misses,
                c.miss_rate_percent,
                c.evictions,
                c.writebacks,
                c.invalidations,
                c.data_traffic_bytes
            )?;
        }

        let s = &self.summary;
        writeln!(out)?;
        writeln!(out, "Overall_Bus_Summary,Value")?;
        writeln!(out, "Total_Bus_Transactions,{}", s.total_bus_transactions)?;
        writeln!(out, "Total_Bus_Traffic_Bytes,{}", s.total_bus_traffic_bytes)?;
        writeln!(out, "Total_Invalidations,{}", s.total_invalidations)?;
        writeln!(out, "Total_Cycles,{}", s.total_cycles)?;
        writeln!(out, "Max_Execution_Time,{}", s.max_execution_time)
    }

    /// Renders the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error (not expected for these plain types).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
