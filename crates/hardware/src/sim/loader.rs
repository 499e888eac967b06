//! Trace file loading.
//!
//! This module turns per-core trace files into instruction sequences. It performs:
//! 1. **Parsing:** One `<op> <hex-address>` pair per line, `op` being `R` or `W`; the `0x`
//!    prefix is optional and blank lines are ignored.
//! 2. **Recovery:** Lines with an unknown op or an unparsable address are skipped with a
//!    warning; the rest of the file still loads.
//! 3. **Trace sets:** `<prefix>_proc<i>.trace` for every core, all opened before any
//!    simulation state is built.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::common::TraceError;
use crate::core::Instruction;

/// One core's instructions, in program order.
pub type Trace = Vec<Instruction>;

/// Parses trace text.
///
/// # Arguments
///
/// * `text` - Trace contents
/// * `source` - Name used in warnings (usually the file path)
///
/// # Returns
///
/// Every well-formed instruction, in order.
pub fn parse_trace(text: &str, source: &str) -> Trace {
    let mut trace = Trace::new();
    for (n, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(op) = fields.next() else {
            continue;
        };
        let is_write = match op {
            "R" => false,
            "W" => true,
            other => {
                tracing::warn!(source, line = n + 1, op = other, "skipping invalid operation");
                continue;
            }
        };
        let Some(address) = fields.next().and_then(parse_hex) else {
            tracing::warn!(source, line = n + 1, "skipping line with invalid address");
            continue;
        };
        trace.push(if is_write {
            Instruction::write(address)
        } else {
            Instruction::read(address)
        });
    }
    trace
}

fn parse_hex(token: &str) -> Option<u32> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(digits, 16).ok()
}

/// Loads and parses one trace file.
///
/// # Errors
///
/// * `TraceError::Open` - the file does not exist or cannot be opened
/// * `TraceError::Read` - the file is not readable text
pub fn load_trace(path: &Path) -> Result<Trace, TraceError> {
    let file = File::open(path).map_err(|source| TraceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let text = io::read_to_string(file).map_err(|source| TraceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let trace = parse_trace(&text, &path.display().to_string());
    tracing::debug!(path = %path.display(), instructions = trace.len(), "loaded trace");
    Ok(trace)
}

/// Trace file names for a run: `<prefix>_proc0.trace` through `<prefix>_proc{cores-1}.trace`.
pub fn trace_paths(prefix: &str, cores: usize) -> Vec<PathBuf> {
    (0..cores)
        .map(|i| PathBuf::from(format!("{prefix}_proc{i}.trace")))
        .collect()
}

/// Loads the trace of every core.
///
/// Every file is opened before any is parsed, so a missing trace fails fast.
///
/// # Errors
///
/// Returns the first `TraceError` encountered, in core order.
pub fn load_trace_set(prefix: &str, cores: usize) -> Result<Vec<Trace>, TraceError> {
    let paths = trace_paths(prefix, cores);
    for path in &paths {
        let _ = File::open(path).map_err(|source| TraceError::Open {
            path: path.clone(),
            source,
        })?;
    }
    paths.iter().map(|p| load_trace(p)).collect()
}
