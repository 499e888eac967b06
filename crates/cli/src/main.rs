//! MESI cache coherence simulator CLI.
//!
//! This binary runs one simulation over a set of per-core trace files. It performs:
//! 1. **Configuration:** Built-in defaults, optionally a JSON config file, then the cache
//!    geometry given on the command line.
//! 2. **Trace loading:** `<prefix>_proc<i>.trace` for every core; a missing file is fatal.
//! 3. **Reporting:** Text report on stdout, with optional CSV (`-o`) and JSON (`--json`) files.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mesisim_core::Simulator;
use mesisim_core::config::{Config, GeometryArgs};
use mesisim_core::sim::load_trace_set;
use mesisim_core::stats::{ReportParameters, SimReport};

#[derive(Parser, Debug)]
#[command(
    name = "mesisim",
    author,
    version,
    about = "MESI snooping-bus cache coherence simulator",
    long_about = "Replay per-core memory traces through private set-associative caches kept coherent by MESI over a single snooping bus.\n\nTrace files are <prefix>_proc0.trace .. <prefix>_proc3.trace, one `R|W <hex address>` per line.\n\nExamples:\n  mesisim -t app1 -s 6 -E 2 -b 5\n  mesisim -t app1 -s 6 -E 2 -b 5 -o app1.csv --json app1.json\n  mesisim -t app1 --config mesi.json -vv"
)]
struct Cli {
    /// Trace file prefix (reads <prefix>_proc<i>.trace).
    #[arg(short = 't', long = "trace")]
    trace_prefix: String,

    /// Set-index bits (the cache has 2^s sets).
    #[arg(short = 's', long = "set-bits", required_unless_present = "config")]
    set_index_bits: Option<u32>,

    /// Associativity (lines per set).
    #[arg(short = 'E', long = "ways", required_unless_present = "config")]
    associativity: Option<usize>,

    /// Block-offset bits (blocks are 2^b bytes).
    #[arg(short = 'b', long = "block-bits", required_unless_present = "config")]
    block_offset_bits: Option<u32>,

    /// Write the CSV report to this file.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// JSON configuration file; geometry flags override its `cache` section.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the JSON report to this file.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Verify MESI invariants after every completed bus transaction.
    #[arg(long)]
    check_coherence: bool,

    /// Abort if the run exceeds this many cycles.
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG` or the `-v` count.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Merges the JSON file (if any) and the command-line flags over the defaults.
///
/// Each of `s`, `E`, and `b` must come from a flag or from the file's `cache` section;
/// flags win when both give one.
fn build_config(cli: &Cli) -> Result<Config, String> {
    let (mut config, file_geometry) = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
            let config = Config::from_json(&text).map_err(|e| e.to_string())?;
            let geometry = GeometryArgs::from_json(&text).map_err(|e| e.to_string())?;
            (config, geometry)
        }
        None => (Config::default(), GeometryArgs::default()),
    };

    let flags = GeometryArgs {
        set_index_bits: cli.set_index_bits,
        associativity: cli.associativity,
        block_offset_bits: cli.block_offset_bits,
    };
    config.cache = flags
        .or(file_geometry)
        .resolve()
        .map_err(|e| e.to_string())?;

    if cli.check_coherence {
        config.general.check_coherence = true;
    }
    if cli.max_cycles.is_some() {
        config.general.max_cycles = cli.max_cycles;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = build_config(cli)?;
    let traces =
        load_trace_set(&cli.trace_prefix, config.general.cores).map_err(|e| e.to_string())?;

    let mut sim = Simulator::new(&config, traces).map_err(|e| e.to_string())?;
    let _ = sim.run().map_err(|e| e.to_string())?;

    let report = sim.report(ReportParameters::new(&cli.trace_prefix, &config.cache));
    let stdout = io::stdout();
    let mut out = stdout.lock();
    report
        .write_text(&mut out)
        .and_then(|()| out.flush())
        .map_err(|e| format!("cannot write report: {e}"))?;

    if let Some(path) = &cli.output {
        write_csv(path, &report)?;
    }
    if let Some(path) = &cli.json {
        let json = report
            .to_json()
            .map_err(|e| format!("cannot serialize report: {e}"))?;
        fs::write(path, json + "\n")
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    }
    Ok(())
}

fn write_csv(path: &Path, report: &SimReport) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("cannot create {}: {e}", path.display()))?;
    let mut writer = BufWriter::new(file);
    report
        .write_csv(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| format!("cannot write {}: {e}", path.display()))
}
