//! # ECU Control Unit
//!
//! Runs the drive-control core against JSON-lines telemetry.
//!
//! Reads one `CycleInput` per line from `--input` (or stdin), steps the
//! drive state machine once per line, and writes actuator commands and
//! fault reports as JSON lines to stdout. Logs go to stderr.
//!
//! The tune is flashed from the `[tune]` table of the configuration file.
//! Without a valid tune the car stays in `ECU_FLASH`.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use ecu_control_unit::config::{check_tune, load_config, TuneStatus};
use ecu_control_unit::cycle::{rt_setup, CycleRunner};
use ecu_control_unit::io::{JsonLinesSink, JsonLinesTelemetry};
use ecu_control_unit::state::DriveStateMachine;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// ECU Control Unit: drive-control core
#[derive(Parser, Debug)]
#[command(name = "ecu_control_unit")]
#[command(version)]
#[command(about = "Startup sequencing, torque delivery and safety interlocks for the main ECU")]
struct Args {
    /// Path to the ECU configuration TOML.
    #[arg(long, default_value = "config/ecu.toml")]
    config: PathBuf,

    /// JSON-lines telemetry file (default: stdin).
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Pace cycles at the configured cycle time instead of replaying at full speed.
    #[arg(long)]
    realtime: bool,

    /// CPU core to pin the RT thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("ECU Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("ECU Control Unit shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;

    let mut machine = DriveStateMachine::new(&config);
    if let TuneStatus::Valid(tune) = check_tune(&config) {
        machine.flash_tune(tune)?;
    }

    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            info!("Reading telemetry from {}", path.display());
            Box::new(BufReader::new(File::open(path)?))
        }
        None => {
            info!("Reading telemetry from stdin");
            Box::new(io::stdin().lock())
        }
    };
    let telemetry = JsonLinesTelemetry::new(input);
    let output = JsonLinesSink::new(io::stdout().lock());

    if args.realtime {
        rt_setup(args.cpu_core, args.rt_priority)?;
    }

    let mut runner = CycleRunner::new(&config, machine, telemetry, output).with_realtime(args.realtime);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    info!("Entering control loop");
    runner.run(&running)?;

    Ok(())
}

/// Setup tracing subscriber based on CLI arguments. Logs go to stderr so
/// stdout stays a clean JSON-lines stream.
fn setup_tracing(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .compact()
            .init();
    }
}
