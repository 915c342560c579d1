//! # Lateral Torque Controller
//!
//! Runs the torque controller in closed loop against a simulated vehicle at
//! 100 Hz. The `[tuning]` table of the configuration file is re-read while
//! running; per-tick diagnostics can be written as JSON lines.

use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use steer_common::config::LogLevel;
use steer_common::consts::DEFAULT_CONFIG_PATH;
use steer_common::lateral::config::LateralConfig;
use steer_control::config::{ConfigWatcher, load_config};
use steer_control::cycle::{CycleRunner, RunOptions, rt_setup};
use steer_control::sim::{PlantParams, Scenario, Simulation, SteeringPlant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Lateral torque controller - closed-loop simulation runner
#[derive(Parser, Debug)]
#[command(name = "steer_control")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Lateral steering torque controller with split tuning")]
struct Args {
    /// Path to the lateral configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after this many ticks (default: run until Ctrl-C).
    #[arg(long)]
    ticks: Option<u64>,

    /// Simulated vehicle speed [m/s].
    #[arg(long, default_value_t = 20.0)]
    speed: f64,

    /// Desired curvature amplitude [1/m].
    #[arg(long, default_value_t = 0.001)]
    amplitude: f64,

    /// Run as fast as possible instead of pacing at 100 Hz.
    #[arg(long)]
    no_realtime: bool,

    /// Config poll period in ticks (0 disables hot reload).
    #[arg(long, default_value_t = 100)]
    reload_interval: u64,

    /// Write per-tick diagnostics as JSON lines to this file.
    #[arg(long, value_name = "FILE")]
    diag_out: Option<PathBuf>,

    /// CPU core to pin the loop to (default: 1).
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
    let loaded = load_config(&args.config);
    setup_tracing(&args, loaded.as_ref().ok().map(|c| c.shared.log_level));

    info!("steer_control v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = match loaded {
        Ok(config) => run(&args, config),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("steer_control shutdown complete");
}

fn run(args: &Args, config: LateralConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        config = %args.config.display(),
        steer_max = config.controller.steer_max,
        split_tune = config.tuning.split_tune,
        "config OK"
    );

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(cpu_core = args.cpu_core, priority = args.rt_priority, "RT setup complete");

    let scenario = Scenario {
        speed: args.speed,
        amplitude: args.amplitude,
        ..Scenario::default()
    };
    let sim = Simulation::new(
        SteeringPlant::new(PlantParams::default(), config.vehicle),
        scenario,
    );
    let options = RunOptions {
        max_ticks: args.ticks,
        realtime: !args.no_realtime,
        reload_interval: args.reload_interval,
    };

    let mut runner =
        CycleRunner::new(config, sim, options).with_watcher(ConfigWatcher::new(args.config.clone()));
    if let Some(ref path) = args.diag_out {
        let file = File::create(path)?;
        runner = runner.with_diagnostics(Box::new(BufWriter::new(file)));
        info!(path = %path.display(), "writing diagnostics");
    }

    let stop = runner.stop_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        stop.store(true, Ordering::SeqCst);
    })?;

    let summary = runner.run()?;
    info!(
        engaged_ticks = summary.engaged_ticks,
        saturated_ticks = summary.saturated_ticks,
        right_tune_ticks = summary.right_tune_ticks,
        max_abs_torque = summary.max_abs_torque,
        rms_lateral_accel_error = summary.rms_lateral_accel_error,
        reloads_applied = summary.reloads_applied,
        reloads_rejected = summary.reloads_rejected,
        "run summary"
    );

    Ok(())
}

fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        configured.unwrap_or_default()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
