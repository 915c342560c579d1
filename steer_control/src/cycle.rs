//! Fixed-rate control cycle: sense → control → actuate.
//!
//! Drives a [`TorqueController`] against the closed-loop [`Simulation`] at
//! the control rate, polling the configuration file for `[tuning]`
//! changes and optionally streaming diagnostics as JSON lines.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` to an isolated core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! Without the `rt` feature every step is a no-op and pacing uses
//! `std::thread::sleep`.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::Serialize;
use steer_common::consts::{CYCLE_TIME_US, DT_CTRL};
use steer_common::lateral::config::LateralConfig;
use steer_common::lateral::state::{LateralDiagnostics, TickInput, TickOutput};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ConfigWatcher, ReloadResult, atomic_tuning_swap};
use crate::control::torque::TorqueController;
use crate::sim::Simulation;
use crate::vehicle::VehicleModel;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles whose body exceeded the period.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
        if duration_ns > CYCLE_TIME_US as i64 * 1000 {
            self.overruns += 1;
        }
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Diagnostics sink failed.
    #[error("diagnostics output error: {0}")]
    Output(String),
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the loop does not fault it in.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup. Call once before [`CycleRunner::run`].
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Run Options / Summary ──────────────────────────────────────────

/// Loop behaviour.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Stop after this many ticks (`None` = until stopped).
    pub max_ticks: Option<u64>,
    /// Pace ticks at [`DT_CTRL`]; otherwise run as fast as possible.
    pub realtime: bool,
    /// Config poll period [ticks]; 0 disables hot reload.
    pub reload_interval: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_ticks: None,
            realtime: true,
            reload_interval: 100,
        }
    }
}

/// Aggregate results of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub engaged_ticks: u64,
    pub saturated_ticks: u64,
    pub right_tune_ticks: u64,
    pub max_abs_torque: f64,
    /// RMS lateral-acceleration tracking error over engaged ticks.
    pub rms_lateral_accel_error: f64,
    pub reloads_applied: u64,
    pub reloads_rejected: u64,
    #[serde(skip)]
    sum_sq_accel_error: f64,
}

impl RunSummary {
    fn observe(&mut self, out: &TickOutput) {
        self.ticks += 1;
        let d = &out.diagnostics;
        if !d.active {
            return;
        }
        self.engaged_ticks += 1;
        self.saturated_ticks += u64::from(d.saturated);
        self.right_tune_ticks += u64::from(d.using_right_tune);
        self.max_abs_torque = self.max_abs_torque.max(out.torque.abs());
        let e = d.desired_lateral_accel - d.actual_lateral_accel;
        self.sum_sq_accel_error += e * e;
        self.rms_lateral_accel_error =
            (self.sum_sq_accel_error / self.engaged_ticks as f64).sqrt();
    }
}

/// One JSON line of the diagnostics stream.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiagnosticsLine<'a> {
    tick: u64,
    t: f64,
    torque: f64,
    steering_angle_deg: f64,
    desired_curvature: f64,
    #[serde(flatten)]
    diagnostics: &'a LateralDiagnostics,
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the controller, the live configuration and the simulation.
pub struct CycleRunner {
    config: LateralConfig,
    controller: TorqueController<VehicleModel>,
    sim: Simulation,
    watcher: Option<ConfigWatcher>,
    diag_sink: Option<Box<dyn Write + Send>>,
    stop: Arc<AtomicBool>,
    options: RunOptions,
    stats: CycleStats,
    summary: RunSummary,
    was_active: bool,
}

impl CycleRunner {
    pub fn new(config: LateralConfig, sim: Simulation, options: RunOptions) -> Self {
        let controller = TorqueController::from_config(&config);
        Self {
            config,
            controller,
            sim,
            watcher: None,
            diag_sink: None,
            stop: Arc::new(AtomicBool::new(false)),
            options,
            stats: CycleStats::new(),
            summary: RunSummary::default(),
            was_active: false,
        }
    }

    /// Enable hot reload from `watcher`.
    pub fn with_watcher(mut self, watcher: ConfigWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Stream per-tick diagnostics to `sink` as JSON lines.
    pub fn with_diagnostics(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.diag_sink = Some(sink);
        self
    }

    /// Flag that stops the loop at the next tick boundary.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    #[inline]
    pub fn config(&self) -> &LateralConfig {
        &self.config
    }

    #[inline]
    pub fn controller(&self) -> &TorqueController<VehicleModel> {
        &self.controller
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Run until the tick budget is spent or the stop flag is raised.
    pub fn run(&mut self) -> Result<RunSummary, CycleError> {
        info!(
            service = %self.config.shared.service_name,
            max_ticks = ?self.options.max_ticks,
            realtime = self.options.realtime,
            split_tune = self.config.tuning.split_tune,
            "control loop starting"
        );

        let mut pacer = Pacer::new()?;
        let mut tick: u64 = 0;

        while !self.stop.load(Ordering::Relaxed)
            && self.options.max_ticks.is_none_or(|max| tick < max)
        {
            let start = Instant::now();
            self.cycle_body(tick)?;
            let duration_ns = start.elapsed().as_nanos() as i64;

            let latency_ns = if self.options.realtime {
                pacer.wait()?
            } else {
                0
            };
            self.stats.record(duration_ns, latency_ns);
            tick += 1;
        }

        if let Some(sink) = self.diag_sink.as_mut() {
            sink.flush()
                .map_err(|e| CycleError::Output(e.to_string()))?;
        }

        info!(
            ticks = self.summary.ticks,
            engaged = self.summary.engaged_ticks,
            saturated = self.summary.saturated_ticks,
            rms_error = self.summary.rms_lateral_accel_error,
            avg_cycle_ns = self.stats.avg_cycle_ns(),
            max_cycle_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            "control loop stopped"
        );
        Ok(self.summary)
    }

    /// Sense → control → actuate for one tick.
    fn cycle_body(&mut self, tick: u64) -> Result<(), CycleError> {
        if self.options.reload_interval > 0 && tick % self.options.reload_interval == 0 {
            self.poll_reload();
        }

        let input = self.sim.input();
        if input.active != self.was_active {
            info!(active = input.active, t = self.sim.time(), "engagement changed");
            self.was_active = input.active;
        }

        let out = self.controller.update(&input, &self.config.tuning);
        self.summary.observe(&out);

        if self.diag_sink.is_some() {
            self.emit(tick, &input, &out)?;
        }

        self.sim.advance(out.torque, DT_CTRL);
        Ok(())
    }

    fn poll_reload(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        match watcher.poll() {
            Ok(None) => {}
            Ok(Some(content)) => match atomic_tuning_swap(&mut self.config, &content) {
                ReloadResult::Success(fields) => {
                    self.summary.reloads_applied += 1;
                    info!(
                        fields = ?fields,
                        split_tune = self.config.tuning.split_tune,
                        "tuning reloaded"
                    );
                }
                ReloadResult::Unchanged => debug!("config touched, tuning unchanged"),
                ReloadResult::ValidationFailed(reason) => {
                    self.summary.reloads_rejected += 1;
                    warn!(%reason, "tuning reload rejected, keeping active config");
                }
            },
            Err(e) => warn!(error = %e, "config poll failed"),
        }
    }

    fn emit(&mut self, tick: u64, input: &TickInput, out: &TickOutput) -> Result<(), CycleError> {
        let Some(sink) = self.diag_sink.as_mut() else {
            return Ok(());
        };
        let line = DiagnosticsLine {
            tick,
            t: self.sim.time(),
            torque: out.torque,
            steering_angle_deg: input.steering_angle_deg,
            desired_curvature: input.desired_curvature,
            diagnostics: &out.diagnostics,
        };
        serde_json::to_writer(&mut *sink, &line)
            .map_err(|e| CycleError::Output(e.to_string()))?;
        sink.write_all(b"\n")
            .map_err(|e| CycleError::Output(e.to_string()))
    }
}

// ─── Pacing ─────────────────────────────────────────────────────────

/// Absolute-deadline pacing at the control rate.
#[cfg(feature = "rt")]
struct Pacer {
    next_wake: nix::sys::time::TimeSpec,
}

#[cfg(feature = "rt")]
impl Pacer {
    fn new() -> Result<Self, CycleError> {
        use nix::time::{ClockId, clock_gettime};
        let next_wake = clock_gettime(ClockId::CLOCK_MONOTONIC)
            .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
        Ok(Self { next_wake })
    }

    /// Sleep until the next period boundary; returns wake latency [ns].
    fn wait(&mut self) -> Result<i64, CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};
        let clock = ClockId::CLOCK_MONOTONIC;
        self.next_wake = timespec_add_ns(self.next_wake, CYCLE_TIME_US as i64 * 1000);
        let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &self.next_wake);
        let now = clock_gettime(clock)
            .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
        Ok(timespec_diff_ns(&now, &self.next_wake).abs())
    }
}

/// Sleep-based pacing at the control rate.
#[cfg(not(feature = "rt"))]
struct Pacer {
    next_wake: Instant,
}

#[cfg(not(feature = "rt"))]
impl Pacer {
    fn new() -> Result<Self, CycleError> {
        Ok(Self {
            next_wake: Instant::now(),
        })
    }

    fn wait(&mut self) -> Result<i64, CycleError> {
        self.next_wake += std::time::Duration::from_micros(CYCLE_TIME_US);
        let now = Instant::now();
        if let Some(remaining) = self.next_wake.checked_duration_since(now) {
            std::thread::sleep(remaining);
        } else {
            // Fell behind; restart the schedule from now.
            self.next_wake = now;
        }
        let late = Instant::now().saturating_duration_since(self.next_wake);
        Ok(late.as_nanos() as i64)
    }
}

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
