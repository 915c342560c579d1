//! System-wide constants for the lateral steering workspace.
//!
//! Single source of truth for control-law constants and parameter bounds.
//! Imported by all crates; do not duplicate these values elsewhere.

use static_assertions::const_assert;

// ─── Loop Timing ────────────────────────────────────────────────────

/// Control loop rate [Hz].
pub const CONTROL_RATE_HZ: f64 = 100.0;

/// Control loop period [s].
pub const DT_CTRL: f64 = 1.0 / CONTROL_RATE_HZ;

/// Control loop period in microseconds.
pub const CYCLE_TIME_US: u64 = 10_000;

// ─── Control Law ────────────────────────────────────────────────────

/// Below this speed [m/s] no steering torque is commanded.
pub const MIN_STEER_SPEED: f64 = 0.3;

/// Curvature weight added to lateral acceleration in the error term
/// [m/s² per 1/m]. Dominates when v² is small.
pub const LOW_SPEED_FACTOR: f64 = 200.0;

/// Lateral jerk [m/s³] at which friction compensation saturates.
pub const JERK_THRESHOLD: f64 = 0.2;

/// Desired curvature [1/m] at or above which the right-turn tune is used.
pub const LR_SPLIT_PT: f64 = 0.0002;

/// Gravity used by the roll terms [m/s²].
pub const ACCELERATION_DUE_TO_GRAVITY: f64 = 9.8;

/// Headroom [torque units] below `steer_max` that counts as "at the limit".
pub const SATURATION_MARGIN: f64 = 1e-3;

/// Saturation is only accumulated above this speed [m/s].
pub const SATURATION_MIN_SPEED: f64 = 10.0;

// ─── Parameter Bounds ───────────────────────────────────────────────

/// Default normalized torque limit.
pub const STEER_MAX_DEFAULT: f64 = 1.0;
pub const STEER_MAX_MIN: f64 = 1e-2;
pub const STEER_MAX_MAX: f64 = 1e4;

/// Default time [s] of sustained saturation before it is reported.
pub const STEER_LIMIT_TIMER_DEFAULT: f64 = 0.4;
pub const STEER_LIMIT_TIMER_MIN: f64 = 0.0;
pub const STEER_LIMIT_TIMER_MAX: f64 = 1.0;

/// Upper bound for any single PID gain.
pub const GAIN_MAX: f64 = 1e3;

/// `kf` must stay strictly positive (friction is divided by it).
pub const KF_MIN: f64 = 1e-6;

/// Upper bound for friction compensation [torque units].
pub const FRICTION_MAX: f64 = 10.0;

/// Relative tolerance used when comparing tuning values (9 significant digits).
pub const GAIN_REL_TOLERANCE: f64 = 1e-9;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/lateral.toml";

const_assert!(JERK_THRESHOLD > 0.0);
const_assert!(LR_SPLIT_PT > 0.0);
const_assert!(MIN_STEER_SPEED > 0.0);
const_assert!(SATURATION_MIN_SPEED > MIN_STEER_SPEED);
const_assert!(STEER_MAX_MIN > SATURATION_MARGIN);
