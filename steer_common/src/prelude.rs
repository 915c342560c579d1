//! Prelude module for common re-exports.
//!
//! ```rust
//! use steer_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::lateral::config::{ControllerConfig, LateralConfig, VehicleParams};

// ─── Tuning ─────────────────────────────────────────────────────────
pub use crate::lateral::tuning::{LateralTuning, TuningField, TuningSet, TuningSide, is_close};

// ─── Tick I/O ───────────────────────────────────────────────────────
pub use crate::lateral::state::{LateralDiagnostics, TickInput, TickOutput};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{
    ACCELERATION_DUE_TO_GRAVITY, DT_CTRL, JERK_THRESHOLD, LOW_SPEED_FACTOR, LR_SPLIT_PT,
    MIN_STEER_SPEED,
};
