//! Per-tick input and output records of the torque controller.

use serde::{Deserialize, Serialize};

/// Vehicle and planner state consumed once per control tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TickInput {
    /// Lateral control engaged.
    pub active: bool,
    /// Vehicle speed [m/s].
    pub v_ego: f64,
    /// Steering wheel angle [deg].
    pub steering_angle_deg: f64,
    /// Driver is applying torque to the wheel.
    pub steering_pressed: bool,
    /// Upstream is rate-limiting steering commands.
    pub steering_rate_limited: bool,
    /// Calibrated yaw rate (z axis) [rad/s].
    pub yaw_rate: f64,
    /// Road roll [rad].
    pub roll: f64,
    /// Steering angle calibration offset [deg].
    pub angle_offset_deg: f64,
    /// Planner curvature [1/m].
    pub desired_curvature: f64,
    /// Planner curvature rate [1/(m·s)].
    pub desired_curvature_rate: f64,
}

/// Internal terms reported each tick for telemetry.
///
/// Field names and meanings are consumed downstream; keep them stable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LateralDiagnostics {
    pub active: bool,
    pub using_right_tune: bool,
    pub error: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub f: f64,
    /// Torque command as returned to the caller.
    pub output: f64,
    pub saturated: bool,
    pub actual_lateral_accel: f64,
    pub desired_lateral_accel: f64,
}

/// Result of one controller tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOutput {
    /// Signed torque command, `|torque| <= steer_max`.
    pub torque: f64,
    /// Angle-domain output; always 0.0 for the torque controller.
    pub angle: f64,
    pub diagnostics: LateralDiagnostics,
}

impl TickOutput {
    /// Disengaged output: zero torque, inactive diagnostics.
    #[inline]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Returns true if torque and all diagnostic terms are finite.
    pub fn is_finite(&self) -> bool {
        let d = &self.diagnostics;
        self.torque.is_finite()
            && d.error.is_finite()
            && d.p.is_finite()
            && d.i.is_finite()
            && d.d.is_finite()
            && d.f.is_finite()
            && d.actual_lateral_accel.is_finite()
            && d.desired_lateral_accel.is_finite()
    }
}
