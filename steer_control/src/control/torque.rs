//! Lateral torque controller.
//!
//! Converts desired curvature into a steering torque command by closing the
//! loop on lateral acceleration. A low-speed term adds curvature error so
//! that tracking still registers when `v²` is small.
//!
//! Per tick:
//! 1. Gate on engagement and [`MIN_STEER_SPEED`].
//! 2. Measure curvature (steering angle through the [`CurvatureModel`], or
//!    yaw rate over speed).
//! 3. Select the live tuning set ([`SplitTune`]).
//! 4. Error, feedforward and friction compensation.
//! 5. PID step, boundary sign inversion, saturation check.

use steer_common::consts::{LOW_SPEED_FACTOR, MIN_STEER_SPEED, SATURATION_MARGIN};
use steer_common::lateral::config::{ControllerConfig, LateralConfig};
use steer_common::lateral::state::{LateralDiagnostics, TickInput, TickOutput};
use steer_common::lateral::tuning::{LateralTuning, TuningSet};

use super::feedforward::{SteerFeedforwardFn, default_steer_feedforward, lateral_feedforward};
use super::pid::{PidController, PidStep};
use super::saturation::{SaturationContext, SaturationMonitor};
use crate::tuning::{SplitTune, pid_gains};
use crate::vehicle::{CurvatureModel, VehicleModel};

/// Torque-domain lateral controller.
///
/// One instance per control loop; not shared across threads.
pub struct TorqueController<M: CurvatureModel> {
    pid: PidController,
    tune: SplitTune,
    saturation: SaturationMonitor,
    steer_max: f64,
    model: M,
    /// Vehicle feedforward shaping. Held for callers; the tick path uses
    /// the lateral-acceleration feedforward directly.
    steer_feedforward: SteerFeedforwardFn,
}

impl TorqueController<VehicleModel> {
    /// Controller for a loaded configuration, using the bicycle model and
    /// identity feedforward shaping.
    pub fn from_config(config: &LateralConfig) -> Self {
        Self::new(
            &config.controller,
            &config.tuning,
            VehicleModel::new(config.vehicle),
            Box::new(default_steer_feedforward),
        )
    }
}

impl<M: CurvatureModel> TorqueController<M> {
    /// Build a controller. PID gains start from `tuning.default`.
    pub fn new(
        controller: &ControllerConfig,
        tuning: &LateralTuning,
        model: M,
        steer_feedforward: SteerFeedforwardFn,
    ) -> Self {
        let steer_max = controller.steer_max;
        Self {
            pid: PidController::new(&pid_gains(&tuning.default), steer_max, -steer_max),
            tune: SplitTune::new(tuning),
            saturation: SaturationMonitor::new(controller.steer_limit_timer),
            steer_max,
            model,
            steer_feedforward,
        }
    }

    /// Clear PID accumulators and the saturation counter.
    ///
    /// Gains and the split-tune cache survive.
    pub fn reset(&mut self) {
        self.pid.reset();
        self.saturation.reset();
    }

    /// Run one control tick against the live tuning configuration.
    pub fn update(&mut self, input: &TickInput, live: &LateralTuning) -> TickOutput {
        // ── 1. Gate ─────────────────────────────────────────────
        if input.v_ego < MIN_STEER_SPEED || !input.active {
            if !input.active {
                self.pid.reset();
            }
            return TickOutput::inactive();
        }

        // ── 2. Measured curvature ───────────────────────────────
        let v_ego = input.v_ego;
        let v2 = v_ego * v_ego;
        let actual_curvature = if self.tune.applied().use_steering_angle {
            let angle = (input.steering_angle_deg - input.angle_offset_deg).to_radians();
            -self.model.calc_curvature(angle, v_ego, input.roll)
        } else {
            input.yaw_rate / v_ego
        };
        let desired_lateral_accel = input.desired_curvature * v2;
        let desired_lateral_jerk = input.desired_curvature_rate * v2;
        let actual_lateral_accel = actual_curvature * v2;

        // ── 3. Tuning ───────────────────────────────────────────
        let selection = self.tune.select(live, input.desired_curvature, &mut self.pid);

        // ── 4. Error + feedforward ──────────────────────────────
        let setpoint = desired_lateral_accel + LOW_SPEED_FACTOR * input.desired_curvature;
        let measurement = actual_lateral_accel + LOW_SPEED_FACTOR * actual_curvature;
        let error = setpoint - measurement;

        // Friction is expressed against the default set's kf.
        let ff = lateral_feedforward(
            desired_lateral_accel,
            desired_lateral_jerk,
            input.roll,
            self.tune.applied().friction,
            live.default.kf,
        );

        // ── 5. PID + output ─────────────────────────────────────
        let output = self.pid.update(&PidStep {
            error,
            error_rate: 0.0,
            feedforward: ff,
            override_active: input.steering_pressed,
            freeze_integrator: input.steering_rate_limited,
        });
        let terms = self.pid.terms();

        let saturated = self.saturation.check(
            self.steer_max - output.abs() < SATURATION_MARGIN,
            &SaturationContext {
                v_ego,
                steering_rate_limited: input.steering_rate_limited,
                steering_pressed: input.steering_pressed,
            },
        );

        TickOutput {
            torque: -output,
            angle: 0.0,
            diagnostics: LateralDiagnostics {
                active: true,
                using_right_tune: selection.using_right_tune,
                error,
                p: terms.p,
                i: terms.i,
                d: terms.d,
                f: terms.f,
                output: -output,
                saturated,
                actual_lateral_accel,
                desired_lateral_accel,
            },
        }
    }

    /// PID primitive, for inspection.
    #[inline]
    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    /// Tuning values currently applied.
    #[inline]
    pub fn applied_tuning(&self) -> &TuningSet {
        self.tune.applied()
    }

    #[inline]
    pub fn split_tune(&self) -> &SplitTune {
        &self.tune
    }

    #[inline]
    pub fn saturation(&self) -> &SaturationMonitor {
        &self.saturation
    }

    #[inline]
    pub fn steer_max(&self) -> f64 {
        self.steer_max
    }

    #[inline]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Vehicle feedforward shaping function supplied at construction.
    #[inline]
    pub fn steer_feedforward(&self) -> &(dyn Fn(f64, f64) -> f64 + Send) {
        self.steer_feedforward.as_ref()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
