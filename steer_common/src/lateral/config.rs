//! Configuration structures for the lateral controller.
//!
//! All config types use `serde::Deserialize` for TOML loading.
//! Numeric parameters are bounds-checked by `validate()`.
//! Optional fields use `#[serde(default)]` so older files keep loading.

use serde::{Deserialize, Serialize};

use crate::config::SharedConfig;
use crate::consts::{
    STEER_LIMIT_TIMER_DEFAULT, STEER_LIMIT_TIMER_MAX, STEER_LIMIT_TIMER_MIN, STEER_MAX_DEFAULT,
    STEER_MAX_MAX, STEER_MAX_MIN,
};

use super::tuning::LateralTuning;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete lateral controller configuration file.
///
/// Only the `[tuning]` table may change while the loop is running; the
/// other tables are fixed for the lifetime of a drive session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LateralConfig {
    /// Common service settings.
    pub shared: SharedConfig,
    /// Output limits and saturation timing.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Vehicle geometry for the curvature model.
    pub vehicle: VehicleParams,
    /// Live-tunable gains.
    pub tuning: LateralTuning,
}

impl LateralConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.controller.validate()?;
        self.vehicle.validate()?;
        self.tuning.validate()?;
        Ok(())
    }
}

// ─── Controller ─────────────────────────────────────────────────────

/// Output stage configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Symmetric torque limit (default: 1.0).
    #[serde(default = "default_steer_max")]
    pub steer_max: f64,

    /// Sustained-saturation time before it is reported [s] (default: 0.4).
    #[serde(default = "default_steer_limit_timer")]
    pub steer_limit_timer: f64,
}

fn default_steer_max() -> f64 {
    STEER_MAX_DEFAULT
}
fn default_steer_limit_timer() -> f64 {
    STEER_LIMIT_TIMER_DEFAULT
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            steer_max: STEER_MAX_DEFAULT,
            steer_limit_timer: STEER_LIMIT_TIMER_DEFAULT,
        }
    }
}

impl ControllerConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(STEER_MAX_MIN..=STEER_MAX_MAX).contains(&self.steer_max) {
            return Err(format!(
                "steer_max {} out of range [{}, {}]",
                self.steer_max, STEER_MAX_MIN, STEER_MAX_MAX
            ));
        }
        if !(STEER_LIMIT_TIMER_MIN..=STEER_LIMIT_TIMER_MAX).contains(&self.steer_limit_timer) {
            return Err(format!(
                "steer_limit_timer {} out of range [{}, {}]",
                self.steer_limit_timer, STEER_LIMIT_TIMER_MIN, STEER_LIMIT_TIMER_MAX
            ));
        }
        Ok(())
    }
}

// ─── Vehicle ────────────────────────────────────────────────────────

/// Single-track vehicle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleParams {
    /// Vehicle mass [kg].
    pub mass: f64,
    /// Wheelbase [m].
    pub wheelbase: f64,
    /// Distance from center of gravity to front axle [m].
    pub center_to_front: f64,
    /// Front axle cornering stiffness [N/rad].
    pub tire_stiffness_front: f64,
    /// Rear axle cornering stiffness [N/rad].
    pub tire_stiffness_rear: f64,
    /// Steering wheel to road wheel ratio.
    pub steer_ratio: f64,
    /// Rear to front steer ratio (0 for front-steer vehicles).
    #[serde(default)]
    pub steer_ratio_rear: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            mass: 1500.0,
            wheelbase: 2.7,
            center_to_front: 1.2,
            tire_stiffness_front: 200_000.0,
            tire_stiffness_rear: 300_000.0,
            steer_ratio: 15.0,
            steer_ratio_rear: 0.0,
        }
    }
}

impl VehicleParams {
    /// Distance from center of gravity to rear axle [m].
    #[inline]
    pub fn center_to_rear(&self) -> f64 {
        self.wheelbase - self.center_to_front
    }

    /// Validate geometry.
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("mass", self.mass),
            ("wheelbase", self.wheelbase),
            ("center_to_front", self.center_to_front),
            ("tire_stiffness_front", self.tire_stiffness_front),
            ("tire_stiffness_rear", self.tire_stiffness_rear),
            ("steer_ratio", self.steer_ratio),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("vehicle.{name} must be > 0 (got {value})"));
            }
        }
        if self.center_to_front >= self.wheelbase {
            return Err(format!(
                "vehicle.center_to_front {} must be < wheelbase {}",
                self.center_to_front, self.wheelbase
            ));
        }
        if !self.steer_ratio_rear.is_finite() || self.steer_ratio_rear >= 1.0 {
            return Err(format!(
                "vehicle.steer_ratio_rear {} must be < 1",
                self.steer_ratio_rear
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_defaults() {
        let c: ControllerConfig = toml::from_str("").unwrap();
        assert_eq!(c, ControllerConfig::default());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn controller_rejects_zero_steer_max() {
        let c = ControllerConfig {
            steer_max: 0.0,
            ..Default::default()
        };
        assert!(c.validate().unwrap_err().contains("steer_max"));
    }

    #[test]
    fn steer_max_floor_stays_above_saturation_margin() {
        use crate::consts::SATURATION_MARGIN;

        let at_margin = ControllerConfig {
            steer_max: SATURATION_MARGIN,
            ..Default::default()
        };
        assert!(at_margin.validate().is_err());

        let at_floor = ControllerConfig {
            steer_max: STEER_MAX_MIN,
            ..Default::default()
        };
        assert!(at_floor.validate().is_ok());
        assert!(at_floor.steer_max - SATURATION_MARGIN > 0.0);
    }

    #[test]
    fn vehicle_center_to_rear() {
        let v = VehicleParams::default();
        assert!((v.center_to_rear() - 1.5).abs() < 1e-12);
        assert!(v.validate().is_ok());
    }

    #[test]
    fn vehicle_rejects_cg_outside_wheelbase() {
        let v = VehicleParams {
            center_to_front: 3.0,
            ..Default::default()
        };
        assert!(v.validate().is_err());
    }

    #[test]
    fn unknown_field_rejected() {
        let r: Result<ControllerConfig, _> = toml::from_str("steer_maxx = 2.0");
        assert!(r.is_err());
    }
}
