//! Vehicle curvature model.
//!
//! [`CurvatureModel`] is the seam through which the torque controller turns
//! a steering angle into path curvature. [`VehicleModel`] implements it with
//! a steady-state single-track (bicycle) model including understeer and a
//! road-roll term.

use steer_common::consts::ACCELERATION_DUE_TO_GRAVITY;
use steer_common::lateral::config::VehicleParams;

/// Steady-state curvature from steering angle.
pub trait CurvatureModel {
    /// Path curvature [1/m] for a steering wheel angle [rad] at `speed`
    /// [m/s] on a road with `roll` [rad]. Must be pure.
    fn calc_curvature(&self, angle_rad: f64, speed: f64, roll: f64) -> f64;
}

impl<F> CurvatureModel for F
where
    F: Fn(f64, f64, f64) -> f64,
{
    #[inline]
    fn calc_curvature(&self, angle_rad: f64, speed: f64, roll: f64) -> f64 {
        self(angle_rad, speed, roll)
    }
}

/// Single-track vehicle model.
#[derive(Debug, Clone, Copy)]
pub struct VehicleModel {
    params: VehicleParams,
    /// Slip factor, precomputed from mass, geometry and tire stiffness.
    slip_factor: f64,
}

impl VehicleModel {
    pub fn new(params: VehicleParams) -> Self {
        let l = params.wheelbase;
        let a_f = params.center_to_front;
        let a_r = params.center_to_rear();
        let c_f = params.tire_stiffness_front;
        let c_r = params.tire_stiffness_rear;
        let slip_factor = params.mass * (c_f * a_r - c_r * a_f) / (l * l * c_f * c_r);

        Self {
            params,
            slip_factor,
        }
    }

    #[inline]
    pub fn params(&self) -> &VehicleParams {
        &self.params
    }

    /// Slip factor [s²/m²]; negative for an understeering vehicle.
    #[inline]
    pub fn slip_factor(&self) -> f64 {
        self.slip_factor
    }

    /// Curvature per road-wheel angle at speed `u` [1/(m·rad)].
    #[inline]
    pub fn curvature_factor(&self, u: f64) -> f64 {
        (1.0 - self.params.steer_ratio_rear) / (1.0 - self.slip_factor * u * u)
            / self.params.wheelbase
    }

    /// Curvature induced by road bank at speed `u` [1/m].
    #[inline]
    pub fn roll_compensation(&self, roll: f64, u: f64) -> f64 {
        if self.slip_factor.abs() < 1e-6 {
            0.0
        } else {
            ACCELERATION_DUE_TO_GRAVITY * roll / (1.0 / self.slip_factor - u * u)
        }
    }
}

impl CurvatureModel for VehicleModel {
    #[inline]
    fn calc_curvature(&self, angle_rad: f64, speed: f64, roll: f64) -> f64 {
        self.curvature_factor(speed) * angle_rad / self.params.steer_ratio
            + self.roll_compensation(roll, speed)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_vehicle_understeers() {
        let vm = VehicleModel::new(VehicleParams::default());
        assert!(vm.slip_factor() < 0.0);
        // Curvature per angle drops with speed.
        assert!(vm.curvature_factor(30.0) < vm.curvature_factor(5.0));
    }

    #[test]
    fn standstill_is_kinematic() {
        let p = VehicleParams::default();
        let vm = VehicleModel::new(p);
        let k = vm.calc_curvature(0.3, 0.0, 0.0);
        assert!((k - 0.3 / p.steer_ratio / p.wheelbase).abs() < 1e-12);
    }

    #[test]
    fn straight_wheel_flat_road_is_straight() {
        let vm = VehicleModel::new(VehicleParams::default());
        assert_eq!(vm.calc_curvature(0.0, 20.0, 0.0), 0.0);
    }

    #[test]
    fn roll_term_matches_gravity_over_slip() {
        let vm = VehicleModel::new(VehicleParams::default());
        let sf = vm.slip_factor();
        let k = vm.calc_curvature(0.0, 22.0, 0.03);
        let expected = ACCELERATION_DUE_TO_GRAVITY * 0.03 / (1.0 / sf - 22.0 * 22.0);
        assert!((k - expected).abs() < 1e-15);
        // Understeer: positive roll gives negative curvature.
        assert!(k < 0.0);
    }

    #[test]
    fn neutral_steer_has_no_roll_term() {
        let p = VehicleParams {
            center_to_front: 1.35,
            tire_stiffness_front: 200_000.0,
            tire_stiffness_rear: 200_000.0,
            ..Default::default()
        };
        let vm = VehicleModel::new(p);
        assert_eq!(vm.roll_compensation(0.1, 20.0), 0.0);
    }

    #[test]
    fn closure_is_a_curvature_model() {
        let model = |angle: f64, _speed: f64, _roll: f64| angle * 0.1;
        assert!((model.calc_curvature(0.5, 10.0, 0.0) - 0.05).abs() < 1e-12);
    }
}
