//! Lateral feedforward.
//!
//! Desired lateral acceleration minus the road-bank component of gravity,
//! plus steering friction compensation driven by desired lateral jerk.
//! The result is in lateral-acceleration units; the PID scales it by `kf`.

use steer_common::consts::{ACCELERATION_DUE_TO_GRAVITY, JERK_THRESHOLD};

use super::interp::interp;

/// Vehicle-specific feedforward shaping: `(desired, v_ego) -> feedforward`.
pub type SteerFeedforwardFn = Box<dyn Fn(f64, f64) -> f64 + Send>;

/// Identity shaping for vehicles without a fitted feedforward curve.
#[inline]
pub fn default_steer_feedforward(desired: f64, _v_ego: f64) -> f64 {
    desired
}

/// Feedforward with steady-state road-bank compensation.
///
/// ```text
/// ff = desired_lateral_accel − roll × g
/// ```
#[inline]
pub fn roll_compensated_feedforward(desired_lateral_accel: f64, roll: f64) -> f64 {
    desired_lateral_accel - roll * ACCELERATION_DUE_TO_GRAVITY
}

/// Friction compensation [torque units].
///
/// Linear in `desired_lateral_jerk` over `[−JERK_THRESHOLD, JERK_THRESHOLD]`,
/// saturating at `±friction` outside that window.
#[inline]
pub fn friction_compensation(desired_lateral_jerk: f64, friction: f64) -> f64 {
    interp(
        desired_lateral_jerk,
        &[-JERK_THRESHOLD, JERK_THRESHOLD],
        &[-friction, friction],
    )
}

/// Total lateral feedforward in lateral-acceleration units.
///
/// The friction term is divided by `kf` so that after the PID multiplies the
/// feedforward by `kf` it contributes exactly `friction_compensation`.
/// A non-positive `kf` drops the friction term.
#[inline]
pub fn lateral_feedforward(
    desired_lateral_accel: f64,
    desired_lateral_jerk: f64,
    roll: f64,
    friction: f64,
    kf: f64,
) -> f64 {
    let mut ff = roll_compensated_feedforward(desired_lateral_accel, roll);
    if kf > 0.0 {
        ff += friction_compensation(desired_lateral_jerk, friction) / kf;
    }
    ff
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_road_passes_desired_accel() {
        assert_eq!(roll_compensated_feedforward(1.2, 0.0), 1.2);
    }

    #[test]
    fn roll_subtracts_gravity_component() {
        let ff = roll_compensated_feedforward(0.0, 0.05);
        assert!((ff + 0.05 * 9.8).abs() < 1e-12);
    }

    #[test]
    fn friction_zero_at_zero_jerk() {
        for friction in [0.0, 0.05, 0.1, 0.12, 0.15, 0.2, 0.3, 1.0] {
            assert_eq!(friction_compensation(0.0, friction), 0.0, "friction = {friction}");
            assert_eq!(
                lateral_feedforward(0.0, 0.0, 0.0, friction, 1.5),
                0.0,
                "friction = {friction}"
            );
        }
    }

    #[test]
    fn friction_saturates_outside_window() {
        assert_eq!(friction_compensation(JERK_THRESHOLD, 0.3), 0.3);
        assert_eq!(friction_compensation(5.0, 0.3), 0.3);
        assert_eq!(friction_compensation(-JERK_THRESHOLD, 0.3), -0.3);
        assert_eq!(friction_compensation(-5.0, 0.3), -0.3);
    }

    #[test]
    fn friction_linear_inside_window() {
        let half = friction_compensation(JERK_THRESHOLD / 2.0, 0.3);
        assert!((half - 0.15).abs() < 1e-12);
        let neg = friction_compensation(-JERK_THRESHOLD / 4.0, 0.4);
        assert!((neg + 0.1).abs() < 1e-12);
    }

    #[test]
    fn friction_divided_by_kf() {
        let ff = lateral_feedforward(0.0, 1.0, 0.0, 0.2, 2.0);
        assert!((ff - 0.1).abs() < 1e-12);
    }

    #[test]
    fn non_positive_kf_drops_friction() {
        let ff = lateral_feedforward(0.5, 1.0, 0.0, 0.2, 0.0);
        assert_eq!(ff, 0.5);
    }

    #[test]
    fn default_shaping_is_identity() {
        assert_eq!(default_steer_feedforward(0.7, 25.0), 0.7);
    }
}
