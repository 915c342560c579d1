//! Torque tuning sets and the live tuning document.
//!
//! A [`TuningSet`] is the immutable-per-tick snapshot of the gains used by the
//! torque controller. [`LateralTuning`] holds the two sets of a vehicle
//! profile (default and right-turn) plus the split-tune switch; it is the
//! part of the configuration that may change while the loop is running.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::{FRICTION_MAX, GAIN_MAX, GAIN_REL_TOLERANCE, KF_MIN, LR_SPLIT_PT};

/// Relative float comparison with 9 significant digits and no absolute floor.
///
/// Two exact zeros compare equal; zero against any non-zero value does not.
#[inline]
pub fn is_close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= GAIN_REL_TOLERANCE * a.abs().max(b.abs())
}

bitflags! {
    /// Tuning fields touched by a resync.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TuningField: u8 {
        const KP                 = 0x01;
        const KI                 = 0x02;
        const KD                 = 0x04;
        const KF                 = 0x08;
        const FRICTION           = 0x10;
        const USE_STEERING_ANGLE = 0x20;
    }
}

impl TuningField {
    /// Fields that end up in the PID primitive's gain slots.
    pub const PID_GAINS: Self = Self::from_bits_truncate(
        Self::KP.bits() | Self::KI.bits() | Self::KD.bits() | Self::KF.bits(),
    );
}

impl Default for TuningField {
    fn default() -> Self {
        Self::empty()
    }
}

/// Which of the two tuning sets is authoritative for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TuningSide {
    /// Default set (left turns and straight driving).
    #[default]
    Default,
    /// Right-turn set.
    Right,
}

impl TuningSide {
    /// Classify a desired curvature against [`LR_SPLIT_PT`].
    #[inline]
    pub fn for_curvature(desired_curvature: f64) -> Self {
        if desired_curvature >= LR_SPLIT_PT {
            Self::Right
        } else {
            Self::Default
        }
    }
}

/// Torque controller gains for one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuningSet {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    #[serde(default)]
    pub kd: f64,
    /// Feedforward gain (must be > 0).
    pub kf: f64,
    /// Friction compensation [torque per jerk-window].
    #[serde(default)]
    pub friction: f64,
    /// Derive measured curvature from steering angle instead of yaw rate.
    #[serde(default = "default_use_steering_angle")]
    pub use_steering_angle: bool,
}

fn default_use_steering_angle() -> bool {
    true
}

impl Default for TuningSet {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.1,
            kd: 0.0,
            kf: 1.0,
            friction: 0.0,
            use_steering_angle: default_use_steering_angle(),
        }
    }
}

impl TuningSet {
    /// Fields of `other` that differ from `self` beyond tolerance.
    pub fn drift(&self, other: &TuningSet) -> TuningField {
        let mut changed = TuningField::empty();
        changed.set(TuningField::KP, !is_close(self.kp, other.kp));
        changed.set(TuningField::KI, !is_close(self.ki, other.ki));
        changed.set(TuningField::KD, !is_close(self.kd, other.kd));
        changed.set(TuningField::KF, !is_close(self.kf, other.kf));
        changed.set(TuningField::FRICTION, !is_close(self.friction, other.friction));
        changed.set(
            TuningField::USE_STEERING_ANGLE,
            self.use_steering_angle != other.use_steering_angle,
        );
        changed
    }

    /// Copy every drifted field from `source` into `self`.
    ///
    /// Fields within tolerance keep their current value. Returns the set of
    /// fields that were overwritten.
    pub fn merge_from(&mut self, source: &TuningSet) -> TuningField {
        let changed = self.drift(source);
        if changed.contains(TuningField::KP) {
            self.kp = source.kp;
        }
        if changed.contains(TuningField::KI) {
            self.ki = source.ki;
        }
        if changed.contains(TuningField::KD) {
            self.kd = source.kd;
        }
        if changed.contains(TuningField::KF) {
            self.kf = source.kf;
        }
        if changed.contains(TuningField::FRICTION) {
            self.friction = source.friction;
        }
        if changed.contains(TuningField::USE_STEERING_ANGLE) {
            self.use_steering_angle = source.use_steering_angle;
        }
        changed
    }

    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !value.is_finite() || !(0.0..=GAIN_MAX).contains(&value) {
                return Err(format!("{name} {value} out of range [0, {GAIN_MAX}]"));
            }
        }
        if !self.kf.is_finite() || self.kf < KF_MIN || self.kf > GAIN_MAX {
            return Err(format!(
                "kf {} out of range [{KF_MIN}, {GAIN_MAX}]",
                self.kf
            ));
        }
        if !self.friction.is_finite() || !(0.0..=FRICTION_MAX).contains(&self.friction) {
            return Err(format!(
                "friction {} out of range [0, {FRICTION_MAX}]",
                self.friction
            ));
        }
        Ok(())
    }
}

/// Live tuning document: both sides plus the split-tune switch.
///
/// # TOML Example
///
/// ```toml
/// [tuning]
/// split_tune = true
///
/// [tuning.default]
/// kp = 1.0
/// ki = 0.1
/// kf = 1.0
/// friction = 0.1
///
/// [tuning.right]
/// kp = 0.8
/// ki = 0.1
/// kf = 1.1
/// friction = 0.12
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LateralTuning {
    /// Select between `default` and `right` by curve direction.
    #[serde(default)]
    pub split_tune: bool,
    /// Default (left/straight) tuning set.
    pub default: TuningSet,
    /// Right-turn tuning set. Falls back to `default` when omitted.
    #[serde(default)]
    pub right: Option<TuningSet>,
}

impl Default for LateralTuning {
    fn default() -> Self {
        Self {
            split_tune: false,
            default: TuningSet::default(),
            right: None,
        }
    }
}

impl LateralTuning {
    /// Tuning set for the given side.
    #[inline]
    pub fn set(&self, side: TuningSide) -> &TuningSet {
        match side {
            TuningSide::Default => &self.default,
            TuningSide::Right => self.right.as_ref().unwrap_or(&self.default),
        }
    }

    /// Validate both sets.
    pub fn validate(&self) -> Result<(), String> {
        self.default
            .validate()
            .map_err(|e| format!("tuning.default: {e}"))?;
        if let Some(ref right) = self.right {
            right.validate().map_err(|e| format!("tuning.right: {e}"))?;
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> TuningSet {
        TuningSet {
            kp: 1.0,
            ki: 0.1,
            kd: 0.0,
            kf: 1.0,
            friction: 0.1,
            use_steering_angle: true,
        }
    }

    #[test]
    fn is_close_matches_nine_digit_tolerance() {
        assert!(is_close(1.0, 1.0 + 1e-10));
        assert!(!is_close(1.0, 1.0 + 1e-8));
        assert!(is_close(0.0, 0.0));
        assert!(!is_close(0.0, 1e-15));
        assert!(!is_close(f64::NAN, f64::NAN));
    }

    #[test]
    fn side_switches_exactly_at_split_point() {
        assert_eq!(TuningSide::for_curvature(LR_SPLIT_PT), TuningSide::Right);
        assert_eq!(
            TuningSide::for_curvature(LR_SPLIT_PT - 1e-9),
            TuningSide::Default
        );
        assert_eq!(TuningSide::for_curvature(-0.01), TuningSide::Default);
    }

    #[test]
    fn drift_ignores_sub_tolerance_changes() {
        let a = reference();
        let mut b = a;
        b.kp += 1e-12;
        assert!(a.drift(&b).is_empty());
    }

    #[test]
    fn drift_reports_each_field() {
        let a = reference();
        let b = TuningSet {
            ki: 0.2,
            use_steering_angle: false,
            ..a
        };
        assert_eq!(
            a.drift(&b),
            TuningField::KI | TuningField::USE_STEERING_ANGLE
        );
    }

    #[test]
    fn merge_copies_only_drifted_fields() {
        let mut cached = reference();
        let source = TuningSet {
            kp: 1.0 + 1e-12,
            friction: 0.3,
            ..reference()
        };
        let changed = cached.merge_from(&source);
        assert_eq!(changed, TuningField::FRICTION);
        assert_eq!(cached.kp, 1.0);
        assert_eq!(cached.friction, 0.3);
    }

    #[test]
    fn validate_rejects_zero_kf() {
        let t = TuningSet {
            kf: 0.0,
            ..reference()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_gain() {
        let t = TuningSet {
            kp: -1.0,
            ..reference()
        };
        assert!(t.validate().unwrap_err().contains("kp"));
    }

    #[test]
    fn missing_right_falls_back_to_default() {
        let tuning = LateralTuning {
            split_tune: true,
            default: reference(),
            right: None,
        };
        assert_eq!(tuning.set(TuningSide::Right), &reference());
    }

    #[test]
    fn tuning_from_toml() {
        let tuning: LateralTuning = toml::from_str(
            r#"
split_tune = true

[default]
kp = 1.0
ki = 0.1
kf = 1.0

[right]
kp = 0.5
ki = 0.05
kf = 2.0
friction = 0.2
use_steering_angle = true
"#,
        )
        .unwrap();
        assert!(tuning.split_tune);
        assert_eq!(tuning.default.friction, 0.0);
        assert!(tuning.default.use_steering_angle);
        assert_eq!(tuning.set(TuningSide::Right).kf, 2.0);
    }

    #[test]
    fn omitted_fields_match_default_set() {
        let parsed: TuningSet = toml::from_str("kp = 1.0\nki = 0.1\nkf = 1.0").unwrap();
        let d = TuningSet::default();
        assert_eq!(parsed.kd, d.kd);
        assert_eq!(parsed.friction, d.friction);
        assert_eq!(parsed.use_steering_angle, d.use_steering_angle);
        assert_eq!(parsed, d);
    }
}
