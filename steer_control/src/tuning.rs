//! Split-tune selection and live re-tune.
//!
//! Each active tick the controller asks [`SplitTune::select`] which tuning
//! set is authoritative and brings the PID gains in line with it:
//!
//! 1. Split flag toggled in the live config → mirror it; when it was just
//!    turned off, resync onto the default set.
//! 2. Split enabled → pick the side from desired curvature and resync from
//!    that side every tick (the side may flip tick to tick).
//! 3. Split disabled → resync from the default set; only drifted fields
//!    are written.
//!
//! Resync writes gains into the existing PID in place, so the integral
//! accumulator survives a re-tune.

use steer_common::lateral::tuning::{LateralTuning, TuningField, TuningSet, TuningSide};
use tracing::debug;

use crate::control::pid::{PidController, PidGains};

/// Outcome of one selection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuneSelection {
    /// Side whose gains are now live.
    pub side: TuningSide,
    /// Reported in diagnostics; only true while split tune is enabled.
    pub using_right_tune: bool,
    /// Fields written during this pass.
    pub changed: TuningField,
}

/// Split-tune state owned by the torque controller.
#[derive(Debug, Clone)]
pub struct SplitTune {
    /// Mirror of the live `split_tune` flag.
    split_enabled: bool,
    /// Values last written into the PID (and friction/curvature source).
    applied: TuningSet,
    side: TuningSide,
}

impl SplitTune {
    /// Start from the default set of `initial`.
    pub fn new(initial: &LateralTuning) -> Self {
        Self {
            split_enabled: initial.split_tune,
            applied: initial.default,
            side: TuningSide::Default,
        }
    }

    /// Tuning values currently in effect.
    #[inline]
    pub fn applied(&self) -> &TuningSet {
        &self.applied
    }

    #[inline]
    pub fn split_enabled(&self) -> bool {
        self.split_enabled
    }

    /// Side selected on the last pass.
    #[inline]
    pub fn side(&self) -> TuningSide {
        self.side
    }

    /// Choose the live tuning set for this tick and apply it to `pid`.
    pub fn select(
        &mut self,
        live: &LateralTuning,
        desired_curvature: f64,
        pid: &mut PidController,
    ) -> TuneSelection {
        let mut changed = TuningField::empty();

        if self.split_enabled != live.split_tune {
            if !live.split_tune {
                changed |= self.resync(&live.default, pid);
            }
            debug!(enabled = live.split_tune, "split tune toggled");
            self.split_enabled = live.split_tune;
        }

        let side = if self.split_enabled {
            TuningSide::for_curvature(desired_curvature)
        } else {
            TuningSide::Default
        };
        changed |= self.resync(live.set(side), pid);

        if side != self.side {
            debug!(from = ?self.side, to = ?side, desired_curvature, "tuning side switched");
        }
        self.side = side;

        TuneSelection {
            side,
            using_right_tune: self.split_enabled && side == TuningSide::Right,
            changed,
        }
    }

    /// Copy drifted fields of `target` into the applied set and push gain
    /// changes into the PID.
    fn resync(&mut self, target: &TuningSet, pid: &mut PidController) -> TuningField {
        let changed = self.applied.merge_from(target);
        if changed.intersects(TuningField::PID_GAINS) {
            pid.set_gains(&pid_gains(&self.applied));
        }
        if !changed.is_empty() {
            debug!(fields = ?changed, "torque tune resynced");
        }
        changed
    }
}

/// PID gain slots of a tuning set.
#[inline]
pub fn pid_gains(tune: &TuningSet) -> PidGains {
    PidGains {
        kp: tune.kp,
        ki: tune.ki,
        kd: tune.kd,
        kf: tune.kf,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
