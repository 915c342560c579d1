//! PID controller with feedforward, override unwind and integrator freeze.
//!
//! Anti-windup is conditional integration:
//! the integrator only moves when doing so does not push the output further
//! past a limit.
//!
//! Gains are re-tuned in place via [`PidController::set_gains`], which never
//! touches the accumulators.

use steer_common::consts::CONTROL_RATE_HZ;

/// Integrator unwind while the driver overrides [units/s].
const I_UNWIND_PER_S: f64 = 0.3;

/// Scalar gain snapshot written by a live re-tune.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Feedforward gain.
    pub kf: f64,
}

/// Inputs for one PID step.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidStep {
    /// Setpoint minus measurement.
    pub error: f64,
    /// Time derivative of the error (0 when unavailable).
    pub error_rate: f64,
    /// Feedforward, scaled by `kf` inside the controller.
    pub feedforward: f64,
    /// Driver override: unwind the integrator instead of accumulating.
    pub override_active: bool,
    /// Hold the integrator at its current value.
    pub freeze_integrator: bool,
}

/// Individual terms of the last step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidTerms {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub f: f64,
    /// Clipped output.
    pub control: f64,
}

/// PID primitive used by the torque controller.
#[derive(Debug, Clone)]
pub struct PidController {
    k_p: f64,
    k_i: f64,
    k_d: f64,
    k_f: f64,
    pos_limit: f64,
    neg_limit: f64,
    /// Integration step [s].
    i_rate: f64,
    /// Integrator decrement per step under override.
    i_unwind_rate: f64,
    terms: PidTerms,
}

impl PidController {
    /// Controller running at [`CONTROL_RATE_HZ`].
    pub fn new(gains: &PidGains, pos_limit: f64, neg_limit: f64) -> Self {
        Self::with_rate(gains, pos_limit, neg_limit, CONTROL_RATE_HZ)
    }

    /// Controller integrating at an explicit rate [Hz].
    pub fn with_rate(gains: &PidGains, pos_limit: f64, neg_limit: f64, rate: f64) -> Self {
        let (neg_limit, pos_limit) = if neg_limit <= pos_limit {
            (neg_limit, pos_limit)
        } else {
            (pos_limit, neg_limit)
        };
        let rate = if rate > 0.0 { rate } else { CONTROL_RATE_HZ };

        Self {
            k_p: gains.kp,
            k_i: gains.ki,
            k_d: gains.kd,
            k_f: gains.kf,
            pos_limit,
            neg_limit,
            i_rate: 1.0 / rate,
            i_unwind_rate: I_UNWIND_PER_S / rate,
            terms: PidTerms::default(),
        }
    }

    /// Zero all accumulated state. Gains and limits are kept.
    #[inline]
    pub fn reset(&mut self) {
        self.terms = PidTerms::default();
    }

    /// Overwrite the live gains.
    ///
    /// The integral accumulator and last terms are left untouched.
    pub fn set_gains(&mut self, gains: &PidGains) {
        self.k_p = gains.kp;
        self.k_i = gains.ki;
        self.k_d = gains.kd;
        self.k_f = gains.kf;
    }

    /// Live gains.
    pub fn gains(&self) -> PidGains {
        PidGains {
            kp: self.k_p,
            ki: self.k_i,
            kd: self.k_d,
            kf: self.k_f,
        }
    }

    #[inline]
    pub fn k_p(&self) -> f64 {
        self.k_p
    }

    #[inline]
    pub fn k_i(&self) -> f64 {
        self.k_i
    }

    #[inline]
    pub fn k_f(&self) -> f64 {
        self.k_f
    }

    /// Terms of the last step.
    #[inline]
    pub fn terms(&self) -> PidTerms {
        self.terms
    }

    /// Current integral accumulator.
    #[inline]
    pub fn integral(&self) -> f64 {
        self.terms.i
    }

    /// `(neg_limit, pos_limit)`.
    #[inline]
    pub fn limits(&self) -> (f64, f64) {
        (self.neg_limit, self.pos_limit)
    }

    /// Run one step and return the clipped output.
    pub fn update(&mut self, step: &PidStep) -> f64 {
        let p = step.error * self.k_p;
        let f = step.feedforward * self.k_f;
        let d = step.error_rate * self.k_d;
        let mut i = self.terms.i;

        if step.override_active {
            i = unwind(i, self.i_unwind_rate);
        } else {
            let candidate = i + step.error * self.k_i * self.i_rate;
            let control = p + candidate + d + f;

            // Integrate only while it pulls away from a limit or toward
            // the error's sign.
            let may_integrate = (step.error >= 0.0
                && (control <= self.pos_limit || candidate < 0.0))
                || (step.error <= 0.0 && (control >= self.neg_limit || candidate > 0.0));
            if may_integrate && !step.freeze_integrator {
                i = candidate;
            }
        }

        let control = clip(p + i + d + f, self.neg_limit, self.pos_limit);
        self.terms = PidTerms {
            p,
            i,
            d,
            f,
            control,
        };
        control
    }
}

/// Move `i` toward zero by `rate` without crossing it.
#[inline]
fn unwind(i: f64, rate: f64) -> f64 {
    if i.abs() <= rate { 0.0 } else { i - rate * i.signum() }
}

/// Clip without panicking on NaN (NaN passes through).
#[inline]
fn clip(x: f64, lo: f64, hi: f64) -> f64 {
    if x > hi {
        hi
    } else if x < lo {
        lo
    } else {
        x
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
