//! Sustained-saturation detection.
//!
//! A leaky counter rises while the output sits at its limit under normal
//! driving and falls otherwise. Saturation is reported once the counter has
//! been high for longer than the configured steer limit timer.

use steer_common::consts::{DT_CTRL, SATURATION_MIN_SPEED};

/// Vehicle state relevant to saturation accounting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaturationContext {
    /// Vehicle speed [m/s].
    pub v_ego: f64,
    /// Upstream is rate-limiting the steering command.
    pub steering_rate_limited: bool,
    /// Driver is applying torque.
    pub steering_pressed: bool,
}

/// Debounced saturation monitor.
#[derive(Debug, Clone, Copy)]
pub struct SaturationMonitor {
    count: f64,
    count_rate: f64,
    limit: f64,
}

impl SaturationMonitor {
    /// Monitor that reports after `steer_limit_timer` seconds at the limit.
    pub fn new(steer_limit_timer: f64) -> Self {
        Self {
            count: 0.0,
            count_rate: DT_CTRL,
            limit: steer_limit_timer,
        }
    }

    /// Account one tick and return whether saturation is sustained.
    #[inline]
    pub fn check(&mut self, near_limit: bool, ctx: &SaturationContext) -> bool {
        let counts = near_limit
            && ctx.v_ego > SATURATION_MIN_SPEED
            && !ctx.steering_rate_limited
            && !ctx.steering_pressed;

        if counts {
            self.count += self.count_rate;
        } else {
            self.count -= self.count_rate;
        }
        self.count = self.count.clamp(0.0, 1.0);
        self.count > self.limit
    }

    /// Clear the counter.
    #[inline]
    pub fn reset(&mut self) {
        self.count = 0.0;
    }

    /// Current counter value in `[0, 1]`.
    #[inline]
    pub fn count(&self) -> f64 {
        self.count
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
