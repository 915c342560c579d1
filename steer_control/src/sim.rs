//! Closed-loop simulation for running the controller without a vehicle.
//!
//! The plant is a first-order steering column: wheel angle follows
//! `gain × torque` with time constant `tau`, rate-limited. Yaw rate comes
//! from the same bicycle model the controller uses, with the controller's
//! sign convention (positive wheel angle → negative curvature).

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use steer_common::lateral::config::VehicleParams;
use steer_common::lateral::state::TickInput;

use crate::vehicle::{CurvatureModel, VehicleModel};

// ─── Plant ──────────────────────────────────────────────────────────

/// Steering column parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantParams {
    /// Steady-state wheel angle per unit torque [deg].
    pub gain_deg_per_torque: f64,
    /// Column time constant [s].
    pub tau: f64,
    /// Maximum wheel angle rate [deg/s].
    pub max_rate_deg_s: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            gain_deg_per_torque: 5.0,
            tau: 0.1,
            max_rate_deg_s: 400.0,
        }
    }
}

/// Simulated steering column and vehicle.
#[derive(Debug, Clone)]
pub struct SteeringPlant {
    params: PlantParams,
    model: VehicleModel,
    angle_deg: f64,
    rate_limited: bool,
}

impl SteeringPlant {
    pub fn new(params: PlantParams, vehicle: VehicleParams) -> Self {
        Self {
            params,
            model: VehicleModel::new(vehicle),
            angle_deg: 0.0,
            rate_limited: false,
        }
    }

    /// Apply `torque` for `dt` seconds.
    pub fn step(&mut self, torque: f64, dt: f64) {
        let p = &self.params;
        let target = torque * p.gain_deg_per_torque;
        let tau = p.tau.max(dt);
        let rate = (target - self.angle_deg) / tau;
        let limited = rate.clamp(-p.max_rate_deg_s, p.max_rate_deg_s);
        self.rate_limited = limited != rate;
        self.angle_deg += limited * dt;
    }

    #[inline]
    pub fn angle_deg(&self) -> f64 {
        self.angle_deg
    }

    /// Whether the last step hit the angle-rate limit.
    #[inline]
    pub fn rate_limited(&self) -> bool {
        self.rate_limited
    }

    /// Path curvature at `v_ego` on a road with `roll`.
    pub fn curvature(&self, v_ego: f64, roll: f64) -> f64 {
        -self
            .model
            .calc_curvature(self.angle_deg.to_radians(), v_ego, roll)
    }

    /// Yaw rate [rad/s].
    #[inline]
    pub fn yaw_rate(&self, v_ego: f64, roll: f64) -> f64 {
        self.curvature(v_ego, roll) * v_ego
    }
}

// ─── Scenario ───────────────────────────────────────────────────────

/// Drive scenario: constant speed, sinusoidal desired curvature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Vehicle speed [m/s].
    pub speed: f64,
    /// Desired curvature amplitude [1/m].
    pub amplitude: f64,
    /// Curvature period [s].
    pub period_s: f64,
    /// Road roll [rad].
    pub roll: f64,
    /// Time before the controller is engaged [s].
    pub engage_after_s: f64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            speed: 20.0,
            amplitude: 0.001,
            period_s: 8.0,
            roll: 0.0,
            engage_after_s: 0.5,
        }
    }
}

impl Scenario {
    /// Desired curvature and curvature rate at time `t`.
    pub fn desired(&self, t: f64) -> (f64, f64) {
        if self.period_s <= 0.0 {
            return (self.amplitude, 0.0);
        }
        let w = TAU / self.period_s;
        (
            self.amplitude * (w * t).sin(),
            self.amplitude * w * (w * t).cos(),
        )
    }

    #[inline]
    pub fn engaged(&self, t: f64) -> bool {
        t >= self.engage_after_s
    }
}

// ─── Simulation ─────────────────────────────────────────────────────

/// Plant + scenario stepping together.
#[derive(Debug, Clone)]
pub struct Simulation {
    plant: SteeringPlant,
    scenario: Scenario,
    t: f64,
}

impl Simulation {
    pub fn new(plant: SteeringPlant, scenario: Scenario) -> Self {
        Self {
            plant,
            scenario,
            t: 0.0,
        }
    }

    /// Controller input for the current instant.
    pub fn input(&self) -> TickInput {
        let s = &self.scenario;
        let (desired_curvature, desired_curvature_rate) = s.desired(self.t);
        TickInput {
            active: s.engaged(self.t),
            v_ego: s.speed,
            steering_angle_deg: self.plant.angle_deg(),
            steering_pressed: false,
            steering_rate_limited: self.plant.rate_limited(),
            yaw_rate: self.plant.yaw_rate(s.speed, s.roll),
            roll: s.roll,
            angle_offset_deg: 0.0,
            desired_curvature,
            desired_curvature_rate,
        }
    }

    /// Apply `torque` and advance by `dt`.
    pub fn advance(&mut self, torque: f64, dt: f64) {
        self.plant.step(torque, dt);
        self.t += dt;
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.t
    }

    #[inline]
    pub fn plant(&self) -> &SteeringPlant {
        &self.plant
    }

    #[inline]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn plant() -> SteeringPlant {
        SteeringPlant::new(PlantParams::default(), VehicleParams::default())
    }

    #[test]
    fn plant_settles_to_gain() {
        let mut p = plant();
        for _ in 0..500 {
            p.step(1.0, 0.01);
        }
        assert!((p.angle_deg() - 5.0).abs() < 1e-6);
        assert!(!p.rate_limited());
    }

    #[test]
    fn plant_rate_limit_reported() {
        let mut p = SteeringPlant::new(
            PlantParams {
                max_rate_deg_s: 1.0,
                ..Default::default()
            },
            VehicleParams::default(),
        );
        p.step(1.0, 0.01);
        assert!(p.rate_limited());
        assert!((p.angle_deg() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn negative_torque_turns_positive() {
        let mut p = plant();
        for _ in 0..100 {
            p.step(-0.5, 0.01);
        }
        assert!(p.curvature(20.0, 0.0) > 0.0);
        assert!(p.yaw_rate(20.0, 0.0) > 0.0);
    }

    #[test]
    fn scenario_rate_is_derivative() {
        let s = Scenario::default();
        let dt = 1e-6;
        let (k0, rate) = s.desired(1.0);
        let (k1, _) = s.desired(1.0 + dt);
        assert!(((k1 - k0) / dt - rate).abs() < 1e-6);
    }

    #[test]
    fn engagement_after_warmup() {
        let mut sim = Simulation::new(plant(), Scenario::default());
        assert!(!sim.input().active);
        for _ in 0..60 {
            sim.advance(0.0, 0.01);
        }
        assert!(sim.input().active);
        assert_eq!(sim.input().v_ego, 20.0);
    }
}
