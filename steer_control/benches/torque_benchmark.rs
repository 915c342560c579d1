//! Torque controller micro-benchmark.
//!
//! Measures the per-tick cost of the lateral pipeline stages:
//! - PID step alone
//! - Split-tune selection with a side flip every call
//! - Full `TorqueController::update()` (the 100 Hz hot path)

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use steer_common::consts::DT_CTRL;
use steer_common::lateral::config::{ControllerConfig, VehicleParams};
use steer_common::lateral::state::TickInput;
use steer_common::lateral::tuning::{LateralTuning, TuningSet};
use steer_control::control::feedforward::default_steer_feedforward;
use steer_control::control::pid::{PidController, PidStep};
use steer_control::control::torque::TorqueController;
use steer_control::tuning::{SplitTune, pid_gains};
use steer_control::vehicle::VehicleModel;

fn reference_tuning() -> LateralTuning {
    LateralTuning {
        split_tune: true,
        default: TuningSet {
            kp: 1.0,
            ki: 0.1,
            kd: 0.0,
            kf: 1.0,
            friction: 0.1,
            use_steering_angle: false,
        },
        right: Some(TuningSet {
            kp: 0.6,
            ki: 0.25,
            kd: 0.0,
            kf: 2.0,
            friction: 0.2,
            use_steering_angle: false,
        }),
    }
}

fn bench_pid_only(c: &mut Criterion) {
    let tuning = reference_tuning();
    let mut pid = PidController::new(&pid_gains(&tuning.default), 1.0, -1.0);
    let mut cycle = 0u64;

    c.bench_function("pid_update", |b| {
        b.iter(|| {
            cycle += 1;
            let t = cycle as f64 * DT_CTRL;
            pid.update(&PidStep {
                error: 0.2 * t.sin(),
                feedforward: 0.3 * t.cos(),
                ..Default::default()
            })
        });
    });
}

fn bench_split_select(c: &mut Criterion) {
    let tuning = reference_tuning();
    let mut split = SplitTune::new(&tuning);
    let mut pid = PidController::new(&pid_gains(&tuning.default), 1.0, -1.0);
    let mut cycle = 0u64;

    // Alternates sides so every call pays for a resync.
    c.bench_function("split_tune_select", |b| {
        b.iter(|| {
            cycle += 1;
            let k = if cycle % 2 == 0 { 0.001 } else { -0.001 };
            split.select(black_box(&tuning), k, &mut pid)
        });
    });
}

fn bench_full_update(c: &mut Criterion) {
    let tuning = reference_tuning();
    let mut ctrl = TorqueController::new(
        &ControllerConfig::default(),
        &tuning,
        VehicleModel::new(VehicleParams::default()),
        Box::new(default_steer_feedforward),
    );
    let mut cycle = 0u64;

    c.bench_function("torque_controller_update", |b| {
        b.iter(|| {
            cycle += 1;
            let t = cycle as f64 * DT_CTRL;
            let input = TickInput {
                active: true,
                v_ego: 20.0,
                steering_angle_deg: 2.0 * t.sin(),
                yaw_rate: 0.02 * t.sin(),
                roll: 0.01,
                desired_curvature: 0.001 * t.sin(),
                desired_curvature_rate: 0.001 * t.cos(),
                ..Default::default()
            };
            ctrl.update(black_box(&input), &tuning)
        });
    });
}

criterion_group!(benches, bench_pid_only, bench_split_select, bench_full_update);
criterion_main!(benches);
