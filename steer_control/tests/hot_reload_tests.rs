//! Hot-reload integration tests.
//!
//! Verifies the full reload pipeline against files on disk:
//! - A changed `[tuning]` table is swapped in and reaches the PID on the
//!   next tick without resetting the integrator.
//! - Scope violations (`[controller]`, `[vehicle]`) and invalid documents
//!   are rejected and leave the active config untouched.
//! - The watcher only reports a file once per modification.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use steer_common::lateral::state::TickInput;
use steer_common::lateral::tuning::TuningField;
use steer_control::config::{
    ConfigError, ConfigWatcher, ReloadResult, atomic_tuning_swap, load_config,
    parse_shadow_config,
};
use steer_control::control::torque::TorqueController;

// ─── Helpers ────────────────────────────────────────────────────────

fn document(split: bool, kp: f64, steer_max: f64) -> String {
    format!(
        r#"
[shared]
service_name = "reload-test"

[controller]
steer_max = {steer_max:?}

[vehicle]
mass = 1500.0
wheelbase = 2.7
center_to_front = 1.2
tire_stiffness_front = 200000.0
tire_stiffness_rear = 300000.0
steer_ratio = 15.0

[tuning]
split_tune = {split}

[tuning.default]
kp = {kp:?}
ki = 0.1
kf = 1.0
friction = 0.1
use_steering_angle = false

[tuning.right]
kp = 0.5
ki = 0.2
kf = 1.5
friction = 0.15
use_steering_angle = false
"#
    )
}

/// Rewrite `path` and push its mtime forward so coarse filesystems see it.
fn rewrite(path: &Path, content: &str, bump_s: u64) {
    fs::write(path, content).unwrap();
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(bump_s))
        .unwrap();
}

fn engaged(k: f64) -> TickInput {
    TickInput {
        active: true,
        v_ego: 20.0,
        desired_curvature: k,
        ..Default::default()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[test]
fn reload_reaches_pid_without_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lateral.toml");
    fs::write(&path, document(false, 1.0, 1.0)).unwrap();

    let mut active = load_config(&path).unwrap();
    let mut watcher = ConfigWatcher::new(&path);
    let mut ctrl = TorqueController::from_config(&active);

    for _ in 0..30 {
        ctrl.update(&engaged(0.0005), &active.tuning);
    }
    let integral = ctrl.pid().integral();
    assert!(integral > 0.0);

    rewrite(&path, &document(false, 1.4, 1.0), 5);
    let content = watcher.poll().unwrap().expect("modified file reported");
    assert_eq!(
        atomic_tuning_swap(&mut active, &content),
        ReloadResult::Success(TuningField::KP)
    );

    ctrl.update(&engaged(0.0), &active.tuning);
    assert_eq!(ctrl.pid().gains().kp, 1.4);
    assert_eq!(ctrl.pid().integral(), integral);
}

#[test]
fn reload_enables_split_tune() {
    let mut active = steer_control::config::load_config_from_str(&document(false, 1.0, 1.0))
        .unwrap();
    let mut ctrl = TorqueController::from_config(&active);

    let out = ctrl.update(&engaged(0.001), &active.tuning);
    assert!(!out.diagnostics.using_right_tune);

    let result = atomic_tuning_swap(&mut active, &document(true, 1.0, 1.0));
    assert!(matches!(result, ReloadResult::Success(_)));

    let out = ctrl.update(&engaged(0.001), &active.tuning);
    assert!(out.diagnostics.using_right_tune);
    assert_eq!(ctrl.pid().gains().kp, 0.5);
}

#[test]
fn controller_section_change_rejected() {
    let mut active = steer_control::config::load_config_from_str(&document(false, 1.0, 1.0))
        .unwrap();
    let before = active.clone();

    let result = atomic_tuning_swap(&mut active, &document(false, 2.0, 2.0));
    assert!(matches!(result, ReloadResult::ValidationFailed(_)));
    assert_eq!(active.tuning, before.tuning);
    assert_eq!(active.controller, before.controller);

    let err = parse_shadow_config(&document(false, 2.0, 2.0), &before).unwrap_err();
    assert!(matches!(err, ConfigError::ReloadScopeViolation(_)), "got: {err}");
}

#[test]
fn invalid_document_rejected() {
    let mut active = steer_control::config::load_config_from_str(&document(false, 1.0, 1.0))
        .unwrap();
    let result = atomic_tuning_swap(&mut active, &document(false, -1.0, 1.0));
    assert!(matches!(result, ReloadResult::ValidationFailed(ref m) if m.contains("kp")));
    assert_eq!(active.tuning.default.kp, 1.0);

    let result = atomic_tuning_swap(&mut active, "not = [valid");
    assert!(matches!(result, ReloadResult::ValidationFailed(_)));
}

#[test]
fn watcher_reports_each_modification_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lateral.toml");
    fs::write(&path, document(false, 1.0, 1.0)).unwrap();

    let mut watcher = ConfigWatcher::new(&path);
    assert_eq!(watcher.path(), path.as_path());
    assert!(watcher.poll().unwrap().is_none());

    rewrite(&path, &document(false, 1.2, 1.0), 5);
    assert!(watcher.poll().unwrap().is_some());
    assert!(watcher.poll().unwrap().is_none());

    rewrite(&path, &document(false, 1.3, 1.0), 10);
    let content = watcher.poll().unwrap().unwrap();
    assert!(content.contains("kp = 1.3"));
}

#[test]
fn watcher_tolerates_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let mut watcher = ConfigWatcher::new(&path);
    assert!(watcher.poll().unwrap().is_none());
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
