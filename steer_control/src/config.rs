//! Lateral controller configuration loading and hot reload.
//!
//! Startup loads one TOML file into [`LateralConfig`] and validates it.
//! While running, only the `[tuning]` table may be reloaded: a shadow copy
//! is parsed, validated and scope-checked, then swapped into the active
//! configuration. Any failure leaves the active configuration untouched.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use steer_common::config::{ConfigError as SharedConfigError, ConfigLoader};
use steer_common::lateral::config::LateralConfig;
use steer_common::lateral::tuning::{LateralTuning, TuningField, TuningSide};
use thiserror::Error;

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// File read failure.
    #[error("config I/O error: {0}")]
    Io(String),
    /// TOML parse / shape failure.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Bounds or consistency failure.
    #[error("config validation: {0}")]
    Validation(String),
    /// Shadow config rejected during hot reload.
    #[error("reload validation failed: {0}")]
    ReloadValidationFailed(String),
    /// Shadow config changes a field that requires a restart.
    #[error("reload scope violation: {0}")]
    ReloadScopeViolation(String),
}

impl From<SharedConfigError> for ConfigError {
    fn from(e: SharedConfigError) -> Self {
        match e {
            SharedConfigError::FileNotFound(_) | SharedConfigError::Io(_) => {
                Self::Io(e.to_string())
            }
            SharedConfigError::ParseError(m) => Self::Parse(m),
            SharedConfigError::ValidationError(m) => Self::Validation(m),
        }
    }
}

// ─── Startup Loading ────────────────────────────────────────────────

/// Load and validate the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<LateralConfig, ConfigError> {
    let config = LateralConfig::load(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse and validate a configuration document (for testing and reload).
pub fn load_config_from_str(content: &str) -> Result<LateralConfig, ConfigError> {
    let config = LateralConfig::from_toml_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Startup validation: shared settings plus every lateral section.
pub fn validate_config(config: &LateralConfig) -> Result<(), ConfigError> {
    config.shared.validate()?;
    config.validate().map_err(ConfigError::Validation)
}

// ─── Hot-Reload: Shadow Tuning ──────────────────────────────────────

/// Validated replacement tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowTuning {
    pub tuning: LateralTuning,
}

/// Parse and validate a shadow configuration against the active one.
///
/// Steps:
/// 1. Parse the full document
/// 2. Same validation as startup
/// 3. Reloadable-scope check
pub fn parse_shadow_config(
    content: &str,
    active: &LateralConfig,
) -> Result<ShadowTuning, ConfigError> {
    let shadow: LateralConfig = toml::from_str(content)
        .map_err(|e| ConfigError::ReloadValidationFailed(format!("parse: {e}")))?;

    validate_config(&shadow)
        .map_err(|e| ConfigError::ReloadValidationFailed(format!("{e}")))?;

    validate_reload_scope(active, &shadow)?;

    Ok(ShadowTuning {
        tuning: shadow.tuning,
    })
}

/// Reject shadow configs that change anything outside `[tuning]`.
///
/// `[shared]` is not reloaded; changes there are ignored.
pub fn validate_reload_scope(
    active: &LateralConfig,
    shadow: &LateralConfig,
) -> Result<(), ConfigError> {
    if active.controller != shadow.controller {
        return Err(ConfigError::ReloadScopeViolation(format!(
            "[controller] changed: {:?} → {:?} (requires restart)",
            active.controller, shadow.controller,
        )));
    }
    if active.vehicle != shadow.vehicle {
        return Err(ConfigError::ReloadScopeViolation(
            "[vehicle] changed (requires restart)".to_string(),
        ));
    }
    Ok(())
}

/// Outcome of [`atomic_tuning_swap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadResult {
    /// Tuning swapped; fields that differ in either tuning set.
    Success(TuningField),
    /// Document valid but tuning identical to the active one.
    Unchanged,
    /// Rejected; active config unchanged.
    ValidationFailed(String),
}

/// Parse, validate and swap the `[tuning]` table into `active`.
pub fn atomic_tuning_swap(active: &mut LateralConfig, content: &str) -> ReloadResult {
    let shadow = match parse_shadow_config(content, active) {
        Ok(s) => s,
        Err(e) => return ReloadResult::ValidationFailed(e.to_string()),
    };

    let old = &active.tuning;
    let new = &shadow.tuning;
    let mut changed = old.default.drift(&new.default);
    changed |= old.set(TuningSide::Right).drift(new.set(TuningSide::Right));
    let flag_changed = old.split_tune != new.split_tune;
    let presence_changed = old.right.is_some() != new.right.is_some();

    if changed.is_empty() && !flag_changed && !presence_changed {
        return ReloadResult::Unchanged;
    }

    active.tuning = shadow.tuning;
    ReloadResult::Success(changed)
}

// ─── File Watcher ───────────────────────────────────────────────────

/// Modification-time poller for the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    /// Watch `path`, taking its current modification time as the baseline.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified(&path);
        Self {
            path,
            last_modified,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the file contents if it changed since the last poll.
    ///
    /// A file that has gone missing is reported as unchanged.
    pub fn poll(&mut self) -> Result<Option<String>, ConfigError> {
        let Some(mtime) = modified(&self.path) else {
            return Ok(None);
        };
        if self.last_modified == Some(mtime) {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", self.path.display())))?;
        self.last_modified = Some(mtime);
        Ok(Some(content))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

// ─── Tests ──────────────────────────────────────────────────────────
