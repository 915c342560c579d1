//! Steer Common Library
//!
//! Shared constants, tuning types and configuration loading utilities for
//! the lateral steering workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Control-law constants and parameter bounds
//! - [`config`] - Configuration loading traits and types
//! - [`lateral`] - Tuning sets, controller configuration, tick input/output
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use steer_common::prelude::*;
//!
//! let tune = TuningSet::default();
//! assert!(tune.validate().is_ok());
//! ```

pub mod config;
pub mod consts;
pub mod lateral;
pub mod prelude;
