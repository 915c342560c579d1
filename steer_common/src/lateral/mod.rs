//! Lateral controller shared types.
//!
//! Everything the torque controller exchanges with its callers lives here:
//! tuning sets, configuration structures, and the per-tick input/output.

pub mod config;
pub mod state;
pub mod tuning;
