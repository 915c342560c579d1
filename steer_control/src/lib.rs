//! # Lateral Torque Controller
//!
//! Converts a planner's desired path curvature into a steering torque
//! command once per control tick. The control law closes the loop on
//! lateral acceleration with a PID + feedforward, compensates steering
//! friction and road roll, and adds a curvature term so tracking still
//! registers at low speed.
//!
//! Gains may be changed while driving. Two tuning sets (default and
//! right-turn) can be selected by curve direction ("split tune"); gain
//! changes are written into the live PID without discarding its integral.
//!
//! ## Layout
//!
//! - [`control`] - PID primitive, feedforward, saturation, torque law
//! - [`tuning`] - split-tune selection and live re-tune
//! - [`vehicle`] - curvature model
//! - [`config`] - loading and hot reload of the `[tuning]` table
//! - [`cycle`] / [`sim`] - fixed-rate loop against a simulated vehicle

pub mod config;
pub mod control;
pub mod cycle;
pub mod sim;
pub mod tuning;
pub mod vehicle;
