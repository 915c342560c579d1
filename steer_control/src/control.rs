//! Control engine root.
//!
//! Torque-domain lateral control: PID + lateral-acceleration feedforward +
//! friction compensation, with debounced saturation reporting.

pub mod feedforward;
pub mod interp;
pub mod pid;
pub mod saturation;
pub mod torque;
