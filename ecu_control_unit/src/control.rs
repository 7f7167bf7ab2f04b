//! Torque calculator root.
//!
//! Throttle-to-current shaping with RPM fall-off, and brake-to-regen
//! current under the accumulator's charge ceiling.

pub mod regen;
pub mod torque;

pub use torque::TorqueCalculator;
