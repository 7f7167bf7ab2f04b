//! Fault module root.
//!
//! Per-fault predicates and the per-cycle classifier sweep.

pub mod checks;
pub mod classifier;

pub use checks::{FaultCheck, FaultInputs, FaultPredicate, FAULT_CHECKS, check_for};
pub use classifier::classify;
