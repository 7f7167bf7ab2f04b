//! Per-cycle fault sweep.
//!
//! Evaluates every check in [`FAULT_CHECKS`] order and collects the ids
//! whose predicate holds. Pure: the same inputs always give the same set.

use ecu_common::fault::FaultSet;
use ecu_common::state::State;

use super::checks::{FaultInputs, FAULT_CHECKS};

/// Classify the snapshot into a fresh [`FaultSet`].
///
/// `state` only scopes state-bound checks (see [`super::FaultCheck::applies_in`]).
pub fn classify(inputs: &FaultInputs<'_>, state: State) -> FaultSet {
    let mut faults = FaultSet::new();
    for check in FAULT_CHECKS.iter() {
        if check.applies_in(state) && check.holds(inputs) {
            faults.insert(check.id);
        }
    }
    faults
}
