//! Fault response rules.
//!
//! Maps each active fault class onto its effect for the cycle:
//!
//! - **Critical**: the state machine enters `ERROR` and pins the first
//!   critical id in evaluation order.
//! - **Limiting**: drive continues with the power level derated to slot 0.
//! - **Warning**: no effect on the drive path. Warnings reach the dashboard
//!   through the fault report, not through this result.
//!
//! The state machine is the only caller. Zero allocation.

use ecu_common::fault::{FaultId, FaultSet};
use ecu_common::tune::TuneSelection;

// ─── Propagation Result ─────────────────────────────────────────────

/// Outcome of a per-cycle fault evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationResult {
    /// First critical fault in evaluation order. `Some` → enter `ERROR`
    /// and pin it.
    pub first_critical: Option<FaultId>,
    /// At least one LIMITING fault is active → derate power.
    pub derate: bool,
}

impl PropagationResult {
    /// Apply the limiting response to a mode's tune selection.
    #[inline]
    pub const fn limit_selection(&self, selection: TuneSelection) -> TuneSelection {
        if self.derate { selection.derated() } else { selection }
    }
}

// ─── Fault Evaluation ───────────────────────────────────────────────

/// Evaluate the classifier output and determine the response (called every cycle).
pub fn evaluate_faults(faults: &FaultSet) -> PropagationResult {
    PropagationResult { first_critical: faults.first_critical(), derate: faults.has_limiting() }
}

// ─── Tests ──────────────────────────────────────────────────────────
