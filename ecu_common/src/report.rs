//! Fault report handed to the display collaborator.

use heapless::Vec as HVec;
use serde::Serialize;

use crate::fault::{DriveFault, FaultId, FaultSet, PlausibilityViolation};
use crate::state::{Mode, State};

/// Maximum entries carried by one report.
pub const MAX_REPORTED_FAULTS: usize = 16;

/// Snapshot of the fault picture for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultReport {
    pub state: State,
    pub mode: Mode,
    /// Active critical bits ([`crate::fault::FaultFlags`]).
    pub critical: u16,
    pub limiting: u16,
    pub warnings: u16,
    /// Fault holding the machine in `ERROR`.
    pub pinned: Option<FaultId>,
    /// Plausibility popup for this cycle.
    pub violation: Option<PlausibilityViolation>,
    /// Classified faults in evaluation order, then the plausibility
    /// violation, then a configuration fault while no tune is installed.
    pub faults: HVec<DriveFault, MAX_REPORTED_FAULTS>,
}

impl FaultReport {
    pub fn new(
        state: State,
        mode: Mode,
        faults: &FaultSet,
        pinned: Option<FaultId>,
        violation: Option<PlausibilityViolation>,
        tune_installed: bool,
    ) -> Self {
        let configuration = (!tune_installed).then_some(DriveFault::Configuration);
        let entries = faults
            .iter()
            .map(DriveFault::from)
            .chain(violation.map(DriveFault::from))
            .chain(configuration);

        let mut list = HVec::new();
        for fault in entries {
            // COUNT + 2 <= MAX_REPORTED_FAULTS, so push cannot fail.
            let _ = list.push(fault);
        }
        Self {
            state,
            mode,
            critical: faults.critical().bits(),
            limiting: faults.limiting().bits(),
            warnings: faults.warnings().bits(),
            pinned,
            violation,
            faults: list,
        }
    }

    /// Popup code for the dashboard, if any.
    pub fn popup_code(&self) -> Option<u8> {
        self.violation.map(|v| v.popup_code())
    }

    pub fn is_clear(&self) -> bool {
        self.faults.is_empty()
    }
}

static_assertions::const_assert!(FaultId::COUNT + 2 <= MAX_REPORTED_FAULTS);
