//! Actuator command emitted once per control cycle.

use serde::{Deserialize, Serialize};

/// Outputs of one cycle, written to the actuator collaborator before any
/// display report.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// Inverter drive enable.
    pub drive_enable: bool,
    /// Requested motor current [A]. Negative values request regeneration.
    pub requested_current: f64,
    /// Software latch of the shutdown circuit. Low only in `ERROR`.
    pub software_ok: bool,
    /// Precharge request to the accumulator.
    pub precharge_request: bool,
}

impl ActuatorCommand {
    /// All outputs off, software latch closed.
    pub const fn disabled() -> Self {
        Self {
            drive_enable: false,
            requested_current: 0.0,
            software_ok: true,
            precharge_request: false,
        }
    }

    /// Drive enabled with the given current request.
    pub const fn drive(requested_current: f64) -> Self {
        Self { drive_enable: true, requested_current, ..Self::disabled() }
    }

    /// Outputs for the `ERROR` state.
    pub const fn fault() -> Self {
        Self { software_ok: false, ..Self::disabled() }
    }

    #[inline]
    pub fn is_regenerating(&self) -> bool {
        self.drive_enable && self.requested_current < 0.0
    }
}
