//! Prelude module for common re-exports.
//!
//! ```rust
//! use ecu_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, DriveThresholds, EcuConfig, FaultThresholds, ModeTable,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CYCLE_TIME_US, TUNE_SLOTS};

// ─── Drive Model ────────────────────────────────────────────────────
pub use crate::command::ActuatorCommand;
pub use crate::fault::{DriveFault, FaultClass, FaultFlags, FaultId, FaultSet, PlausibilityViolation};
pub use crate::report::FaultReport;
pub use crate::snapshot::{CanNode, CycleInput, NodeAges, VehicleSnapshot};
pub use crate::state::{Mode, State};
pub use crate::tune::{TorqueProfile, Tune, TuneConfig, TuneError, TuneSelection};
