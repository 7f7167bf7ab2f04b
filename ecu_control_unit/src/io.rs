//! Collaborator boundary.
//!
//! The core talks to the outside world through three traits:
//!
//! - [`TelemetrySource`]: one [`CycleInput`] per cycle (snapshot + mode)
//! - [`ActuatorSink`]: the cycle's [`ActuatorCommand`]
//! - [`FaultDisplay`]: the [`FaultReport`] for the dashboard
//!
//! The cycle runner takes one output implementing both sink traits; wrap
//! separate objects in [`SplitOutput`].
//!
//! CAN framing, ADC sampling and dashboard rendering live behind these
//! traits. Adapters: JSON lines over any reader/writer ([`reader`],
//! [`writer`]) and in-memory scripting for tests ([`memory`]).

pub mod memory;
pub mod reader;
pub mod writer;

use ecu_common::command::ActuatorCommand;
use ecu_common::report::FaultReport;
use ecu_common::snapshot::CycleInput;
use thiserror::Error;

pub use memory::{RecordingSink, ScriptedTelemetry};
pub use reader::JsonLinesTelemetry;
pub use writer::JsonLinesSink;

/// Collaborator I/O failure.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input on line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Source of per-cycle telemetry.
pub trait TelemetrySource {
    /// Next cycle's input, or `None` at end of stream.
    fn next_input(&mut self) -> Result<Option<CycleInput>, IoError>;
}

/// Motor-controller interface.
pub trait ActuatorSink {
    fn apply(&mut self, cycle: u64, command: &ActuatorCommand) -> Result<(), IoError>;
}

/// Dashboard/display collaborator.
pub trait FaultDisplay {
    fn report(&mut self, cycle: u64, report: &FaultReport) -> Result<(), IoError>;
}

/// Actuator and display collaborators as one output, for when they are
/// separate objects.
#[derive(Debug, Clone, Default)]
pub struct SplitOutput<A, D> {
    pub actuator: A,
    pub display: D,
}

impl<A, D> SplitOutput<A, D> {
    pub fn new(actuator: A, display: D) -> Self {
        Self { actuator, display }
    }
}

impl<A: ActuatorSink, D> ActuatorSink for SplitOutput<A, D> {
    fn apply(&mut self, cycle: u64, command: &ActuatorCommand) -> Result<(), IoError> {
        self.actuator.apply(cycle, command)
    }
}

impl<A, D: FaultDisplay> FaultDisplay for SplitOutput<A, D> {
    fn report(&mut self, cycle: u64, report: &FaultReport) -> Result<(), IoError> {
        self.display.report(cycle, report)
    }
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for &mut T {
    fn next_input(&mut self) -> Result<Option<CycleInput>, IoError> {
        (**self).next_input()
    }
}

impl<T: ActuatorSink + ?Sized> ActuatorSink for &mut T {
    fn apply(&mut self, cycle: u64, command: &ActuatorCommand) -> Result<(), IoError> {
        (**self).apply(cycle, command)
    }
}

impl<T: FaultDisplay + ?Sized> FaultDisplay for &mut T {
    fn report(&mut self, cycle: u64, report: &FaultReport) -> Result<(), IoError> {
        (**self).report(cycle, report)
    }
}
