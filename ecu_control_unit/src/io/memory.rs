//! In-memory collaborators for tests, benches and replay.

use std::collections::VecDeque;

use ecu_common::command::ActuatorCommand;
use ecu_common::report::FaultReport;
use ecu_common::snapshot::{CycleInput, VehicleSnapshot};
use ecu_common::state::Mode;

use super::{ActuatorSink, FaultDisplay, IoError, TelemetrySource};

/// Telemetry replayed from a queue.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTelemetry {
    inputs: VecDeque<CycleInput>,
}

impl ScriptedTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one cycle.
    pub fn push(&mut self, mode: Mode, snapshot: VehicleSnapshot) -> &mut Self {
        self.inputs.push_back(CycleInput { mode, snapshot });
        self
    }

    /// Queue the same cycle `count` times.
    pub fn repeat(&mut self, count: usize, mode: Mode, snapshot: VehicleSnapshot) -> &mut Self {
        for _ in 0..count {
            self.push(mode, snapshot);
        }
        self
    }

    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

impl FromIterator<CycleInput> for ScriptedTelemetry {
    fn from_iter<I: IntoIterator<Item = CycleInput>>(iter: I) -> Self {
        Self { inputs: iter.into_iter().collect() }
    }
}

impl TelemetrySource for ScriptedTelemetry {
    fn next_input(&mut self) -> Result<Option<CycleInput>, IoError> {
        Ok(self.inputs.pop_front())
    }
}

/// One observed collaborator call, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Command(u64, ActuatorCommand),
    Report(u64, FaultReport),
}

/// Records everything written to it.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub emissions: Vec<Emission>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> impl Iterator<Item = &ActuatorCommand> + '_ {
        self.emissions.iter().filter_map(|e| match e {
            Emission::Command(_, c) => Some(c),
            Emission::Report(..) => None,
        })
    }

    pub fn reports(&self) -> impl Iterator<Item = &FaultReport> + '_ {
        self.emissions.iter().filter_map(|e| match e {
            Emission::Report(_, r) => Some(r),
            Emission::Command(..) => None,
        })
    }

    pub fn last_command(&self) -> Option<&ActuatorCommand> {
        self.commands().last()
    }
}

impl ActuatorSink for RecordingSink {
    fn apply(&mut self, cycle: u64, command: &ActuatorCommand) -> Result<(), IoError> {
        self.emissions.push(Emission::Command(cycle, *command));
        Ok(())
    }
}

impl FaultDisplay for RecordingSink {
    fn report(&mut self, cycle: u64, report: &FaultReport) -> Result<(), IoError> {
        self.emissions.push(Emission::Report(cycle, report.clone()));
        Ok(())
    }
}

/// Display that always fails, for checking the command path does not
/// depend on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDisplay;

impl FaultDisplay for FailingDisplay {
    fn report(&mut self, _cycle: u64, _report: &FaultReport) -> Result<(), IoError> {
        Err(IoError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "display offline")))
    }
}
