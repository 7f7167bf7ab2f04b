//! JSON-lines output for actuator commands and fault reports.
//!
//! Both record kinds share one stream, tagged by `"kind"`:
//!
//! ```text
//! {"kind":"command","cycle":7,"drive_enable":true,"requested_current":12.5,...}
//! {"kind":"faults","cycle":7,"state":"Error","critical":8,...}
//! ```

use std::io::Write;

use ecu_common::command::ActuatorCommand;
use ecu_common::report::FaultReport;
use serde::Serialize;

use super::{ActuatorSink, FaultDisplay, IoError};

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Record<'a> {
    Command {
        cycle: u64,
        #[serde(flatten)]
        command: &'a ActuatorCommand,
    },
    Faults {
        cycle: u64,
        #[serde(flatten)]
        report: &'a FaultReport,
    },
}

/// Writes commands and reports as JSON lines.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, record: &Record<'_>) -> Result<(), IoError> {
        serde_json::to_writer(&mut self.writer, record).map_err(IoError::Encode)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> ActuatorSink for JsonLinesSink<W> {
    fn apply(&mut self, cycle: u64, command: &ActuatorCommand) -> Result<(), IoError> {
        self.emit(&Record::Command { cycle, command })
    }
}

impl<W: Write> FaultDisplay for JsonLinesSink<W> {
    fn report(&mut self, cycle: u64, report: &FaultReport) -> Result<(), IoError> {
        self.emit(&Record::Faults { cycle, report })
    }
}
