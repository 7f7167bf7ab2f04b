//! JSON-lines telemetry reader.
//!
//! One JSON object per line, shaped like [`CycleInput`]. Missing fields take
//! their defaults. Blank lines and lines starting with `#` are skipped.

use std::io::BufRead;

use ecu_common::snapshot::CycleInput;

use super::{IoError, TelemetrySource};

/// Reads [`CycleInput`]s from a line-oriented stream.
#[derive(Debug)]
pub struct JsonLinesTelemetry<R> {
    reader: R,
    line: u64,
    buf: String,
}

impl<R: BufRead> JsonLinesTelemetry<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line: 0, buf: String::new() }
    }

    /// Lines consumed so far.
    #[inline]
    pub fn line(&self) -> u64 {
        self.line
    }
}

impl<R: BufRead> TelemetrySource for JsonLinesTelemetry<R> {
    fn next_input(&mut self) -> Result<Option<CycleInput>, IoError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            return serde_json::from_str(text)
                .map(Some)
                .map_err(|source| IoError::Decode { line: self.line, source });
        }
    }
}
