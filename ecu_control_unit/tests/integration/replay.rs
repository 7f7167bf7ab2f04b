//! JSON-lines replay: telemetry in, commands and reports out.

use std::sync::atomic::AtomicBool;

use ecu_common::config::EcuConfig;
use ecu_common::snapshot::CycleInput;
use ecu_common::state::Mode;
use ecu_control_unit::cycle::{CycleError, CycleRunner};
use ecu_control_unit::io::{IoError, JsonLinesSink, JsonLinesTelemetry};
use ecu_control_unit::state::DriveStateMachine;
use serde_json::Value;

use super::{healthy, tune_config};

fn line(input: &CycleInput) -> String {
    serde_json::to_string(input).expect("serializable input")
}

fn replay(input: &str) -> (Result<(), CycleError>, Vec<Value>) {
    let mut machine = DriveStateMachine::new(&EcuConfig::default());
    machine.flash(&tune_config()).expect("valid tune");

    let telemetry = JsonLinesTelemetry::new(input.as_bytes());
    let output = JsonLinesSink::new(Vec::new());
    let mut runner = CycleRunner::new(&EcuConfig::default(), machine, telemetry, output);
    let result = runner.run(&AtomicBool::new(true));

    let written = runner.into_output().into_inner();
    let records = String::from_utf8(written)
        .expect("utf-8 output")
        .lines()
        .map(|l| serde_json::from_str(l).expect("each line is JSON"))
        .collect();
    (result, records)
}

#[test]
fn replay_emits_command_per_cycle_and_reports_on_change() {
    let mut s = healthy();
    let mut lines = vec![line(&CycleInput { mode: Mode::Endurance, snapshot: s })];
    s.ts_active = true;
    lines.push(line(&CycleInput { mode: Mode::Endurance, snapshot: s }));
    lines.push(line(&CycleInput { mode: Mode::Endurance, snapshot: s }));
    let input = lines.join("\n");

    let (result, records) = replay(&input);
    assert!(result.is_ok());

    let commands: Vec<&Value> = records.iter().filter(|r| r["kind"] == "command").collect();
    let reports: Vec<&Value> = records.iter().filter(|r| r["kind"] == "faults").collect();
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[2]["cycle"], 2);
    assert_eq!(commands[2]["precharge_request"], true);

    // Cycle 0 (periodic), cycle 1 (GLV_ON → TS_PRECHARGE). Cycle 2 unchanged.
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["cycle"], 0);
    assert_eq!(reports[1]["cycle"], 1);
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let input = format!(
        "# recorded on the dyno\n\n{}\n\n{}\n",
        line(&CycleInput { mode: Mode::Pit, snapshot: healthy() }),
        line(&CycleInput { mode: Mode::Pit, snapshot: healthy() }),
    );
    let (result, records) = replay(&input);
    assert!(result.is_ok());
    assert_eq!(records.iter().filter(|r| r["kind"] == "command").count(), 2);
}

#[test]
fn malformed_line_stops_the_loop_with_its_line_number() {
    let input = format!(
        "{}\n{{\"mode\": \"warp\"}}\n{}\n",
        line(&CycleInput { mode: Mode::Endurance, snapshot: healthy() }),
        line(&CycleInput { mode: Mode::Endurance, snapshot: healthy() }),
    );
    let (result, records) = replay(&input);
    match result {
        Err(CycleError::Io(IoError::Decode { line, .. })) => assert_eq!(line, 2),
        other => panic!("expected decode error, got {other:?}"),
    }
    // The cycle before the bad line was fully emitted.
    assert_eq!(records.iter().filter(|r| r["kind"] == "command").count(), 1);
}
