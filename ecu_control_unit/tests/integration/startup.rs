//! Startup sequencing through the cycle runner.
//!
//! ECU_FLASH gate, the precharge handshake and the ready-to-drive brake
//! check, driven by scripted telemetry.

use ecu_common::command::ActuatorCommand;
use ecu_common::config::EcuConfig;
use ecu_common::fault::FaultId;
use ecu_common::state::{Mode, State};
use ecu_control_unit::cycle::CycleRunner;
use ecu_control_unit::io::{RecordingSink, ScriptedTelemetry};
use ecu_control_unit::state::{DriveStateMachine, FlashError};

use super::{healthy, tune_config};

fn runner(
    machine: DriveStateMachine,
    telemetry: ScriptedTelemetry,
) -> CycleRunner<ScriptedTelemetry, RecordingSink> {
    CycleRunner::new(&EcuConfig::default(), machine, telemetry, RecordingSink::new())
}

/// Run to the end of the script, collecting the state after every cycle.
fn states(runner: &mut CycleRunner<ScriptedTelemetry, RecordingSink>) -> Vec<State> {
    let mut out = Vec::new();
    while let Some(outcome) = runner.run_once().expect("in-memory I/O") {
        out.push(outcome.next);
    }
    out
}

#[test]
fn unflashed_car_never_leaves_ecu_flash() {
    let mut script = ScriptedTelemetry::new();
    let mut s = healthy();
    s.ts_active = true;
    s.precharge_started = true;
    s.precharge_done = true;
    script.repeat(50, Mode::Endurance, s);

    let mut r = runner(DriveStateMachine::new(&EcuConfig::default()), script);
    let seen = states(&mut r);
    assert_eq!(seen.len(), 50);
    assert!(seen.iter().all(|s| *s == State::EcuFlash));
    assert!(r.output().commands().all(|c| *c == ActuatorCommand::disabled()));
}

#[test]
fn full_handshake_reaches_drive_standby() {
    let mut s = healthy();
    let mut script = ScriptedTelemetry::new();
    script.repeat(2, Mode::Endurance, s);
    s.ts_active = true;
    script.repeat(2, Mode::Endurance, s);
    s.precharge_started = true;
    script.repeat(3, Mode::Endurance, s);
    s.precharge_done = true;
    script.repeat(2, Mode::Endurance, s);
    s.ready_to_drive = true;
    s.brake_pressure_front = 0.7;
    s.brake_pressure_rear = 0.7;
    script.push(Mode::Endurance, s);

    let mut machine = DriveStateMachine::new(&EcuConfig::default());
    machine.flash(&tune_config()).expect("valid tune");
    let mut r = runner(machine, script);

    let seen = states(&mut r);
    assert_eq!(
        seen,
        vec![
            State::GlvOn,
            State::GlvOn,
            State::TsPrecharge,
            State::TsPrecharge,
            State::Precharging,
            State::Precharging,
            State::Precharging,
            State::PrechargeComplete,
            State::PrechargeComplete,
            State::DriveStandby,
        ]
    );
    assert_eq!(r.machine().state(), State::DriveStandby);

    // Commands come from the state the cycle started in: precharge is
    // requested for every cycle begun in TS_PRECHARGE or PRECHARGING.
    let requests: Vec<bool> = r.output().commands().map(|c| c.precharge_request).collect();
    assert_eq!(
        requests,
        vec![false, false, false, true, true, true, true, true, false, false]
    );
    assert!(r.output().commands().all(|c| !c.drive_enable && c.requested_current == 0.0));
}

#[test]
fn skipped_handshake_step_is_ignored() {
    // precharge_done without precharge_started: TS_PRECHARGE must wait.
    let mut s = healthy();
    s.ts_active = true;
    s.precharge_done = true;
    let mut script = ScriptedTelemetry::new();
    script.repeat(5, Mode::Endurance, s);

    let mut machine = DriveStateMachine::new(&EcuConfig::default());
    machine.flash(&tune_config()).expect("valid tune");
    let mut r = runner(machine, script);

    let seen = states(&mut r);
    assert_eq!(seen[0], State::GlvOn);
    assert!(seen[1..].iter().all(|s| *s == State::TsPrecharge));
}

#[test]
fn ready_to_drive_with_throttle_faults() {
    let mut machine = DriveStateMachine::new(&EcuConfig::default());
    machine.flash(&tune_config()).expect("valid tune");

    let mut s = healthy();
    machine.step(&s, Mode::Endurance);
    s.ts_active = true;
    machine.step(&s, Mode::Endurance);
    s.precharge_started = true;
    machine.step(&s, Mode::Endurance);
    s.precharge_done = true;
    assert_eq!(machine.step(&s, Mode::Endurance).next, State::PrechargeComplete);

    s.ready_to_drive = true;
    s.brake_pressure_front = 0.7;
    s.brake_pressure_rear = 0.7;
    s.apps1 = 0.2;
    s.apps2 = 0.1;
    let out = machine.step(&s, Mode::Endurance);
    assert_eq!(out.next, State::Error);
    assert_eq!(out.pinned, Some(FaultId::RtdBrake));
    assert!(!out.command.software_ok);

    // Released: back to GLV_ON, the handshake restarts.
    s.ready_to_drive = false;
    s.apps1 = 0.0;
    s.apps2 = 0.0;
    assert_eq!(machine.step(&s, Mode::Endurance).next, State::GlvOn);
}

#[test]
fn ready_to_drive_with_one_brake_faults() {
    let mut machine = DriveStateMachine::new(&EcuConfig::default());
    machine.flash(&tune_config()).expect("valid tune");
    let mut s = healthy();
    s.ts_active = true;
    s.precharge_started = true;
    s.precharge_done = true;
    for _ in 0..4 {
        machine.step(&s, Mode::Endurance);
    }
    assert_eq!(machine.state(), State::PrechargeComplete);

    s.ready_to_drive = true;
    s.brake_pressure_front = 0.7;
    s.brake_pressure_rear = 0.0;
    assert_eq!(machine.step(&s, Mode::Endurance).pinned, Some(FaultId::RtdBrake));
}

#[test]
fn flash_only_accepted_before_first_step() {
    let mut machine = DriveStateMachine::new(&EcuConfig::default());
    machine.flash(&tune_config()).expect("valid tune");
    machine.step(&healthy(), Mode::Endurance);
    assert_eq!(machine.state(), State::GlvOn);
    assert_eq!(machine.flash(&tune_config()), Err(FlashError::Rejected(State::GlvOn)));
}
