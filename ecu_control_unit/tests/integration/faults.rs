//! Critical fault handling end to end: ERROR entry from every state,
//! CAN liveness boundaries, recovery and the display path.

use ecu_common::command::ActuatorCommand;
use ecu_common::config::EcuConfig;
use ecu_common::consts::{SENSE_0V5, SENSE_2V4, SENSE_3V0};
use ecu_common::fault::{FaultFlags, FaultId};
use ecu_common::snapshot::{CanNode, VehicleSnapshot};
use ecu_common::state::{Mode, State};
use ecu_control_unit::cycle::CycleRunner;
use ecu_control_unit::io::memory::{Emission, FailingDisplay};
use ecu_control_unit::io::{RecordingSink, ScriptedTelemetry, SplitOutput};

use super::{healthy, machine_in_standby, pedals};

fn assert_safe(command: &ActuatorCommand) {
    assert!(!command.drive_enable);
    assert_eq!(command.requested_current, 0.0);
    assert!(!command.software_ok);
    assert!(!command.precharge_request);
}

// ─── ERROR Entry ────────────────────────────────────────────────────

#[test]
fn shutdown_sense_faults_stop_a_driving_car() {
    let trips: [(fn(&mut VehicleSnapshot), FaultId); 5] = [
        (|s| s.ams_sense = SENSE_0V5, FaultId::Ams),
        (|s| s.imd_sense = SENSE_0V5, FaultId::Imd),
        (|s| s.bspd_sense = SENSE_0V5, FaultId::Bspd),
        // Above the healthy band is as bad as below it.
        (|s| s.ams_sense = SENSE_3V0, FaultId::Ams),
        (|s| s.bspd_sense = 0, FaultId::Bspd),
    ];

    for (trip, id) in trips {
        let mut m = machine_in_standby();
        m.step(&pedals(0.5, 0.0), Mode::Launch);
        assert_eq!(m.state(), State::DriveActive);

        let mut s = pedals(0.5, 0.0);
        trip(&mut s);
        let out = m.step(&s, Mode::Launch);
        assert_eq!(out.next, State::Error, "{id}");
        assert_eq!(out.pinned, Some(id));
        assert_safe(&out.command);
    }
}

#[test]
fn error_outputs_stay_safe_while_fault_holds() {
    let mut m = machine_in_standby();
    let mut s = pedals(0.8, 0.0);
    s.imd_sense = SENSE_0V5;
    for _ in 0..20 {
        let out = m.step(&s, Mode::Launch);
        assert_eq!(out.next, State::Error);
        assert_safe(&out.command);
    }
}

#[test]
fn limiting_and_warning_faults_never_enter_error() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.5, 0.0), Mode::Endurance);

    let mut s = pedals(0.5, 0.0);
    s.motor_temp = 150.0;
    s.coolant_temp = 80.0;
    s.last_update_age_ms.set(CanNode::Gps, 5_000);
    let out = m.step(&s, Mode::Endurance);
    assert_eq!(out.next, State::DriveActive);
    assert!(!out.faults.has_critical());
    assert!(out.faults.contains(FaultId::WarnCan));
    assert!(out.faults.contains(FaultId::MotorTempLimit));
    assert!(out.command.drive_enable);
}

// ─── CAN Liveness ───────────────────────────────────────────────────

#[test]
fn critical_can_boundary_per_node() {
    for node in CanNode::DRIVE_CRITICAL {
        let mut m = machine_in_standby();
        let mut s = healthy();
        s.last_update_age_ms.set(node, 100);
        assert_eq!(m.step(&s, Mode::Endurance).next, State::DriveStandby, "{node:?} at 100 ms");

        s.last_update_age_ms.set(node, 101);
        let out = m.step(&s, Mode::Endurance);
        assert_eq!(out.next, State::Error, "{node:?} at 101 ms");
        assert_eq!(out.pinned, Some(FaultId::CriticalCan));
    }
}

#[test]
fn non_critical_can_only_warns() {
    for node in CanNode::NON_CRITICAL {
        let mut m = machine_in_standby();
        let mut s = healthy();
        s.last_update_age_ms.set(node, 101);
        let out = m.step(&s, Mode::Endurance);
        assert_eq!(out.next, State::DriveStandby, "{node:?}");
        assert_eq!(out.faults.flags(), FaultFlags::WARN_CAN);
    }
}

#[test]
fn stale_threshold_follows_config() {
    let mut config = EcuConfig::default();
    config.faults.can_stale_threshold_ms = 250;
    let mut m = ecu_control_unit::state::DriveStateMachine::new(&config);
    m.flash(&super::tune_config()).expect("valid tune");

    let mut s = healthy();
    s.last_update_age_ms.set(CanNode::Acu, 250);
    assert_eq!(m.step(&s, Mode::Endurance).next, State::GlvOn);
    s.last_update_age_ms.set(CanNode::Acu, 251);
    assert_eq!(m.step(&s, Mode::Endurance).next, State::Error);
}

// ─── Recovery ───────────────────────────────────────────────────────

#[test]
fn recovery_restarts_the_startup_sequence() {
    let mut m = machine_in_standby();
    let mut s = healthy();
    s.bspd_sense = SENSE_0V5;
    assert_eq!(m.step(&s, Mode::Endurance).next, State::Error);

    s.bspd_sense = SENSE_2V4;
    let out = m.step(&s, Mode::Endurance);
    assert_eq!(out.next, State::GlvOn);
    assert!(out.faults.is_empty());
    assert_eq!(out.pinned, None);
    // Leaving ERROR re-closes the software latch on the next cycle.
    assert!(!out.command.software_ok);
    assert!(m.step(&s, Mode::Endurance).command.software_ok);
}

#[test]
fn recovery_walks_through_every_active_critical_fault() {
    let mut m = machine_in_standby();
    let mut s = healthy();
    s.ams_sense = SENSE_0V5;
    s.imd_sense = SENSE_0V5;
    s.last_update_age_ms.set(CanNode::Bcm, 400);

    let out = m.step(&s, Mode::Endurance);
    assert_eq!(out.pinned, Some(FaultId::CriticalCan));
    assert_eq!(out.report().critical, (FaultFlags::CRITICAL_CAN | FaultFlags::AMS | FaultFlags::IMD).bits());

    s.last_update_age_ms.set(CanNode::Bcm, 10);
    assert_eq!(m.step(&s, Mode::Endurance).pinned, Some(FaultId::Ams));
    s.ams_sense = SENSE_2V4;
    assert_eq!(m.step(&s, Mode::Endurance).pinned, Some(FaultId::Imd));
    s.imd_sense = SENSE_2V4;
    assert_eq!(m.step(&s, Mode::Endurance).next, State::GlvOn);
}

#[test]
fn brake_throttle_latch_survives_error_recovery() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.5, 0.0), Mode::Endurance);
    m.step(&pedals(0.5, 0.3), Mode::Endurance);
    assert!(m.bse_apps_violation());

    let mut s = pedals(0.5, 0.0);
    s.imd_sense = 0;
    m.step(&s, Mode::Endurance);
    assert_eq!(m.state(), State::Error);
    m.step(&pedals(0.5, 0.0), Mode::Endurance);
    assert_eq!(m.state(), State::GlvOn);
    assert!(m.bse_apps_violation());

    // Walk the handshake again. RTD needs the throttle released, but the
    // latch only clears once DRIVE_STANDBY sees it released.
    let mut s = pedals(0.0, 0.0);
    s.ts_active = true;
    s.precharge_started = true;
    s.precharge_done = true;
    m.step(&s, Mode::Endurance);
    m.step(&s, Mode::Endurance);
    m.step(&s, Mode::Endurance);
    assert_eq!(m.state(), State::PrechargeComplete);
    s.ready_to_drive = true;
    s.brake_pressure_front = 0.6;
    s.brake_pressure_rear = 0.6;
    m.step(&s, Mode::Endurance);
    assert_eq!(m.state(), State::DriveStandby);

    // Latched: throttle alone does not drive.
    let mut held = pedals(0.5, 0.0);
    held.ready_to_drive = true;
    held.ts_active = true;
    let out = m.step(&held, Mode::Endurance);
    assert_eq!(out.next, State::DriveStandby);
    assert!(out.bse_apps_violation);
    assert!(!out.command.drive_enable);

    // Release clears it, then the throttle drives again.
    let mut released = pedals(0.0, 0.0);
    released.ready_to_drive = true;
    m.step(&released, Mode::Endurance);
    assert!(!m.bse_apps_violation());
    assert_eq!(m.step(&held, Mode::Endurance).next, State::DriveActive);
}

// ─── Collaborator Ordering ──────────────────────────────────────────

#[test]
fn command_is_written_before_report() {
    let mut s = healthy();
    s.imd_sense = SENSE_0V5;
    let mut script = ScriptedTelemetry::new();
    script.repeat(3, Mode::Endurance, s);

    let mut r = CycleRunner::new(
        &EcuConfig::default(),
        machine_in_standby(),
        script,
        RecordingSink::new(),
    );
    while r.run_once().expect("in-memory I/O").is_some() {}

    let emissions = &r.output().emissions;
    assert!(matches!(emissions[0], Emission::Command(0, _)));
    match &emissions[1] {
        Emission::Report(0, report) => {
            assert_eq!(report.state, State::Error);
            assert_eq!(report.pinned, Some(FaultId::Imd));
        }
        other => panic!("expected report for cycle 0, got {other:?}"),
    }
    // Unchanged fault picture: only commands until the periodic report.
    assert!(matches!(emissions[2], Emission::Command(1, _)));
    assert!(matches!(emissions[3], Emission::Command(2, _)));
    assert_eq!(emissions.len(), 4);
}

#[test]
fn failing_display_never_blocks_the_safety_command() {
    let mut s = healthy();
    s.ams_sense = 0;
    let mut script = ScriptedTelemetry::new();
    script.repeat(10, Mode::Endurance, s);

    let output = SplitOutput::new(RecordingSink::new(), FailingDisplay);
    let mut r = CycleRunner::new(&EcuConfig::default(), machine_in_standby(), script, output);

    let mut cycles = 0;
    while let Some(outcome) = r.run_once().expect("display errors are not fatal") {
        assert_eq!(outcome.next, State::Error);
        cycles += 1;
    }
    assert_eq!(cycles, 10);

    let sink = &r.output().actuator;
    assert_eq!(sink.commands().count(), 10);
    assert!(sink.commands().all(|c| *c == ActuatorCommand::fault()));
}
