//! Torque delivery, regen and pedal plausibility from DRIVE_STANDBY.

use ecu_common::fault::{FaultId, PlausibilityViolation};
use ecu_common::state::{Mode, State};

use super::{machine_in_standby, pedals};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ─── Torque ─────────────────────────────────────────────────────────

#[test]
fn throttle_drives_linear_profile() {
    let mut m = machine_in_standby();
    let out = m.step(&pedals(0.4, 0.0), Mode::Endurance);
    assert_eq!(out.next, State::DriveActive);
    assert_eq!(out.command.requested_current, 0.0, "entry cycle does not drive");

    // Endurance: profile 1 (linear), power level 1 = 100 A.
    let out = m.step(&pedals(0.4, 0.0), Mode::Endurance);
    assert_eq!(out.next, State::DriveActive);
    assert!(out.command.drive_enable);
    assert!(out.command.software_ok);
    assert!(close(out.command.requested_current, 40.0));
}

#[test]
fn shaped_profile_falls_off_with_speed() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.5, 0.0), Mode::Autox);

    // Autox: profile 2 (k 0.5, p 2, b 0.2), power level 2 = 150 A.
    // y = 2750 / 5500 = 0.5; z = 0.5 - 0.5 * 0.7 * 0.25 * 0.5 = 0.45625.
    let mut s = pedals(0.5, 0.0);
    s.erpm = 27_500.0;
    let out = m.step(&s, Mode::Autox);
    assert!(close(out.command.requested_current, 0.45625 * 150.0));

    s.erpm = 0.0;
    let out = m.step(&s, Mode::Autox);
    assert!(close(out.command.requested_current, 75.0));
}

#[test]
fn mode_change_switches_tune_slots() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.5, 0.0), Mode::Testing);
    let testing = m.step(&pedals(0.5, 0.0), Mode::Testing).command.requested_current;
    let launch = m.step(&pedals(0.5, 0.0), Mode::Launch).command.requested_current;
    // Testing: 50 A linear. Launch: 200 A with profile 3 at zero speed.
    assert!(close(testing, 25.0));
    assert!(close(launch, 100.0));
}

#[test]
fn rev_limit_derates_power() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.5, 0.0), Mode::Endurance);

    let mut s = pedals(0.5, 0.0);
    s.erpm = 55_000.0;
    let out = m.step(&s, Mode::Endurance);
    assert_eq!(out.next, State::DriveActive);
    assert!(out.faults.contains(FaultId::RevLimit));
    assert_eq!(out.selection.power_level, 0);
    assert!(close(out.command.requested_current, 25.0));
}

#[test]
fn over_temperature_derates_but_keeps_driving() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.6, 0.0), Mode::Launch);

    let mut s = pedals(0.6, 0.0);
    s.battery_temp = 55.0;
    let out = m.step(&s, Mode::Launch);
    assert_eq!(out.next, State::DriveActive);
    assert!(out.faults.contains(FaultId::BatteryTempLimit));
    assert!(out.faults.contains(FaultId::BatteryTempWarn));
    // Throttle map and regen level are untouched; only power level drops.
    assert_eq!(out.selection.throttle_map, 3);
    assert_eq!(out.selection.power_level, 0);
    assert!(close(out.command.requested_current, 0.6 * 50.0));

    s.battery_temp = 40.0;
    let out = m.step(&s, Mode::Launch);
    assert!(close(out.command.requested_current, 0.6 * 200.0));
}

#[test]
fn releasing_throttle_keeps_active_at_zero_current() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.5, 0.0), Mode::Endurance);
    let out = m.step(&pedals(0.0, 0.0), Mode::Endurance);
    assert_eq!(out.next, State::DriveActive);
    assert!(out.command.drive_enable);
    assert_eq!(out.command.requested_current, 0.0);
}

// ─── Regen ──────────────────────────────────────────────────────────

#[test]
fn braking_enters_regen_and_requests_negative_current() {
    let mut m = machine_in_standby();
    let mut s = pedals(0.0, 0.5);
    s.erpm = 20_000.0;
    s.max_charge_current = Some(40.0);
    assert_eq!(m.step(&s, Mode::Endurance).next, State::DriveRegen);

    // Endurance regen level 2 = 0.5: 0.5 * 40 * 0.5 = 10 A.
    let out = m.step(&s, Mode::Endurance);
    assert_eq!(out.next, State::DriveRegen);
    assert!(out.command.is_regenerating());
    assert!(close(out.command.requested_current, -10.0));
}

#[test]
fn regen_below_rpm_floor_is_zero() {
    let mut m = machine_in_standby();
    let mut s = pedals(0.0, 0.5);
    s.erpm = 4_000.0;
    s.max_charge_current = Some(40.0);
    m.step(&s, Mode::Endurance);
    let out = m.step(&s, Mode::Endurance);
    assert_eq!(out.next, State::DriveRegen);
    assert_eq!(out.command.requested_current, 0.0);
    assert!(!out.command.is_regenerating());
}

#[test]
fn throttle_in_regen_goes_straight_to_active() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.0, 0.5), Mode::Endurance);
    assert_eq!(m.state(), State::DriveRegen);

    let out = m.step(&pedals(0.3, 0.5), Mode::Endurance);
    assert_eq!(out.next, State::DriveActive);
    assert_eq!(out.command.requested_current, 0.0);
}

#[test]
fn brake_release_returns_to_standby() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.0, 0.5), Mode::Endurance);
    assert_eq!(m.step(&pedals(0.0, 0.0), Mode::Endurance).next, State::DriveStandby);
}

// ─── Plausibility ───────────────────────────────────────────────────

#[test]
fn apps_disagreement_drops_to_standby() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.5, 0.0), Mode::Endurance);

    let mut s = pedals(0.5, 0.0);
    s.apps2 = 0.1;
    let out = m.step(&s, Mode::Endurance);
    assert_eq!(out.next, State::DriveStandby);
    assert_eq!(out.violation, Some(PlausibilityViolation::AppsMismatch));
    assert_eq!(out.report().popup_code(), Some(0x01));
    assert_eq!(out.command.requested_current, 0.0);

    // Not latched: agreeing sensors drive again.
    assert_eq!(m.step(&pedals(0.5, 0.0), Mode::Endurance).next, State::DriveActive);
}

#[test]
fn brake_throttle_overlap_latches_until_throttle_released() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.5, 0.0), Mode::Endurance);

    let out = m.step(&pedals(0.5, 0.3), Mode::Endurance);
    assert_eq!(out.next, State::DriveStandby);
    assert!(out.bse_apps_violation);
    assert_eq!(out.report().popup_code(), Some(0x02));

    // Brake released, throttle still held: latch keeps the car in standby.
    for _ in 0..5 {
        let out = m.step(&pedals(0.5, 0.0), Mode::Endurance);
        assert_eq!(out.next, State::DriveStandby);
        assert!(out.bse_apps_violation);
        assert_eq!(out.command.requested_current, 0.0);
    }

    // Throttle below deadband clears the latch.
    let out = m.step(&pedals(0.0, 0.0), Mode::Endurance);
    assert!(!out.bse_apps_violation);
    assert_eq!(out.violation, None);
    assert_eq!(m.step(&pedals(0.5, 0.0), Mode::Endurance).next, State::DriveActive);
}

#[test]
fn light_throttle_with_brake_is_not_overlap() {
    let mut m = machine_in_standby();
    m.step(&pedals(0.2, 0.0), Mode::Endurance);
    let out = m.step(&pedals(0.2, 0.3), Mode::Endurance);
    assert_eq!(out.next, State::DriveActive);
    assert!(!out.bse_apps_violation);
}
