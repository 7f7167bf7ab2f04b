//! Brake-to-regen current.
//!
//! Regen is only requested when the accumulator has reported a charge
//! ceiling, the brake is past the deadband and the motor is above the RPM
//! floor. The result is a magnitude; the state machine negates it.

use ecu_common::config::DriveThresholds;

/// Regen current magnitude [A].
///
/// `clip(brake, 0, 1) * charge_ceiling * regen_level`, or 0 when any
/// gating condition fails or the product is not finite.
pub fn regen_current(
    brake: f64,
    rpm: f64,
    charge_ceiling: Option<f64>,
    regen_level: f64,
    drive: &DriveThresholds,
) -> f64 {
    let Some(ceiling) = charge_ceiling else {
        return 0.0;
    };
    if !ceiling.is_finite() || ceiling <= 0.0 {
        return 0.0;
    }
    if !(brake > drive.pedal_deadband && rpm > drive.regen_rpm_floor) {
        return 0.0;
    }

    let current = brake.clamp(0.0, 1.0) * ceiling * regen_level;
    if current.is_finite() { current.max(0.0) } else { 0.0 }
}
