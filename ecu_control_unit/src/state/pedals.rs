//! APPS/BSE pedal plausibility.
//!
//! Two checks run in `DRIVE_ACTIVE` before any current is requested:
//!
//! - **APPS cross-check**: the secondary sensor reads half scale, so
//!   `|apps1 - 2 * apps2|` must stay within tolerance.
//! - **Brake/throttle co-activation**: braking with APPS1 above the BSE
//!   limit latches a violation that only clears once the throttle is
//!   released in `DRIVE_STANDBY`.

use ecu_common::config::DriveThresholds;
use ecu_common::fault::PlausibilityViolation;
use ecu_common::snapshot::VehicleSnapshot;

/// Accelerator sensors disagree by more than the tolerance (strict `>`).
#[inline]
pub fn apps_implausible(snapshot: &VehicleSnapshot, drive: &DriveThresholds) -> bool {
    let deviation = (snapshot.apps1 - 2.0 * snapshot.apps2).abs();
    // NaN sensor readings count as implausible.
    !(deviation <= drive.apps_tolerance)
}

/// Brake pressed while APPS1 is above the BSE limit.
#[inline]
pub fn brake_throttle_overlap(snapshot: &VehicleSnapshot, drive: &DriveThresholds) -> bool {
    snapshot.brake() > drive.pedal_deadband && snapshot.apps1 > drive.bse_throttle_limit
}

/// First plausibility violation on this snapshot, cross-check first.
pub fn check_pedals(snapshot: &VehicleSnapshot, drive: &DriveThresholds) -> Option<PlausibilityViolation> {
    if apps_implausible(snapshot, drive) {
        Some(PlausibilityViolation::AppsMismatch)
    } else if brake_throttle_overlap(snapshot, drive) {
        Some(PlausibilityViolation::BrakeThrottleOverlap)
    } else {
        None
    }
}
