//! Throttle-to-current mapping.
//!
//! For throttle `x ∈ [0, 1]` and normalised speed `y = rpm / rev_limit`:
//!
//! ```text
//! z = x - (1 - x) * (x + b) * y^p * k
//! I = clip(z, 0, 1) * current_limit
//! ```
//!
//! `k` sets how hard torque falls off with speed, `p` how late it starts,
//! and `b` biases the fall-off toward higher throttle. `y` is not capped at
//! 1, so an overspeeding motor still yields a clipped, finite request.

use ecu_common::config::DriveThresholds;
use ecu_common::snapshot::VehicleSnapshot;
use ecu_common::tune::{TorqueProfile, Tune, TuneSelection};

use super::regen::regen_current;

/// Normalised torque request `z ∈ [0, 1]`.
///
/// Any non-finite input or intermediate yields 0.
pub fn torque_fraction(throttle: f64, rpm: f64, rev_limit: f64, profile: &TorqueProfile) -> f64 {
    if !throttle.is_finite() {
        return 0.0;
    }
    let x = throttle.clamp(0.0, 1.0);

    let y = rpm / rev_limit;
    if !y.is_finite() {
        return 0.0;
    }
    let y = y.max(0.0);

    let z = x - (1.0 - x) * (x + profile.b) * y.powf(profile.p) * profile.k;
    if !z.is_finite() {
        return 0.0;
    }
    z.clamp(0.0, 1.0)
}

/// Motor current request [A] for the given throttle and speed.
#[inline]
pub fn torque_current(
    throttle: f64,
    rpm: f64,
    rev_limit: f64,
    profile: &TorqueProfile,
    current_limit: f64,
) -> f64 {
    torque_fraction(throttle, rpm, rev_limit, profile) * current_limit
}

/// Tune-bound view used by the drive states for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct TorqueCalculator<'a> {
    tune: &'a Tune,
    selection: TuneSelection,
    drive: &'a DriveThresholds,
}

impl<'a> TorqueCalculator<'a> {
    pub fn new(tune: &'a Tune, selection: TuneSelection, drive: &'a DriveThresholds) -> Self {
        Self { tune, selection, drive }
    }

    #[inline]
    pub fn selection(&self) -> TuneSelection {
        self.selection
    }

    /// Forward current [A], `0 ≤ I ≤ current_limit`.
    pub fn drive_current(&self, snapshot: &VehicleSnapshot) -> f64 {
        torque_current(
            snapshot.throttle(),
            snapshot.rpm(),
            self.tune.rev_limit(),
            &self.tune.profile(self.selection),
            self.tune.current_limit(self.selection),
        )
    }

    /// Regen current magnitude [A], `≥ 0`.
    pub fn regen_current(&self, snapshot: &VehicleSnapshot) -> f64 {
        regen_current(
            snapshot.brake(),
            snapshot.rpm(),
            snapshot.max_charge_current,
            self.tune.regen_level(self.selection),
            self.drive,
        )
    }
}
