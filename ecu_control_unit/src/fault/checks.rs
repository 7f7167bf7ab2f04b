//! Fault predicates.
//!
//! Every [`FaultId`] maps to exactly one plain `fn` predicate, carried as
//! data in [`FAULT_CHECKS`]. Predicates are pure: they read the snapshot,
//! the installed tune and the thresholds, and nothing else.

use std::fmt;

use ecu_common::config::FaultThresholds;
use ecu_common::consts::{SENSE_FAULT_BELOW, SENSE_OK_MAX, SENSE_OK_MIN};
use ecu_common::fault::FaultId;
use ecu_common::snapshot::{CanNode, VehicleSnapshot};
use ecu_common::state::State;
use ecu_common::tune::Tune;

/// Everything a predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct FaultInputs<'a> {
    pub snapshot: &'a VehicleSnapshot,
    /// Installed tune, `None` while in `ECU_FLASH`.
    pub tune: Option<&'a Tune>,
    pub thresholds: &'a FaultThresholds,
    /// Pedal travel treated as released (`drive.pedal_deadband`).
    pub pedal_deadband: f64,
}

pub type FaultPredicate = fn(&FaultInputs<'_>) -> bool;

/// One classifier entry: an id and the condition that raises it.
#[derive(Clone, Copy)]
pub struct FaultCheck {
    pub id: FaultId,
    pub predicate: FaultPredicate,
}

impl FaultCheck {
    #[inline]
    pub fn holds(&self, inputs: &FaultInputs<'_>) -> bool {
        (self.predicate)(inputs)
    }

    /// Whether the sweep evaluates this check in `state`.
    ///
    /// The ready-to-drive brake check only guards the `PRECHARGE_COMPLETE`
    /// → `DRIVE_STANDBY` handshake.
    #[inline]
    pub fn applies_in(&self, state: State) -> bool {
        match self.id {
            FaultId::RtdBrake => state == State::PrechargeComplete,
            _ => true,
        }
    }
}

impl PartialEq for FaultCheck {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FaultCheck {}

impl fmt::Debug for FaultCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultCheck").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Check table in evaluation order (index = `FaultId as usize`).
pub const FAULT_CHECKS: [FaultCheck; FaultId::COUNT] = [
    FaultCheck { id: FaultId::CriticalCan, predicate: critical_can_stale },
    FaultCheck { id: FaultId::Ams, predicate: ams_tripped },
    FaultCheck { id: FaultId::Imd, predicate: imd_tripped },
    FaultCheck { id: FaultId::Bspd, predicate: bspd_tripped },
    FaultCheck { id: FaultId::RtdBrake, predicate: rtd_without_brake },
    FaultCheck { id: FaultId::MotorTempLimit, predicate: motor_temp_limit },
    FaultCheck { id: FaultId::BatteryTempLimit, predicate: battery_temp_limit },
    FaultCheck { id: FaultId::CoolantTempLimit, predicate: coolant_temp_limit },
    FaultCheck { id: FaultId::RevLimit, predicate: rev_limit_reached },
    FaultCheck { id: FaultId::WarnCan, predicate: non_critical_can_stale },
    FaultCheck { id: FaultId::MotorTempWarn, predicate: motor_temp_warn },
    FaultCheck { id: FaultId::BatteryTempWarn, predicate: battery_temp_warn },
    FaultCheck { id: FaultId::CoolantTempWarn, predicate: coolant_temp_warn },
];

const fn table_in_id_order() -> bool {
    let mut i = 0;
    while i < FaultId::COUNT {
        if FAULT_CHECKS[i].id as usize != i {
            return false;
        }
        i += 1;
    }
    true
}

static_assertions::const_assert!(table_in_id_order());

/// Table entry for `id`.
#[inline]
pub const fn check_for(id: FaultId) -> FaultCheck {
    FAULT_CHECKS[id as usize]
}

// ─── CAN Liveness ───────────────────────────────────────────────────

fn any_stale(snapshot: &VehicleSnapshot, nodes: &[CanNode], threshold_ms: u32) -> bool {
    nodes
        .iter()
        .any(|node| snapshot.last_update_age_ms.get(*node) > threshold_ms)
}

fn critical_can_stale(i: &FaultInputs<'_>) -> bool {
    any_stale(i.snapshot, &CanNode::DRIVE_CRITICAL, i.thresholds.can_stale_threshold_ms)
}

fn non_critical_can_stale(i: &FaultInputs<'_>) -> bool {
    any_stale(i.snapshot, &CanNode::NON_CRITICAL, i.thresholds.can_stale_threshold_ms)
}

// ─── Shutdown-Circuit Sense Lines ───────────────────────────────────

/// Band a raw sense-line reading falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenseBand {
    /// Below 1 V: the device pulled the line low.
    Low,
    /// Inside the healthy window around 2.4 V.
    Ok,
    /// Between the bands or above them.
    OutOfBand,
}

impl SenseBand {
    pub const fn of(raw: u16) -> Self {
        if raw < SENSE_FAULT_BELOW {
            Self::Low
        } else if raw >= SENSE_OK_MIN && raw <= SENSE_OK_MAX {
            Self::Ok
        } else {
            Self::OutOfBand
        }
    }

    #[inline]
    pub const fn is_fault(&self) -> bool {
        !matches!(self, Self::Ok)
    }
}

fn ams_tripped(i: &FaultInputs<'_>) -> bool {
    SenseBand::of(i.snapshot.ams_sense).is_fault()
}

fn imd_tripped(i: &FaultInputs<'_>) -> bool {
    SenseBand::of(i.snapshot.imd_sense).is_fault()
}

fn bspd_tripped(i: &FaultInputs<'_>) -> bool {
    SenseBand::of(i.snapshot.bspd_sense).is_fault()
}

// ─── Ready-To-Drive Handshake ───────────────────────────────────────

/// Ready-to-drive pressed with throttle applied or without both brakes.
fn rtd_without_brake(i: &FaultInputs<'_>) -> bool {
    let (s, deadband) = (i.snapshot, i.pedal_deadband);
    s.ready_to_drive
        && (s.apps1 > deadband
            || s.apps2 > deadband
            || s.brake_pressure_front <= deadband
            || s.brake_pressure_rear <= deadband)
}

// ─── Temperatures ───────────────────────────────────────────────────

fn motor_temp_limit(i: &FaultInputs<'_>) -> bool {
    i.snapshot.motor_temp >= i.thresholds.motor_temp_limit
}

fn battery_temp_limit(i: &FaultInputs<'_>) -> bool {
    i.snapshot.battery_temp >= i.thresholds.battery_temp_limit
}

fn coolant_temp_limit(i: &FaultInputs<'_>) -> bool {
    i.snapshot.coolant_temp >= i.thresholds.coolant_temp_limit
}

fn motor_temp_warn(i: &FaultInputs<'_>) -> bool {
    i.snapshot.motor_temp >= i.thresholds.motor_temp_warn
}

fn battery_temp_warn(i: &FaultInputs<'_>) -> bool {
    i.snapshot.battery_temp >= i.thresholds.battery_temp_warn
}

fn coolant_temp_warn(i: &FaultInputs<'_>) -> bool {
    i.snapshot.coolant_temp >= i.thresholds.coolant_temp_warn
}

// ─── Rev Limit ──────────────────────────────────────────────────────

fn rev_limit_reached(i: &FaultInputs<'_>) -> bool {
    i.tune.is_some_and(|tune| i.snapshot.rpm() >= tune.rev_limit())
}
