//! Fault identifiers, severity classes and the per-cycle fault set.
//!
//! Every fault the classifier can raise has one bit in [`FaultFlags`] and one
//! [`FaultId`] variant. The severity partition is fixed:
//!
//! | Class    | Effect                                             |
//! |----------|----------------------------------------------------|
//! | Critical | State machine enters `ERROR`, drive disabled       |
//! | Limiting | Power level derated to slot 0, drive continues     |
//! | Warning  | Reported to the dashboard only                     |

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

bitflags! {
    /// Active fault bits for one control cycle.
    ///
    /// CRITICAL flags (→ ERROR): CRITICAL_CAN, AMS, IMD, BSPD, RTD_BRAKE.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultFlags: u16 {
        /// Drive-critical CAN node silent. **CRITICAL → ERROR**.
        const CRITICAL_CAN       = 0x0001;
        /// Accumulator management system tripped. **CRITICAL → ERROR**.
        const AMS                = 0x0002;
        /// Insulation monitoring device tripped. **CRITICAL → ERROR**.
        const IMD                = 0x0004;
        /// Brake system plausibility device tripped. **CRITICAL → ERROR**.
        const BSPD               = 0x0008;
        /// Ready-to-drive requested without brake or with throttle. **CRITICAL → ERROR**.
        const RTD_BRAKE          = 0x0010;
        /// Motor at temperature limit (derate).
        const MOTOR_TEMP_LIMIT   = 0x0020;
        /// Accumulator at temperature limit (derate).
        const BATTERY_TEMP_LIMIT = 0x0040;
        /// Coolant at temperature limit (derate).
        const COOLANT_TEMP_LIMIT = 0x0080;
        /// Motor at or above the tune's rev limit (derate).
        const REV_LIMIT          = 0x0100;
        /// Non-critical CAN node silent.
        const WARN_CAN           = 0x0200;
        const MOTOR_TEMP_WARN    = 0x0400;
        const BATTERY_TEMP_WARN  = 0x0800;
        const COOLANT_TEMP_WARN  = 0x1000;
    }
}

impl FaultFlags {
    /// Mask of all CRITICAL flags that force ERROR.
    pub const CRITICAL_MASK: Self = Self::from_bits_truncate(
        Self::CRITICAL_CAN.bits()
            | Self::AMS.bits()
            | Self::IMD.bits()
            | Self::BSPD.bits()
            | Self::RTD_BRAKE.bits(),
    );

    /// Mask of all flags that derate the power level.
    pub const LIMITING_MASK: Self = Self::from_bits_truncate(
        Self::MOTOR_TEMP_LIMIT.bits()
            | Self::BATTERY_TEMP_LIMIT.bits()
            | Self::COOLANT_TEMP_LIMIT.bits()
            | Self::REV_LIMIT.bits(),
    );

    /// Mask of report-only flags.
    pub const WARNING_MASK: Self = Self::from_bits_truncate(
        Self::WARN_CAN.bits()
            | Self::MOTOR_TEMP_WARN.bits()
            | Self::BATTERY_TEMP_WARN.bits()
            | Self::COOLANT_TEMP_WARN.bits(),
    );

    /// Returns true if any CRITICAL flag is set.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }

    #[inline]
    pub const fn has_limiting(&self) -> bool {
        self.intersects(Self::LIMITING_MASK)
    }

    #[inline]
    pub const fn has_warning(&self) -> bool {
        self.intersects(Self::WARNING_MASK)
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::empty()
    }
}

const_assert!(FaultFlags::CRITICAL_MASK.bits() & FaultFlags::LIMITING_MASK.bits() == 0);
const_assert!(FaultFlags::CRITICAL_MASK.bits() & FaultFlags::WARNING_MASK.bits() == 0);
const_assert!(FaultFlags::LIMITING_MASK.bits() & FaultFlags::WARNING_MASK.bits() == 0);
const_assert!(
    FaultFlags::CRITICAL_MASK.bits() | FaultFlags::LIMITING_MASK.bits() | FaultFlags::WARNING_MASK.bits()
        == FaultFlags::all().bits()
);

/// Severity class of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FaultClass {
    Critical = 0,
    Limiting = 1,
    Warning = 2,
}

/// Identifier of one classifier check.
///
/// Declaration order is evaluation order: critical faults first, so the
/// "first critical fault" of a cycle is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum FaultId {
    CriticalCan = 0,
    Ams = 1,
    Imd = 2,
    Bspd = 3,
    RtdBrake = 4,
    MotorTempLimit = 5,
    BatteryTempLimit = 6,
    CoolantTempLimit = 7,
    RevLimit = 8,
    WarnCan = 9,
    MotorTempWarn = 10,
    BatteryTempWarn = 11,
    CoolantTempWarn = 12,
}

impl FaultId {
    pub const COUNT: usize = 13;

    /// All ids in evaluation order.
    pub const ALL: [FaultId; Self::COUNT] = [
        FaultId::CriticalCan,
        FaultId::Ams,
        FaultId::Imd,
        FaultId::Bspd,
        FaultId::RtdBrake,
        FaultId::MotorTempLimit,
        FaultId::BatteryTempLimit,
        FaultId::CoolantTempLimit,
        FaultId::RevLimit,
        FaultId::WarnCan,
        FaultId::MotorTempWarn,
        FaultId::BatteryTempWarn,
        FaultId::CoolantTempWarn,
    ];

    /// Bit for this id in [`FaultFlags`].
    #[inline]
    pub const fn flag(&self) -> FaultFlags {
        FaultFlags::from_bits_truncate(1 << (*self as u16))
    }

    pub const fn class(&self) -> FaultClass {
        match self {
            Self::CriticalCan | Self::Ams | Self::Imd | Self::Bspd | Self::RtdBrake => {
                FaultClass::Critical
            }
            Self::MotorTempLimit | Self::BatteryTempLimit | Self::CoolantTempLimit | Self::RevLimit => {
                FaultClass::Limiting
            }
            Self::WarnCan | Self::MotorTempWarn | Self::BatteryTempWarn | Self::CoolantTempWarn => {
                FaultClass::Warning
            }
        }
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        if (value as usize) < Self::COUNT {
            Some(Self::ALL[value as usize])
        } else {
            None
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CriticalCan => "CRITICAL_CAN",
            Self::Ams => "AMS",
            Self::Imd => "IMD",
            Self::Bspd => "BSPD",
            Self::RtdBrake => "RTD_BRAKE",
            Self::MotorTempLimit => "MOTOR_TEMP_LIMIT",
            Self::BatteryTempLimit => "BATTERY_TEMP_LIMIT",
            Self::CoolantTempLimit => "COOLANT_TEMP_LIMIT",
            Self::RevLimit => "REV_LIMIT",
            Self::WarnCan => "WARN_CAN",
            Self::MotorTempWarn => "MOTOR_TEMP_WARN",
            Self::BatteryTempWarn => "BATTERY_TEMP_WARN",
            Self::CoolantTempWarn => "COOLANT_TEMP_WARN",
        }
    }
}

impl fmt::Display for FaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const_assert!(FaultId::COUNT <= 16);

/// Set of faults active in one cycle.
///
/// Rebuilt from scratch every cycle by the classifier. During `ERROR` the
/// state machine re-inserts the pinned trigger while it still holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FaultSet {
    flags: FaultFlags,
}

impl FaultSet {
    #[inline]
    pub const fn new() -> Self {
        Self { flags: FaultFlags::empty() }
    }

    #[inline]
    pub const fn from_flags(flags: FaultFlags) -> Self {
        Self { flags }
    }

    #[inline]
    pub fn insert(&mut self, id: FaultId) {
        self.flags.insert(id.flag());
    }

    #[inline]
    pub fn remove(&mut self, id: FaultId) {
        self.flags.remove(id.flag());
    }

    #[inline]
    pub const fn contains(&self, id: FaultId) -> bool {
        self.flags.contains(id.flag())
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    #[inline]
    pub const fn flags(&self) -> FaultFlags {
        self.flags
    }

    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.flags.has_critical()
    }

    #[inline]
    pub const fn has_limiting(&self) -> bool {
        self.flags.has_limiting()
    }

    pub const fn critical(&self) -> FaultFlags {
        self.flags.intersection(FaultFlags::CRITICAL_MASK)
    }

    pub const fn limiting(&self) -> FaultFlags {
        self.flags.intersection(FaultFlags::LIMITING_MASK)
    }

    pub const fn warnings(&self) -> FaultFlags {
        self.flags.intersection(FaultFlags::WARNING_MASK)
    }

    /// Active ids in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = FaultId> + '_ {
        FaultId::ALL.into_iter().filter(|id| self.contains(*id))
    }

    /// First active critical fault in evaluation order.
    pub fn first_critical(&self) -> Option<FaultId> {
        self.iter().find(|id| id.class() == FaultClass::Critical)
    }
}

impl From<FaultFlags> for FaultSet {
    fn from(flags: FaultFlags) -> Self {
        Self::from_flags(flags)
    }
}

/// Pedal plausibility violations detected by the drive states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PlausibilityViolation {
    /// `|apps1 - 2 * apps2|` above tolerance.
    AppsMismatch = 0,
    /// Brake pressed with throttle above the BSE limit.
    BrakeThrottleOverlap = 1,
}

impl PlausibilityViolation {
    /// Dashboard popup code.
    #[inline]
    pub const fn popup_code(&self) -> u8 {
        match self {
            Self::AppsMismatch => 0x01,
            Self::BrakeThrottleOverlap => 0x02,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AppsMismatch => "APPS_MISMATCH",
            Self::BrakeThrottleOverlap => "BRAKE_THROTTLE_OVERLAP",
        }
    }
}

/// Every fault condition the drive core can observe.
///
/// Serialized adjacently tagged, e.g. `{"class":"critical","fault":"IMD"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "class", content = "fault", rename_all = "snake_case")]
pub enum DriveFault {
    /// Forces ERROR.
    Critical(FaultId),
    /// Derates power.
    Limiting(FaultId),
    /// Report only.
    Warning(FaultId),
    /// Pedal disagreement; zero current for the cycle, no state change to ERROR.
    Plausibility(PlausibilityViolation),
    /// Missing or invalid tune; the machine stays in ECU_FLASH.
    Configuration,
}

impl From<FaultId> for DriveFault {
    fn from(id: FaultId) -> Self {
        match id.class() {
            FaultClass::Critical => Self::Critical(id),
            FaultClass::Limiting => Self::Limiting(id),
            FaultClass::Warning => Self::Warning(id),
        }
    }
}

impl From<PlausibilityViolation> for DriveFault {
    fn from(v: PlausibilityViolation) -> Self {
        Self::Plausibility(v)
    }
}
