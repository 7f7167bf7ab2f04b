//! Drive state and driver-selected mode.
//!
//! Both enums use `#[repr(u8)]` for compact telemetry transport and carry
//! upper-snake display names for diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Drive state of the main ECU.
///
/// Exactly one state is current at any time. Transitions happen only inside
/// the drive state machine's step function. `Error` is re-entered every
/// cycle until the fault that caused it clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum State {
    /// Tune not yet installed. Initial state.
    #[default]
    EcuFlash = 0,
    /// Low-voltage system up; waiting for the TS-active button.
    GlvOn = 1,
    /// Precharge requested from the accumulator; waiting for its acknowledgement.
    TsPrecharge = 2,
    /// Accumulator is precharging the inverter DC link.
    Precharging = 3,
    /// Precharge finished; waiting for ready-to-drive.
    PrechargeComplete = 4,
    /// Ready to drive, no current requested.
    DriveStandby = 5,
    /// Driver requesting forward torque.
    DriveActive = 6,
    /// Driver braking; regenerative current may be requested.
    DriveRegen = 7,
    /// Critical fault pinned; drive disabled.
    Error = 8,
}

impl State {
    /// All states in declaration order.
    pub const ALL: [State; 9] = [
        State::EcuFlash,
        State::GlvOn,
        State::TsPrecharge,
        State::Precharging,
        State::PrechargeComplete,
        State::DriveStandby,
        State::DriveActive,
        State::DriveRegen,
        State::Error,
    ];

    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::EcuFlash),
            1 => Some(Self::GlvOn),
            2 => Some(Self::TsPrecharge),
            3 => Some(Self::Precharging),
            4 => Some(Self::PrechargeComplete),
            5 => Some(Self::DriveStandby),
            6 => Some(Self::DriveActive),
            7 => Some(Self::DriveRegen),
            8 => Some(Self::Error),
            _ => None,
        }
    }

    /// Display name used in logs and on the dashboard.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EcuFlash => "ECU_FLASH",
            Self::GlvOn => "GLV_ON",
            Self::TsPrecharge => "TS_PRECHARGE",
            Self::Precharging => "PRECHARGING",
            Self::PrechargeComplete => "PRECHARGE_COMPLETE",
            Self::DriveStandby => "DRIVE_STANDBY",
            Self::DriveActive => "DRIVE_ACTIVE",
            Self::DriveRegen => "DRIVE_REGEN",
            Self::Error => "ERROR",
        }
    }

    /// Ready-to-drive sub-states.
    #[inline]
    pub const fn is_drive(&self) -> bool {
        matches!(self, Self::DriveStandby | Self::DriveActive | Self::DriveRegen)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driver-selected event mode. Selects which tune slots are active and is
/// orthogonal to [`State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Mode {
    Testing = 0,
    Launch = 1,
    #[default]
    Endurance = 2,
    Autox = 3,
    Skidpad = 4,
    Acc = 5,
    Pit = 6,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Testing,
        Mode::Launch,
        Mode::Endurance,
        Mode::Autox,
        Mode::Skidpad,
        Mode::Acc,
        Mode::Pit,
    ];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Testing),
            1 => Some(Self::Launch),
            2 => Some(Self::Endurance),
            3 => Some(Self::Autox),
            4 => Some(Self::Skidpad),
            5 => Some(Self::Acc),
            6 => Some(Self::Pit),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Testing => "TESTING",
            Self::Launch => "LAUNCH",
            Self::Endurance => "ENDURANCE",
            Self::Autox => "AUTOX",
            Self::Skidpad => "SKIDPAD",
            Self::Acc => "ACC",
            Self::Pit => "PIT",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
