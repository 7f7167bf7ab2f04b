//! Configuration structures for the main ECU.
//!
//! All config types use `serde::Deserialize` for TOML loading. Every field
//! has a default, so an empty file is a valid configuration (without a tune,
//! which keeps the car in `ECU_FLASH`). Numeric parameters are bounds-checked
//! by [`EcuConfig::validate`].
//!
//! # Example
//!
//! ```rust,no_run
//! use ecu_common::config::{ConfigError, ConfigLoader, EcuConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = EcuConfig::load(Path::new("config/ecu.toml"))?;
//!     config.validate().map_err(ConfigError::ValidationError)?;
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::state::Mode;
use crate::tune::{TuneConfig, TuneSelection};

/// Error type for configuration loading operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// File could not be read.
    #[error("Failed to read configuration: {0}")]
    IoError(String),

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `serde::de::DeserializeOwned` type.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::IoError(format!("{}: {e}", path.display()))
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

fn check_range<T: PartialOrd + std::fmt::Display>(name: &str, value: T, min: T, max: T) -> Result<(), String> {
    // NaN fails both comparisons, so test for inclusion rather than exclusion.
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(format!("{name} {value} out of range [{min}, {max}]"))
    }
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level ECU configuration.
///
/// Loaded from TOML at startup; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcuConfig {
    /// Control cycle time [µs] (default: 5000 = 200 Hz).
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Periodic fault-report interval [cycles] (default: 20).
    #[serde(default = "default_display_interval")]
    pub display_interval: u32,

    #[serde(default)]
    pub drive: DriveThresholds,

    #[serde(default)]
    pub faults: FaultThresholds,

    #[serde(default)]
    pub modes: ModeTable,

    /// Tune to flash at startup. Absent keeps the car in `ECU_FLASH`.
    #[serde(default)]
    pub tune: Option<TuneConfig>,
}

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US
}
fn default_display_interval() -> u32 {
    DISPLAY_INTERVAL_DEFAULT
}

impl Default for EcuConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: CYCLE_TIME_US,
            display_interval: DISPLAY_INTERVAL_DEFAULT,
            drive: DriveThresholds::default(),
            faults: FaultThresholds::default(),
            modes: ModeTable::default(),
            tune: None,
        }
    }
}

impl EcuConfig {
    /// Upper bound for `display_interval` [cycles].
    pub const DISPLAY_INTERVAL_MAX: u32 = 1_000;

    /// Validate configuration parameter bounds.
    ///
    /// The tune table is not checked here; it is validated when flashed.
    pub fn validate(&self) -> Result<(), String> {
        check_range("cycle_time_us", self.cycle_time_us, CYCLE_TIME_US_MIN, CYCLE_TIME_US_MAX)?;
        check_range("display_interval", self.display_interval, 1, Self::DISPLAY_INTERVAL_MAX)?;
        self.drive.validate()?;
        self.faults.validate()?;
        self.modes.validate()
    }
}

// ─── Drive Thresholds ───────────────────────────────────────────────

/// Pedal and regen thresholds used by the drive states.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveThresholds {
    /// Throttle/brake above this counts as pressed (default: 0.05).
    pub pedal_deadband: f64,
    /// APPS plausibility tolerance on `|apps1 - 2*apps2|` (default: 0.1).
    pub apps_tolerance: f64,
    /// APPS1 limit for brake/throttle co-activation (default: 0.25).
    pub bse_throttle_limit: f64,
    /// Minimum motor speed for regen [RPM] (default: 500).
    pub regen_rpm_floor: f64,
}

impl Default for DriveThresholds {
    fn default() -> Self {
        Self {
            pedal_deadband: PEDAL_DEADBAND,
            apps_tolerance: APPS_PLAUSIBILITY_TOLERANCE,
            bse_throttle_limit: BSE_APPS_THROTTLE_LIMIT,
            regen_rpm_floor: REGEN_RPM_FLOOR,
        }
    }
}

impl DriveThresholds {
    pub const PEDAL_DEADBAND_MAX: f64 = 0.2;
    pub const APPS_TOLERANCE_MAX: f64 = 0.5;
    pub const REGEN_RPM_FLOOR_MAX: f64 = 5_000.0;

    pub fn validate(&self) -> Result<(), String> {
        check_range("drive.pedal_deadband", self.pedal_deadband, 0.0, Self::PEDAL_DEADBAND_MAX)?;
        check_range("drive.apps_tolerance", self.apps_tolerance, 0.0, Self::APPS_TOLERANCE_MAX)?;
        check_range("drive.bse_throttle_limit", self.bse_throttle_limit, self.pedal_deadband, 1.0)?;
        check_range("drive.regen_rpm_floor", self.regen_rpm_floor, 0.0, Self::REGEN_RPM_FLOOR_MAX)
    }
}

// ─── Fault Thresholds ───────────────────────────────────────────────

/// Thresholds used by the fault classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultThresholds {
    /// CAN node is stale when its age is strictly greater [ms] (default: 100).
    pub can_stale_threshold_ms: u32,
    pub motor_temp_limit: f64,
    pub motor_temp_warn: f64,
    pub battery_temp_limit: f64,
    pub battery_temp_warn: f64,
    pub coolant_temp_limit: f64,
    pub coolant_temp_warn: f64,
}

impl Default for FaultThresholds {
    fn default() -> Self {
        Self {
            can_stale_threshold_ms: CAN_STALE_THRESHOLD_MS,
            motor_temp_limit: MOTOR_TEMP_LIMIT_DEFAULT,
            motor_temp_warn: MOTOR_TEMP_WARN_DEFAULT,
            battery_temp_limit: BATTERY_TEMP_LIMIT_DEFAULT,
            battery_temp_warn: BATTERY_TEMP_WARN_DEFAULT,
            coolant_temp_limit: COOLANT_TEMP_LIMIT_DEFAULT,
            coolant_temp_warn: COOLANT_TEMP_WARN_DEFAULT,
        }
    }
}

impl FaultThresholds {
    /// Highest configurable temperature threshold [°C].
    pub const TEMP_MAX: f64 = 200.0;

    pub fn validate(&self) -> Result<(), String> {
        check_range(
            "faults.can_stale_threshold_ms",
            self.can_stale_threshold_ms,
            CAN_STALE_THRESHOLD_MS_MIN,
            CAN_STALE_THRESHOLD_MS_MAX,
        )?;
        let pairs = [
            ("motor", self.motor_temp_warn, self.motor_temp_limit),
            ("battery", self.battery_temp_warn, self.battery_temp_limit),
            ("coolant", self.coolant_temp_warn, self.coolant_temp_limit),
        ];
        for (name, warn, limit) in pairs {
            check_range(&format!("faults.{name}_temp_limit"), limit, 0.0, Self::TEMP_MAX)?;
            check_range(&format!("faults.{name}_temp_warn"), warn, 0.0, limit)?;
        }
        Ok(())
    }
}

// ─── Mode Table ─────────────────────────────────────────────────────

/// Tune slot selection for each driver mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeTable {
    pub testing: TuneSelection,
    pub launch: TuneSelection,
    pub endurance: TuneSelection,
    pub autox: TuneSelection,
    pub skidpad: TuneSelection,
    pub acc: TuneSelection,
    pub pit: TuneSelection,
}

impl Default for ModeTable {
    fn default() -> Self {
        Self {
            testing: TuneSelection::new(0, 0, 0),
            launch: TuneSelection::new(3, 3, 0),
            endurance: TuneSelection::new(1, 1, 2),
            autox: TuneSelection::new(2, 2, 1),
            skidpad: TuneSelection::new(2, 1, 1),
            acc: TuneSelection::new(3, 3, 0),
            pit: TuneSelection::new(0, 0, 0),
        }
    }
}

impl ModeTable {
    #[inline]
    pub const fn get(&self, mode: Mode) -> TuneSelection {
        match mode {
            Mode::Testing => self.testing,
            Mode::Launch => self.launch,
            Mode::Endurance => self.endurance,
            Mode::Autox => self.autox,
            Mode::Skidpad => self.skidpad,
            Mode::Acc => self.acc,
            Mode::Pit => self.pit,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for mode in Mode::ALL {
            let sel = self.get(mode);
            if !sel.in_range() {
                return Err(format!(
                    "modes.{} selection {:?} exceeds {} tune slots",
                    mode.as_str().to_lowercase(),
                    sel,
                    TUNE_SLOTS
                ));
            }
        }
        Ok(())
    }
}
