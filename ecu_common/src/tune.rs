//! Driver tune: torque profiles, power levels, regen levels and rev limit.
//!
//! [`TuneConfig`] is the deserialised, unchecked form read from TOML.
//! [`Tune`] is the validated form the state machine runs on. The only way
//! to obtain a `Tune` is `Tune::try_from(&TuneConfig)`, so a `Tune` in hand
//! always satisfies the slot and range invariants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_REV_LIMIT, TUNE_SLOTS};

/// Upper bound for the RPM exponent `p`.
pub const PROFILE_P_MAX: f64 = 5.0;

/// Shape parameters of one throttle-to-torque curve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TorqueProfile {
    /// RPM fall-off gain, `[0, 1]`.
    pub k: f64,
    /// RPM exponent, `[0, 5]`.
    pub p: f64,
    /// Throttle bias, `[0, 1]`.
    pub b: f64,
}

impl TorqueProfile {
    /// Flat profile: current follows throttle linearly.
    pub const LINEAR: Self = Self { k: 0.0, p: 1.0, b: 0.0 };

    fn validate(&self, slot: usize) -> Result<(), TuneError> {
        let in_range = |v: f64, max: f64| v.is_finite() && (0.0..=max).contains(&v);
        if !in_range(self.k, 1.0) {
            return Err(TuneError::ProfileOutOfRange { slot, param: "k", value: self.k });
        }
        if !in_range(self.p, PROFILE_P_MAX) {
            return Err(TuneError::ProfileOutOfRange { slot, param: "p", value: self.p });
        }
        if !in_range(self.b, 1.0) {
            return Err(TuneError::ProfileOutOfRange { slot, param: "b", value: self.b });
        }
        Ok(())
    }
}

fn default_rev_limit() -> f64 {
    DEFAULT_REV_LIMIT
}

/// Tune as loaded from configuration, before validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TuneConfig {
    #[serde(default)]
    pub torque_profiles: Vec<TorqueProfile>,
    /// Current limits per power level [A].
    #[serde(default)]
    pub power_levels: Vec<f64>,
    /// Regen multipliers per level, `[0, 1]`.
    #[serde(default)]
    pub regen_levels: Vec<f64>,
    /// Motor speed ceiling [RPM].
    #[serde(default = "default_rev_limit")]
    pub rev_limit: f64,
}

/// Reasons a tune is rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TuneError {
    #[error("{table}: expected {TUNE_SLOTS} entries, got {got}")]
    SlotCount { table: &'static str, got: usize },

    #[error("torque_profiles[{slot}].{param} = {value} out of range")]
    ProfileOutOfRange { slot: usize, param: &'static str, value: f64 },

    #[error("power_levels[{slot}] = {value} must be finite and non-negative")]
    InvalidPowerLevel { slot: usize, value: f64 },

    #[error("regen_levels[{slot}] = {value} must be in [0, 1]")]
    InvalidRegenLevel { slot: usize, value: f64 },

    #[error("rev_limit = {0} must be finite and positive")]
    InvalidRevLimit(f64),
}

/// Slot indices picked by the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TuneSelection {
    pub throttle_map: u8,
    pub power_level: u8,
    pub regen_level: u8,
}

impl TuneSelection {
    pub const fn new(throttle_map: u8, power_level: u8, regen_level: u8) -> Self {
        Self { throttle_map, power_level, regen_level }
    }

    /// True when every index addresses a tune slot.
    pub const fn in_range(&self) -> bool {
        (self.throttle_map as usize) < TUNE_SLOTS
            && (self.power_level as usize) < TUNE_SLOTS
            && (self.regen_level as usize) < TUNE_SLOTS
    }

    /// Same selection with the lowest power level.
    pub const fn derated(self) -> Self {
        Self { power_level: 0, ..self }
    }
}

/// Validated tune. Immutable once installed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tune {
    torque_profiles: [TorqueProfile; TUNE_SLOTS],
    power_levels: [f64; TUNE_SLOTS],
    regen_levels: [f64; TUNE_SLOTS],
    rev_limit: f64,
}

#[inline]
fn slot(index: u8) -> usize {
    (index as usize).min(TUNE_SLOTS - 1)
}

fn exact_slots<T: Copy>(table: &'static str, values: &[T]) -> Result<[T; TUNE_SLOTS], TuneError> {
    <[T; TUNE_SLOTS]>::try_from(values).map_err(|_| TuneError::SlotCount { table, got: values.len() })
}

impl Tune {
    #[inline]
    pub fn power_levels(&self) -> &[f64; TUNE_SLOTS] {
        &self.power_levels
    }

    #[inline]
    pub fn regen_levels(&self) -> &[f64; TUNE_SLOTS] {
        &self.regen_levels
    }

    #[inline]
    pub fn rev_limit(&self) -> f64 {
        self.rev_limit
    }

    /// Torque profile for the selection. Out-of-range indices clamp to the last slot.
    #[inline]
    pub fn profile(&self, sel: TuneSelection) -> TorqueProfile {
        self.torque_profiles[slot(sel.throttle_map)]
    }

    /// Current limit [A] for the selection.
    #[inline]
    pub fn current_limit(&self, sel: TuneSelection) -> f64 {
        self.power_levels[slot(sel.power_level)]
    }

    #[inline]
    pub fn regen_level(&self, sel: TuneSelection) -> f64 {
        self.regen_levels[slot(sel.regen_level)]
    }
}

impl TryFrom<&TuneConfig> for Tune {
    type Error = TuneError;

    fn try_from(cfg: &TuneConfig) -> Result<Self, Self::Error> {
        let torque_profiles = exact_slots("torque_profiles", &cfg.torque_profiles)?;
        let power_levels = exact_slots("power_levels", &cfg.power_levels)?;
        let regen_levels = exact_slots("regen_levels", &cfg.regen_levels)?;

        for (i, profile) in torque_profiles.iter().enumerate() {
            profile.validate(i)?;
        }
        for (i, &value) in power_levels.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(TuneError::InvalidPowerLevel { slot: i, value });
            }
        }
        for (i, &value) in regen_levels.iter().enumerate() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(TuneError::InvalidRegenLevel { slot: i, value });
            }
        }
        if !cfg.rev_limit.is_finite() || cfg.rev_limit <= 0.0 {
            return Err(TuneError::InvalidRevLimit(cfg.rev_limit));
        }

        Ok(Self { torque_profiles, power_levels, regen_levels, rev_limit: cfg.rev_limit })
    }
}

impl TryFrom<TuneConfig> for Tune {
    type Error = TuneError;

    fn try_from(cfg: TuneConfig) -> Result<Self, Self::Error> {
        Tune::try_from(&cfg)
    }
}
