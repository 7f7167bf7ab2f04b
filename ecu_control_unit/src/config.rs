//! Configuration loading and validation for the control unit.
//!
//! Reads one TOML file into [`EcuConfig`] and bounds-checks it. The
//! optional `[tune]` table is *not* validated here: an invalid tune must
//! not stop the ECU from starting, it only keeps the car in `ECU_FLASH`.

use std::path::Path;

use ecu_common::config::{ConfigError, ConfigLoader, EcuConfig};
use ecu_common::tune::{Tune, TuneError};
use tracing::{info, warn};

/// Load and validate the ECU configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EcuConfig, ConfigError> {
    let config = EcuConfig::load(path)?;
    config.validate().map_err(ConfigError::ValidationError)?;
    info!(
        path = %path.display(),
        cycle_time_us = config.cycle_time_us,
        can_stale_ms = config.faults.can_stale_threshold_ms,
        tune = config.tune.is_some(),
        "configuration loaded"
    );
    Ok(config)
}

/// Load and validate the ECU configuration from a TOML string.
pub fn load_config_from_str(toml: &str) -> Result<EcuConfig, ConfigError> {
    let config = EcuConfig::from_toml(toml)?;
    config.validate().map_err(ConfigError::ValidationError)?;
    Ok(config)
}

/// Outcome of checking the configured tune ahead of flashing.
#[derive(Debug, Clone, PartialEq)]
pub enum TuneStatus {
    /// No `[tune]` table present.
    Missing,
    Invalid(TuneError),
    Valid(Tune),
}

/// Pre-flight check of the `[tune]` table, logging what the car will do.
pub fn check_tune(config: &EcuConfig) -> TuneStatus {
    match config.tune.as_ref().map(Tune::try_from) {
        None => {
            warn!("no [tune] table configured, staying in ECU_FLASH");
            TuneStatus::Missing
        }
        Some(Err(e)) => {
            warn!("tune rejected, staying in ECU_FLASH: {e}");
            TuneStatus::Invalid(e)
        }
        Some(Ok(tune)) => TuneStatus::Valid(tune),
    }
}
