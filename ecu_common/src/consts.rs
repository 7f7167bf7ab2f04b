//! System-wide constants for the ECU workspace.
//!
//! Single source of truth for numeric limits, drive thresholds and the
//! safety-loop sense-pin calibration. Imported by all crates.

use static_assertions::const_assert;

/// Number of slots in every tune table (torque profiles, power, regen).
pub const TUNE_SLOTS: usize = 4;

// ─── Cycle Timing ───────────────────────────────────────────────────

/// Default control cycle time in microseconds (200 Hz).
pub const CYCLE_TIME_US: u32 = 5_000;

/// Fastest supported control cycle [µs].
pub const CYCLE_TIME_US_MIN: u32 = 1_000;

/// Slowest supported control cycle [µs]. Keeps the loop well inside the
/// CAN staleness window.
pub const CYCLE_TIME_US_MAX: u32 = 10_000;

/// Default fault-report interval to the dashboard [cycles].
pub const DISPLAY_INTERVAL_DEFAULT: u32 = 20;

// ─── CAN Liveness ───────────────────────────────────────────────────

/// A node is stale when its last frame is strictly older than this [ms].
pub const CAN_STALE_THRESHOLD_MS: u32 = 100;

/// Bounds for a configured staleness threshold [ms].
pub const CAN_STALE_THRESHOLD_MS_MIN: u32 = 10;
pub const CAN_STALE_THRESHOLD_MS_MAX: u32 = 1_000;

// ─── Drive Thresholds ───────────────────────────────────────────────

/// Pedal deadband: throttle or brake above this counts as pressed.
pub const PEDAL_DEADBAND: f64 = 0.05;

/// Maximum allowed `|apps1 - 2 * apps2|` before the pedal pair is implausible.
pub const APPS_PLAUSIBILITY_TOLERANCE: f64 = 0.1;

/// APPS1 position above which braking at the same time latches a BSE/APPS violation.
pub const BSE_APPS_THROTTLE_LIMIT: f64 = 0.25;

/// No regenerative current is requested at or below this motor speed [RPM].
pub const REGEN_RPM_FLOOR: f64 = 500.0;

/// Default rev limit when a tune does not specify one [RPM].
pub const DEFAULT_REV_LIMIT: f64 = 5_500.0;

// ─── Temperature Defaults [°C] ──────────────────────────────────────

pub const MOTOR_TEMP_LIMIT_DEFAULT: f64 = 110.0;
pub const MOTOR_TEMP_WARN_DEFAULT: f64 = 95.0;
pub const BATTERY_TEMP_LIMIT_DEFAULT: f64 = 55.0;
pub const BATTERY_TEMP_WARN_DEFAULT: f64 = 50.0;
pub const COOLANT_TEMP_LIMIT_DEFAULT: f64 = 65.0;
pub const COOLANT_TEMP_WARN_DEFAULT: f64 = 55.0;

// ─── Sense-Pin ADC Calibration ──────────────────────────────────────
//
// AMS / IMD / BSPD status lines are sampled by a 10-bit ADC referenced to
// 3.3 V, so one volt is 1023 / 3.3 = 310 counts.
//
// | Voltage | Counts | Meaning                       |
// |---------|--------|-------------------------------|
// | 0.5 V   | 155    | line pulled low, device fault |
// | 1.0 V   | 310    | fault threshold               |
// | 2.4 V   | 744    | nominal "OK" level            |
// | 3.0 V   | 930    | above the OK band             |
//
// Readings below 1 V are a fault, readings inside [730, 760] are healthy,
// anything else is treated as a fault.

/// ADC full-scale count.
pub const ADC_FULL_SCALE: u32 = 1023;

/// ADC reference voltage [mV].
pub const ADC_REFERENCE_MV: u32 = 3300;

/// Convert a sense-line voltage [mV] to ADC counts.
pub const fn adc_counts(millivolts: u32) -> u16 {
    (millivolts * ADC_FULL_SCALE / ADC_REFERENCE_MV) as u16
}

pub const SENSE_0V5: u16 = adc_counts(500);
pub const SENSE_1V0: u16 = adc_counts(1_000);
pub const SENSE_2V4: u16 = adc_counts(2_400);
pub const SENSE_3V0: u16 = adc_counts(3_000);

/// Readings strictly below this are a fault.
pub const SENSE_FAULT_BELOW: u16 = SENSE_1V0;
/// Lower edge of the healthy band (inclusive).
pub const SENSE_OK_MIN: u16 = 730;
/// Upper edge of the healthy band (inclusive).
pub const SENSE_OK_MAX: u16 = 760;

const_assert!(SENSE_0V5 == 155);
const_assert!(SENSE_1V0 == 310);
const_assert!(SENSE_2V4 == 744);
const_assert!(SENSE_3V0 == 930);
const_assert!(SENSE_FAULT_BELOW < SENSE_OK_MIN);
const_assert!(SENSE_OK_MIN <= SENSE_2V4 && SENSE_2V4 <= SENSE_OK_MAX);
const_assert!(SENSE_OK_MAX < SENSE_3V0);
const_assert!(CYCLE_TIME_US_MAX / 1_000 < CAN_STALE_THRESHOLD_MS);
