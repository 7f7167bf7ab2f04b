//! ECU Common Library
//!
//! Shared data model for the main ECU drive-control workspace. Everything
//! that crosses a collaborator boundary (telemetry in, actuator commands out,
//! fault reports to the dashboard, tune and configuration in) is defined here
//! so the control unit and its adapters agree on one set of types.
//!
//! # Module Structure
//!
//! - [`state`] - Drive `State` and driver-selected `Mode`
//! - [`snapshot`] - Per-cycle `VehicleSnapshot` and CAN node ages
//! - [`tune`] - Torque profiles, power/regen levels and tune validation
//! - [`fault`] - Fault identifiers, severity classes and `FaultSet`
//! - [`command`] - Actuator command emitted once per cycle
//! - [`report`] - Fault report handed to the display collaborator
//! - [`config`] - TOML configuration structures with bounds validation
//! - [`consts`] - System constants and the ADC calibration table
//! - [`prelude`] - Common re-exports for convenience

pub mod command;
pub mod config;
pub mod consts;
pub mod fault;
pub mod prelude;
pub mod report;
pub mod snapshot;
pub mod state;
pub mod tune;
