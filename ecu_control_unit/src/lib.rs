//! # ECU Control Unit Library
//!
//! Drive-control core of a Formula-SAE electric vehicle's main ECU. Runs a
//! deterministic per-cycle pipeline:
//!
//! 1. **Telemetry**: one `VehicleSnapshot` and the selected `Mode`
//! 2. **Fault classifier**: pure evaluation into a `FaultSet`
//! 3. **Fault response**: critical ⇒ `ERROR`, limiting ⇒ derate
//! 4. **Drive state machine**: startup sequencing and drive states,
//!    consulting the torque/regen calculator
//! 5. **Actuator command**: written before any dashboard report
//!
//! ## No Globals
//!
//! All mutable state (current state, installed tune, BSE/APPS latch, pinned
//! fault) lives in one `DriveStateMachine` owned by the `CycleRunner` and
//! passed by `&mut`. The cycle performs no heap allocation.

pub mod config;
pub mod control;
pub mod cycle;
pub mod error;
pub mod fault;
pub mod io;
pub mod state;
