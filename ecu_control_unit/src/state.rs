//! State machine module root.
//!
//! The drive state machine and the pedal plausibility checks it runs in the
//! drive states.

pub mod machine;
pub mod pedals;

pub use machine::{DriveContext, DriveStateMachine, FlashError, StepOutcome};
