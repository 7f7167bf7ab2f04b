//! Drive state machine.
//!
//! Startup sequence: ECU_FLASH → GLV_ON → TS_PRECHARGE → PRECHARGING →
//! PRECHARGE_COMPLETE → DRIVE_STANDBY ↔ DRIVE_ACTIVE / DRIVE_REGEN, with
//! ERROR reachable from every state.
//!
//! One [`DriveStateMachine::step`] per control cycle:
//!
//! 1. Classify the snapshot into a fresh `FaultSet`.
//! 2. In ERROR, re-check the pinned fault; stay while it holds, otherwise
//!    repin the next active critical fault or restart the sequence.
//! 3. Any critical fault in any other state pins it and enters ERROR.
//! 4. Otherwise run the current state's transition, which is the only place
//!    an actuator command is produced. Every state zeroes the outputs unless
//!    it explicitly drives.

use ecu_common::command::ActuatorCommand;
use ecu_common::config::{DriveThresholds, EcuConfig, FaultThresholds, ModeTable};
use ecu_common::fault::{FaultId, FaultSet, PlausibilityViolation};
use ecu_common::report::FaultReport;
use ecu_common::snapshot::VehicleSnapshot;
use ecu_common::state::{Mode, State};
use ecu_common::tune::{Tune, TuneConfig, TuneError, TuneSelection};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::pedals::check_pedals;
use crate::control::TorqueCalculator;
use crate::error::propagation::evaluate_faults;
use crate::fault::{check_for, classify, FaultCheck, FaultInputs};

/// Reasons a tune flash is refused.
#[derive(Debug, Error, PartialEq)]
pub enum FlashError {
    /// Tunes are only accepted while the car is in ECU_FLASH.
    #[error("tune flash rejected in state {0}")]
    Rejected(State),
    #[error("invalid tune: {0}")]
    Invalid(#[from] TuneError),
}

/// Mutable drive state, owned by the machine and passed by `&mut`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveContext {
    pub state: State,
    /// Installed tune. `None` keeps the car in ECU_FLASH.
    pub tune: Option<Tune>,
    /// BSE/APPS co-activation latch.
    pub bse_apps_violation: bool,
    /// Fault holding the machine in ERROR.
    pub pinned: Option<FaultCheck>,
}

/// Everything one step produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub previous: State,
    pub next: State,
    pub mode: Mode,
    /// Outputs for this cycle.
    pub command: ActuatorCommand,
    /// Active faults, including the pinned one while it holds.
    pub faults: FaultSet,
    pub pinned: Option<FaultId>,
    /// Plausibility violation seen this cycle, or held by the latch.
    pub violation: Option<PlausibilityViolation>,
    pub bse_apps_violation: bool,
    /// Tune slots in effect after derating.
    pub selection: TuneSelection,
    pub tune_installed: bool,
}

impl StepOutcome {
    #[inline]
    pub fn transitioned(&self) -> bool {
        self.previous != self.next
    }

    /// Dashboard view of this step.
    pub fn report(&self) -> FaultReport {
        FaultReport::new(
            self.next,
            self.mode,
            &self.faults,
            self.pinned,
            self.violation,
            self.tune_installed,
        )
    }
}

/// Owner of the drive [`State`].
#[derive(Debug, Clone)]
pub struct DriveStateMachine {
    ctx: DriveContext,
    drive: DriveThresholds,
    fault_thresholds: FaultThresholds,
    modes: ModeTable,
}

impl DriveStateMachine {
    /// New machine in ECU_FLASH with no tune installed.
    pub fn new(config: &EcuConfig) -> Self {
        Self {
            ctx: DriveContext::default(),
            drive: config.drive,
            fault_thresholds: config.faults,
            modes: config.modes,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.ctx.state
    }

    #[inline]
    pub fn tune(&self) -> Option<&Tune> {
        self.ctx.tune.as_ref()
    }

    #[inline]
    pub fn bse_apps_violation(&self) -> bool {
        self.ctx.bse_apps_violation
    }

    #[inline]
    pub fn pinned(&self) -> Option<FaultId> {
        self.ctx.pinned.map(|check| check.id)
    }

    /// Validate and install a tune. Accepted only in ECU_FLASH; the machine
    /// leaves ECU_FLASH on the next step.
    pub fn flash(&mut self, config: &TuneConfig) -> Result<(), FlashError> {
        if self.ctx.state != State::EcuFlash {
            return Err(FlashError::Rejected(self.ctx.state));
        }
        self.flash_tune(Tune::try_from(config)?)
    }

    /// Install an already validated tune. Accepted only in ECU_FLASH.
    pub fn flash_tune(&mut self, tune: Tune) -> Result<(), FlashError> {
        if self.ctx.state != State::EcuFlash {
            return Err(FlashError::Rejected(self.ctx.state));
        }
        info!(
            rev_limit = tune.rev_limit(),
            power_levels = ?tune.power_levels(),
            regen_levels = ?tune.regen_levels(),
            "tune flashed"
        );
        self.ctx.tune = Some(tune);
        Ok(())
    }

    /// Advance one control cycle.
    pub fn step(&mut self, snapshot: &VehicleSnapshot, mode: Mode) -> StepOutcome {
        let previous = self.ctx.state;
        let tune = self.ctx.tune;
        let thresholds = self.fault_thresholds;
        let inputs = FaultInputs {
            snapshot,
            tune: tune.as_ref(),
            thresholds: &thresholds,
            pedal_deadband: self.drive.pedal_deadband,
        };

        let mut faults = classify(&inputs, previous);
        let response = evaluate_faults(&faults);
        let selection = response.limit_selection(self.modes.get(mode));
        let mut violation = None;

        let (next, command) = if previous == State::Error {
            (self.error_step(&inputs, &mut faults), ActuatorCommand::fault())
        } else if let Some(id) = response.first_critical {
            error!(fault = %id, state = %previous, "critical fault, entering ERROR");
            self.ctx.pinned = Some(check_for(id));
            (State::Error, ActuatorCommand::fault())
        } else {
            self.sequence_step(previous, snapshot, tune.as_ref(), selection, &mut violation)
        };

        self.ctx.state = next;

        let outcome = StepOutcome {
            previous,
            next,
            mode,
            command,
            faults,
            pinned: self.pinned(),
            violation,
            bse_apps_violation: self.ctx.bse_apps_violation,
            selection,
            tune_installed: tune.is_some(),
        };
        if outcome.transitioned() {
            info!(from = %previous, to = %next, "state transition");
        }
        if response.derate && next.is_drive() {
            debug!(power_level = selection.power_level, "limiting fault, power derated");
        }
        outcome
    }

    // ─── ERROR ──────────────────────────────────────────────────────

    fn error_step(&mut self, inputs: &FaultInputs<'_>, faults: &mut FaultSet) -> State {
        if let Some(pinned) = self.ctx.pinned {
            // Pinned checks are re-evaluated regardless of state scoping.
            if pinned.holds(inputs) {
                faults.insert(pinned.id);
                return State::Error;
            }
            faults.remove(pinned.id);
            info!(fault = %pinned.id, "pinned fault cleared");
        }

        if let Some(id) = faults.first_critical() {
            warn!(fault = %id, "another critical fault active, repinning");
            self.ctx.pinned = Some(check_for(id));
            return State::Error;
        }

        // The BSE/APPS latch is left as is; only DRIVE_STANDBY clears it.
        self.ctx.pinned = None;
        if self.ctx.tune.is_some() { State::GlvOn } else { State::EcuFlash }
    }

    // ─── Startup Sequence And Drive States ──────────────────────────

    fn sequence_step(
        &mut self,
        state: State,
        s: &VehicleSnapshot,
        tune: Option<&Tune>,
        selection: TuneSelection,
        violation: &mut Option<PlausibilityViolation>,
    ) -> (State, ActuatorCommand) {
        let mut command = ActuatorCommand::disabled();

        let next = match state {
            State::EcuFlash => {
                if tune.is_some() { State::GlvOn } else { State::EcuFlash }
            }
            State::GlvOn => {
                if s.ts_active { State::TsPrecharge } else { State::GlvOn }
            }
            State::TsPrecharge => {
                command.precharge_request = true;
                if s.precharge_started { State::Precharging } else { State::TsPrecharge }
            }
            State::Precharging => {
                command.precharge_request = true;
                if s.precharge_done { State::PrechargeComplete } else { State::Precharging }
            }
            State::PrechargeComplete => {
                if s.ready_to_drive { State::DriveStandby } else { State::PrechargeComplete }
            }
            State::DriveStandby => self.drive_standby(s, violation),
            State::DriveActive => match tune {
                Some(tune) => self.drive_active(s, tune, selection, &mut command, violation),
                None => State::EcuFlash,
            },
            State::DriveRegen => match tune {
                Some(tune) => self.drive_regen(s, tune, selection, &mut command),
                None => State::EcuFlash,
            },
            // Handled before dispatch.
            State::Error => State::Error,
        };

        (next, command)
    }

    fn drive_standby(
        &mut self,
        s: &VehicleSnapshot,
        violation: &mut Option<PlausibilityViolation>,
    ) -> State {
        let deadband = self.drive.pedal_deadband;
        let throttle = s.throttle();

        if !self.ctx.bse_apps_violation {
            if throttle > deadband {
                State::DriveActive
            } else if s.brake() > deadband {
                State::DriveRegen
            } else {
                State::DriveStandby
            }
        } else if throttle < deadband {
            info!("BSE/APPS violation cleared");
            self.ctx.bse_apps_violation = false;
            State::DriveStandby
        } else {
            *violation = Some(PlausibilityViolation::BrakeThrottleOverlap);
            State::DriveStandby
        }
    }

    fn drive_active(
        &mut self,
        s: &VehicleSnapshot,
        tune: &Tune,
        selection: TuneSelection,
        command: &mut ActuatorCommand,
        violation: &mut Option<PlausibilityViolation>,
    ) -> State {
        match check_pedals(s, &self.drive) {
            Some(PlausibilityViolation::AppsMismatch) => {
                warn!(apps1 = s.apps1, apps2 = s.apps2, "APPS plausibility violation");
                *violation = Some(PlausibilityViolation::AppsMismatch);
                State::DriveStandby
            }
            Some(PlausibilityViolation::BrakeThrottleOverlap) => {
                warn!(apps1 = s.apps1, brake = s.brake(), "brake/throttle co-activation, latching");
                self.ctx.bse_apps_violation = true;
                *violation = Some(PlausibilityViolation::BrakeThrottleOverlap);
                State::DriveStandby
            }
            None => {
                let calc = TorqueCalculator::new(tune, selection, &self.drive);
                *command = ActuatorCommand::drive(calc.drive_current(s));
                State::DriveActive
            }
        }
    }

    fn drive_regen(
        &mut self,
        s: &VehicleSnapshot,
        tune: &Tune,
        selection: TuneSelection,
        command: &mut ActuatorCommand,
    ) -> State {
        let deadband = self.drive.pedal_deadband;
        if s.throttle() > deadband {
            State::DriveActive
        } else if s.brake() < deadband {
            State::DriveStandby
        } else {
            let regen = TorqueCalculator::new(tune, selection, &self.drive).regen_current(s);
            *command = ActuatorCommand::drive(if regen > 0.0 { -regen } else { 0.0 });
            State::DriveRegen
        }
    }
}
