//! Deterministic control cycle: read → step → write.
//!
//! ## RT Setup
//! With the `rt` feature, [`rt_setup`] locks all pages, prefaults the stack,
//! pins the process to one core and switches it to `SCHED_FIFO`. Without the
//! feature it does nothing.
//!
//! ## Cycle Body
//! 1. Read one `CycleInput` from telemetry (end of stream stops the loop).
//! 2. Step the drive state machine.
//! 3. Write the actuator command. A failed write is fatal.
//! 4. Report faults to the display when the state, fault set or violation
//!    changed, and every `display_interval` cycles. A failed report is
//!    logged and ignored.
//!
//! ## Pacing
//! With `realtime` set, cycles start on absolute deadlines
//! (`clock_nanosleep(TIMER_ABSTIME)` under `rt`, `std::thread::sleep`
//! otherwise). Without it the loop replays input as fast as it can.
//! An overrun is fatal under `rt` and counted otherwise.

use std::sync::atomic::{AtomicBool, Ordering};

use ecu_common::config::EcuConfig;
use ecu_common::fault::{FaultFlags, PlausibilityViolation};
use ecu_common::state::State;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::io::{ActuatorSink, FaultDisplay, IoError, TelemetrySource};
use crate::state::{DriveStateMachine, StepOutcome};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of overruns detected.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 { 0 } else { self.sum_cycle_ns / self.cycle_count as i64 }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("{call} failed: {reason}")]
    Rt { call: &'static str, reason: String },

    /// Telemetry or actuator collaborator failed.
    #[error("collaborator error: {0}")]
    Io(#[from] IoError),

    /// Cycle exceeded its time budget.
    #[error("cycle overrun: {actual_ns}ns > {budget_ns}ns budget")]
    CycleOverrun { actual_ns: i64, budget_ns: i64 },
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_failed<E: std::fmt::Display>(call: &'static str) -> impl FnOnce(E) -> CycleError {
    move |e| CycleError::Rt { call, reason: e.to_string() }
}

/// Touch 256 KiB of stack so the RT loop does not page-fault on it.
#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusively borrowed stack location.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Lock memory, pin to `cpu_core` and run at `SCHED_FIFO` priority
/// `rt_priority`. Call before entering the loop.
#[cfg(feature = "rt")]
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::sys::mman::{mlockall, MlockallFlags};
    use nix::unistd::Pid;

    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE).map_err(rt_failed("mlockall"))?;
    prefault_stack();

    let mut cores = CpuSet::new();
    cores.set(cpu_core).map_err(rt_failed("CpuSet::set"))?;
    sched_setaffinity(Pid::from_raw(0), &cores).map_err(rt_failed("sched_setaffinity"))?;

    let param = libc::sched_param { sched_priority: rt_priority };
    // SAFETY: `param` is a valid sched_param; pid 0 is the calling thread.
    if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
        return Err(rt_failed("sched_setscheduler")(std::io::Error::last_os_error()));
    }

    info!(cpu_core, rt_priority, "RT setup complete");
    Ok(())
}

#[cfg(not(feature = "rt"))]
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    debug!(cpu_core, rt_priority, "built without `rt`, skipping RT setup");
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// What the display last saw; a change forces a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DisplayKey {
    state: State,
    faults: FaultFlags,
    violation: Option<PlausibilityViolation>,
}

impl DisplayKey {
    fn of(outcome: &StepOutcome) -> Self {
        Self {
            state: outcome.next,
            faults: outcome.faults.flags(),
            violation: outcome.violation,
        }
    }
}

/// Owns the state machine and its collaborators and drives the cycle.
pub struct CycleRunner<T, O> {
    machine: DriveStateMachine,
    telemetry: T,
    output: O,
    stats: CycleStats,
    cycle: u64,
    cycle_time_ns: i64,
    display_interval: u64,
    last_display: Option<DisplayKey>,
    realtime: bool,
}

impl<T, O> CycleRunner<T, O>
where
    T: TelemetrySource,
    O: ActuatorSink + FaultDisplay,
{
    pub fn new(config: &EcuConfig, machine: DriveStateMachine, telemetry: T, output: O) -> Self {
        Self {
            machine,
            telemetry,
            output,
            stats: CycleStats::new(),
            cycle: 0,
            cycle_time_ns: config.cycle_time_us as i64 * 1_000,
            display_interval: u64::from(config.display_interval.max(1)),
            last_display: None,
            realtime: false,
        }
    }

    /// Pace cycles at the configured cycle time.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    #[inline]
    pub fn machine(&self) -> &DriveStateMachine {
        &self.machine
    }

    #[inline]
    pub fn machine_mut(&mut self) -> &mut DriveStateMachine {
        &mut self.machine
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }

    /// Cycles executed so far.
    #[inline]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Execute one cycle body. `Ok(None)` at end of telemetry.
    pub fn run_once(&mut self) -> Result<Option<StepOutcome>, CycleError> {
        let Some(input) = self.telemetry.next_input()? else {
            return Ok(None);
        };

        let outcome = self.machine.step(&input.snapshot, input.mode);

        // Command first: the safety action never waits on the display.
        self.output.apply(self.cycle, &outcome.command)?;

        let key = DisplayKey::of(&outcome);
        let periodic = self.cycle % self.display_interval == 0;
        if periodic || self.last_display != Some(key) {
            let report = outcome.report();
            match self.output.report(self.cycle, &report) {
                Ok(()) => {
                    if !report.is_clear() {
                        debug!(cycle = self.cycle, faults = report.faults.len(), "fault report sent");
                    }
                    self.last_display = Some(key);
                }
                Err(e) => warn!(cycle = self.cycle, "fault display failed: {e}"),
            }
        }

        self.cycle += 1;
        Ok(Some(outcome))
    }

    /// Run until telemetry ends or `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        let result = if self.realtime {
            #[cfg(feature = "rt")]
            {
                self.run_rt_loop(running)
            }
            #[cfg(not(feature = "rt"))]
            {
                self.run_sim_loop(running)
            }
        } else {
            self.run_replay_loop(running)
        };

        info!(
            cycles = self.stats.cycle_count,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            state = %self.machine.state(),
            "cycle loop stopped"
        );
        result
    }

    /// Unpaced loop for replaying recorded telemetry.
    fn run_replay_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        use std::time::Instant;

        while running.load(Ordering::SeqCst) {
            let start = Instant::now();
            if self.run_once()?.is_none() {
                break;
            }
            self.stats.record(start.elapsed().as_nanos() as i64, 0);
        }
        Ok(())
    }

    /// Paced loop on `std::thread::sleep`. Overruns are counted, not fatal.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        use std::time::{Duration, Instant};

        let period = Duration::from_nanos(self.cycle_time_ns as u64);
        let mut next_wake = Instant::now();

        while running.load(Ordering::SeqCst) {
            next_wake += period;
            let start = Instant::now();

            if self.run_once()?.is_none() {
                break;
            }

            let duration_ns = start.elapsed().as_nanos() as i64;
            self.stats.record(duration_ns, 0);
            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
                debug!(duration_ns, budget_ns = self.cycle_time_ns, "cycle overrun");
            }

            let now = Instant::now();
            if next_wake > now {
                std::thread::sleep(next_wake - now);
            } else {
                // Fell behind; re-anchor instead of bursting to catch up.
                next_wake = now;
            }
        }
        Ok(())
    }

    /// RT loop using `clock_nanosleep(TIMER_ABSTIME)`. First overrun is fatal.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        use nix::time::{clock_gettime, clock_nanosleep, ClockId, ClockNanosleepFlags};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(rt_failed("clock_gettime"));
        let mut next_wake = now()?;

        while running.load(Ordering::SeqCst) {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let cycle_start = now()?;
            let wake_latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();

            if self.run_once()?.is_none() {
                break;
            }

            let cycle_end = now()?;
            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            self.stats.record(duration_ns, wake_latency_ns);
            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
                return Err(CycleError::CycleOverrun {
                    actual_ns: duration_ns,
                    budget_ns: self.cycle_time_ns,
                });
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }
}

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;

    let total = ts.tv_nsec() + ns;
    let secs = ts.tv_sec() + total.div_euclid(1_000_000_000);
    let nanos = total.rem_euclid(1_000_000_000);
    TimeSpec::new(secs, nanos)
}

/// Difference `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
