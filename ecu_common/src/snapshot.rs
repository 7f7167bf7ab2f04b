//! Per-cycle vehicle snapshot supplied by the telemetry collaborator.
//!
//! A snapshot is produced fresh every control cycle and is never mutated by
//! the drive-control core.

use serde::{Deserialize, Serialize};

use crate::state::Mode;

/// CAN nodes whose message age is tracked for liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CanNode {
    Inverter = 0,
    Ecu = 1,
    Pedals = 2,
    Acu = 3,
    Bcm = 4,
    EnergyMeter = 5,
    WheelFl = 6,
    WheelFr = 7,
    WheelRl = 8,
    WheelRr = 9,
    Dashboard = 10,
    Gps = 11,
}

impl CanNode {
    pub const COUNT: usize = 12;

    /// Nodes the car cannot drive without.
    pub const DRIVE_CRITICAL: [CanNode; 6] = [
        CanNode::Inverter,
        CanNode::Ecu,
        CanNode::Pedals,
        CanNode::Acu,
        CanNode::Bcm,
        CanNode::EnergyMeter,
    ];

    /// Nodes whose loss is only surfaced to the driver.
    pub const NON_CRITICAL: [CanNode; 6] = [
        CanNode::WheelFl,
        CanNode::WheelFr,
        CanNode::WheelRl,
        CanNode::WheelRr,
        CanNode::Dashboard,
        CanNode::Gps,
    ];
}

/// Milliseconds since the last frame was received from each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeAges {
    pub inverter: u32,
    pub ecu: u32,
    pub pedals: u32,
    pub acu: u32,
    pub bcm: u32,
    pub energy_meter: u32,
    pub wheel_fl: u32,
    pub wheel_fr: u32,
    pub wheel_rl: u32,
    pub wheel_rr: u32,
    pub dashboard: u32,
    pub gps: u32,
}

impl NodeAges {
    /// All nodes reporting the same age.
    pub const fn uniform(age_ms: u32) -> Self {
        Self {
            inverter: age_ms,
            ecu: age_ms,
            pedals: age_ms,
            acu: age_ms,
            bcm: age_ms,
            energy_meter: age_ms,
            wheel_fl: age_ms,
            wheel_fr: age_ms,
            wheel_rl: age_ms,
            wheel_rr: age_ms,
            dashboard: age_ms,
            gps: age_ms,
        }
    }

    #[inline]
    pub const fn get(&self, node: CanNode) -> u32 {
        match node {
            CanNode::Inverter => self.inverter,
            CanNode::Ecu => self.ecu,
            CanNode::Pedals => self.pedals,
            CanNode::Acu => self.acu,
            CanNode::Bcm => self.bcm,
            CanNode::EnergyMeter => self.energy_meter,
            CanNode::WheelFl => self.wheel_fl,
            CanNode::WheelFr => self.wheel_fr,
            CanNode::WheelRl => self.wheel_rl,
            CanNode::WheelRr => self.wheel_rr,
            CanNode::Dashboard => self.dashboard,
            CanNode::Gps => self.gps,
        }
    }

    pub fn set(&mut self, node: CanNode, age_ms: u32) {
        let slot = match node {
            CanNode::Inverter => &mut self.inverter,
            CanNode::Ecu => &mut self.ecu,
            CanNode::Pedals => &mut self.pedals,
            CanNode::Acu => &mut self.acu,
            CanNode::Bcm => &mut self.bcm,
            CanNode::EnergyMeter => &mut self.energy_meter,
            CanNode::WheelFl => &mut self.wheel_fl,
            CanNode::WheelFr => &mut self.wheel_fr,
            CanNode::WheelRl => &mut self.wheel_rl,
            CanNode::WheelRr => &mut self.wheel_rr,
            CanNode::Dashboard => &mut self.dashboard,
            CanNode::Gps => &mut self.gps,
        };
        *slot = age_ms;
    }
}

/// Read-only view of live sensor and actuator values for one cycle.
///
/// Pedal and brake values are normalised to `[0, 1]`. `erpm` is the
/// inverter's electrical RPM reading, scaled by 10.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSnapshot {
    // ── Pedals ──
    /// Primary accelerator pedal sensor.
    pub apps1: f64,
    /// Secondary accelerator pedal sensor (half scale of `apps1`).
    pub apps2: f64,
    pub brake_pressure_front: f64,
    pub brake_pressure_rear: f64,

    // ── Powertrain ──
    pub erpm: f64,
    /// Accumulator pack voltage [V].
    pub accumulator_voltage: f64,
    /// Inverter DC-link current [A].
    pub dc_current: f64,
    /// Charge current the accumulator will accept [A]. `None` until the
    /// accumulator reports one; regen stays off without it.
    pub max_charge_current: Option<f64>,

    // ── Temperatures [°C] ──
    pub motor_temp: f64,
    pub battery_temp: f64,
    pub coolant_temp: f64,

    // ── Shutdown-circuit sense lines (raw ADC counts) ──
    pub ams_sense: u16,
    pub imd_sense: u16,
    pub bspd_sense: u16,

    // ── Startup handshake ──
    /// TS-active button pressed.
    pub ts_active: bool,
    /// Accumulator acknowledged the precharge request.
    pub precharge_started: bool,
    /// Accumulator reports precharge complete.
    pub precharge_done: bool,
    /// Ready-to-drive button pressed.
    pub ready_to_drive: bool,

    /// Age of the last frame from every tracked CAN node.
    pub last_update_age_ms: NodeAges,
}

impl VehicleSnapshot {
    /// Driver throttle request. The primary sensor is authoritative; the
    /// secondary is only used for the plausibility cross-check.
    #[inline]
    pub fn throttle(&self) -> f64 {
        self.apps1
    }

    /// Mean of front and rear brake pressure.
    #[inline]
    pub fn brake(&self) -> f64 {
        (self.brake_pressure_front + self.brake_pressure_rear) / 2.0
    }

    /// Motor speed [RPM].
    #[inline]
    pub fn rpm(&self) -> f64 {
        self.erpm / 10.0
    }
}

/// Everything the core receives for one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleInput {
    /// Mode selected on the steering wheel.
    pub mode: Mode,
    pub snapshot: VehicleSnapshot,
}
