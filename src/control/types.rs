//! Core control-loop types: tick-local energy state, per-tick reports,
//! and the balancer error taxonomy.

use std::fmt;

use thiserror::Error;

use crate::devices::types::{DeviceError, UnsupportedUnit};

/// Errors that abort a single balancing tick.
///
/// Only meter-side precondition violations land here; registered-device
/// failures are neutralized inside the tick and never surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BalanceError {
    /// The meter itself failed; without readings a tick cannot run.
    #[error("meter read failed: {0}")]
    Meter(#[from] DeviceError),
    /// A meter or generator signal carried a unit that cannot express power.
    #[error(transparent)]
    Unit(#[from] UnsupportedUnit),
}

/// Tick-local snapshot of the household energy situation.
///
/// Recomputed from meter readings at the start of every tick; never shared
/// across ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyState {
    /// Total production, in watts.
    pub production_w: f32,
    /// Total consumption, in watts.
    pub consumption_w: f32,
    /// `production_w - consumption_w`; positive means surplus.
    pub net_w: f32,
}

impl EnergyState {
    pub fn new(production_w: f32, consumption_w: f32) -> Self {
        Self {
            production_w,
            consumption_w,
            net_w: production_w - consumption_w,
        }
    }
}

/// The single action branch a tick committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTaken {
    /// Surplus: attempted resumption of suspended devices.
    ResumedUrgent { resumed: u32, preempted: u32 },
    /// Surplus: stopped the backup generator.
    GeneratorStopped,
    /// Surplus: stepped device modes up.
    Increased { steps: u32 },
    /// Surplus: routed the excess into storage.
    BatteryChargeStarted,
    /// Deficit: released the charging load.
    BatteryChargeStopped,
    /// Deficit: stepped device modes down.
    Decreased { steps: u32 },
    /// Deficit: brought reserve generation online.
    GeneratorStarted,
    /// Deficit: forcibly shed load.
    Shed { suspended: u32 },
}

impl BranchTaken {
    fn label(&self) -> &'static str {
        match self {
            BranchTaken::ResumedUrgent { .. } => "resume",
            BranchTaken::GeneratorStopped => "gen-stop",
            BranchTaken::Increased { .. } => "increase",
            BranchTaken::BatteryChargeStarted => "charge-start",
            BranchTaken::BatteryChargeStopped => "charge-stop",
            BranchTaken::Decreased { .. } => "decrease",
            BranchTaken::GeneratorStarted => "gen-start",
            BranchTaken::Shed { .. } => "shed",
        }
    }
}

/// Complete record of one balancing tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Tick index since the loop started.
    pub tick: u64,
    /// Energy readings this tick acted on.
    pub energy: EnergyState,
    /// Adaptive resume threshold in effect during this tick.
    pub resume_threshold: f32,
    /// Registered devices at tick time.
    pub devices_total: usize,
    /// Suspended devices after the tick's action.
    pub devices_suspended: usize,
    /// The action branch taken.
    pub branch: BranchTaken,
    /// Unallocated budget left after the action, in watts (signed).
    pub remaining_w: f32,
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} | prod={:>7.1} W  cons={:>7.1} W  net={:>7.1} W | \
             {} rem={:.1} W | devices={} suspended={} threshold={:.2}",
            self.tick,
            self.energy.production_w,
            self.energy.consumption_w,
            self.energy.net_w,
            self.branch.label(),
            self.remaining_w,
            self.devices_total,
            self.devices_suspended,
            self.resume_threshold,
        )
    }
}
