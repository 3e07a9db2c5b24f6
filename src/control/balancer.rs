//! The energy balancer: per-tick decision procedure over the device
//! registry, the storage bank, and the backup generator.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ApplianceConfig;
use crate::control::handle::DeviceHandle;
use crate::control::ranking::{
    StepDirection, can_be_decreased, can_be_increased, consumption_delta,
    rank_by_consumption_desc, rank_by_emergency_asc, split_by_suspension,
};
use crate::control::registry::{AdapterResolver, DeviceRegistry, RegistryError};
use crate::control::threshold::resume_threshold;
use crate::control::types::{BalanceError, BranchTaken, EnergyState, TickReport};
use crate::devices::{BackupGenerator, GeneratorState, Meter, StorageBank};

/// Balancer tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancerConfig {
    /// Minimum energy slack (watts) required before acting; prevents
    /// oscillation around zero net evolution.
    pub hysteresis_w: f32,
    /// Resume-threshold floor, used when nothing is suspended.
    pub min_emergency_threshold: f32,
    /// Resume-threshold ceiling, reached when everything is suspended.
    pub max_emergency_threshold: f32,
    /// Devices transitioned fewer than this many ticks ago are protected
    /// from preemptive suspension.
    pub min_resume_cycles: u32,
    /// A device suspended longer than this many ticks may force a resume
    /// regardless of its emergency level.
    pub max_resume_cycles: u32,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            hysteresis_w: 2.0,
            min_emergency_threshold: 0.2,
            max_emergency_threshold: 0.9,
            min_resume_cycles: 3,
            max_resume_cycles: 20,
        }
    }
}

/// The household energy-management controller.
///
/// Owns the external collaborators (meter, storage bank, generator), shares
/// the device registry with the registration protocol, and mutates device
/// modes and suspension state one budgeted action branch per tick.
pub struct EnergyBalancer {
    config: BalancerConfig,
    registry: Arc<DeviceRegistry>,
    resolver: Box<dyn AdapterResolver>,
    meter: Box<dyn Meter>,
    battery: Box<dyn StorageBank>,
    generator: Box<dyn BackupGenerator>,
    resume_threshold: f32,
    ticks: u64,
}

impl EnergyBalancer {
    /// Creates a balancer over the given registry and collaborators.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is inconsistent (negative hysteresis or
    /// inverted threshold bounds).
    pub fn new(
        config: BalancerConfig,
        registry: Arc<DeviceRegistry>,
        resolver: Box<dyn AdapterResolver>,
        meter: Box<dyn Meter>,
        battery: Box<dyn StorageBank>,
        generator: Box<dyn BackupGenerator>,
    ) -> Self {
        assert!(config.hysteresis_w >= 0.0, "hysteresis must be non-negative");
        assert!(
            config.min_emergency_threshold <= config.max_emergency_threshold,
            "emergency threshold bounds inverted"
        );
        let resume_threshold = config.min_emergency_threshold;
        Self {
            config,
            registry,
            resolver,
            meter,
            battery,
            generator,
            resume_threshold,
            ticks: 0,
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Adaptive emergency cutoff currently in effect.
    pub fn resume_threshold(&self) -> f32 {
        self.resume_threshold
    }

    /// Ticks executed since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // --- registration protocol (offered to devices) --------------------

    pub fn registered(&self, id: &str) -> bool {
        self.registry.registered(id)
    }

    /// Resolves the appliance's adapter descriptor and registers the
    /// resulting device connection.
    pub fn register_appliance(&self, spec: &ApplianceConfig) -> Result<(), RegistryError> {
        let device = self.resolver.resolve(&spec.adapter, spec)?;
        self.registry.register(spec.id.clone(), device)
    }

    pub fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        self.registry.unregister(id)
    }

    // --- control loop body ---------------------------------------------

    /// Executes one balancing tick and returns its record.
    ///
    /// Holds the registry lock across the whole read-rank-act sequence, so
    /// registration cannot interleave with a tick. Registered-device
    /// failures are neutralized; only meter precondition violations abort
    /// the tick.
    pub fn tick(&mut self) -> Result<TickReport, BalanceError> {
        self.ticks += 1;
        let tick = self.ticks;

        // 1. Read the meter; ampere signals are scaled by line tension.
        let tension_v = self.meter.tension()?.as_volts()?;
        let production_w = self.meter.current_production()?.to_watts(tension_v)?;
        let consumption_w = self.meter.current_consumption()?.to_watts(tension_v)?;
        let energy = EnergyState::new(production_w, consumption_w);

        // 2. Exclude registry mutation for the rest of the tick.
        let registry = Arc::clone(&self.registry);
        let mut devices = registry.lock();
        let devices_total = devices.len();
        let suspended_before = devices.values().filter(|h| h.is_suspended()).count();

        // 3. One branch per tick: surplus or deficit.
        let (branch, remaining_w) = if energy.net_w >= 0.0 {
            self.surplus(energy.net_w, suspended_before, devices_total, &mut devices)
        } else {
            self.deficit(energy.net_w, &mut devices)
        };

        // 4. Every registered device ages by one cycle; devices that
        //    transitioned this tick start counting next tick.
        for handle in devices.values_mut() {
            handle.advance_cycle();
        }
        let devices_suspended = devices.values().filter(|h| h.is_suspended()).count();
        drop(devices);

        let report = TickReport {
            tick,
            energy,
            resume_threshold: self.resume_threshold,
            devices_total,
            devices_suspended,
            branch,
            remaining_w,
        };
        debug!(%report, "balance tick");
        Ok(report)
    }

    /// Surplus handling: resume, stop reserve generation, grow consumption,
    /// or store the excess. First applicable branch wins.
    fn surplus(
        &mut self,
        net_w: f32,
        suspended_count: usize,
        devices_total: usize,
        devices: &mut std::collections::BTreeMap<String, DeviceHandle>,
    ) -> (BranchTaken, f32) {
        self.resume_threshold = resume_threshold(
            suspended_count,
            devices_total,
            self.config.min_emergency_threshold,
            self.config.max_emergency_threshold,
        );
        let hysteresis_w = self.config.hysteresis_w;
        let (mut active, mut suspended) = split_by_suspension(devices.values_mut());

        if !suspended.is_empty() {
            let (remaining, resumed, preempted) =
                self.resume_urgent(net_w, &mut active, &mut suspended);
            (BranchTaken::ResumedUrgent { resumed, preempted }, remaining)
        } else if self.generator_running() && net_w >= self.generator_output_w() + hysteresis_w {
            if let Err(err) = self.generator.stop() {
                warn!(error = %err, "generator stop rejected");
            }
            (BranchTaken::GeneratorStopped, net_w)
        } else if active.iter().any(|device| can_be_increased(device)) {
            let (remaining, steps) = Self::increase_devices(net_w, hysteresis_w, &mut active);
            (BranchTaken::Increased { steps }, remaining)
        } else {
            if let Err(err) = self.battery.start_charging() {
                warn!(error = %err, "battery charge start rejected");
            }
            (BranchTaken::BatteryChargeStarted, net_w)
        }
    }

    /// Deficit handling: release storage load, shrink consumption, bring
    /// reserve generation online, or shed. First applicable branch wins.
    fn deficit(
        &mut self,
        net_w: f32,
        devices: &mut std::collections::BTreeMap<String, DeviceHandle>,
    ) -> (BranchTaken, f32) {
        let hysteresis_w = self.config.hysteresis_w;
        if self.battery_charging() {
            if let Err(err) = self.battery.stop_charging() {
                warn!(error = %err, "battery charge stop rejected");
            }
            return (BranchTaken::BatteryChargeStopped, net_w);
        }

        let (mut active, _suspended) = split_by_suspension(devices.values_mut());
        if active.iter().any(|device| can_be_decreased(device)) {
            let (remaining, steps) = Self::decrease_devices(net_w, hysteresis_w, &mut active);
            (BranchTaken::Decreased { steps }, remaining)
        } else if !self.generator_running() {
            if let Err(err) = self.generator.start() {
                warn!(error = %err, "generator start rejected");
            }
            (BranchTaken::GeneratorStarted, net_w)
        } else {
            let (remaining, suspended) = Self::shed_devices(net_w, hysteresis_w, &mut active);
            (BranchTaken::Shed { suspended }, remaining)
        }
    }

    /// Resumes suspended devices most-urgent-first within the surplus
    /// budget, preempting lower-priority consumers for devices whose
    /// emergency crossed the threshold or that waited past the forced
    /// resume limit.
    fn resume_urgent(
        &mut self,
        mut available_w: f32,
        active: &mut Vec<&mut DeviceHandle>,
        suspended: &mut Vec<&mut DeviceHandle>,
    ) -> (f32, u32, u32) {
        let hysteresis_w = self.config.hysteresis_w;
        rank_by_consumption_desc(active);
        rank_by_emergency_asc(suspended);

        let mut resumed = 0u32;
        let mut preempted = 0u32;
        // Ascending ranking consumed from the tail: most urgent first.
        for device in suspended.iter_mut().rev() {
            if available_w <= hysteresis_w {
                break;
            }
            let needed_w = device.mode_consumption_w(1);
            if available_w >= needed_w + hysteresis_w {
                if device.try_resume() {
                    device.try_set_mode(1);
                    available_w -= needed_w;
                    resumed += 1;
                }
                continue;
            }

            let forced = device.emergency() >= self.resume_threshold
                || device.cycles_since_transition() > self.config.max_resume_cycles;
            if !forced {
                continue;
            }
            if let Some((freed_w, count)) = Self::free_energy(
                self.config.min_resume_cycles,
                active,
                available_w,
                needed_w + hysteresis_w,
            ) {
                preempted += count;
                available_w = freed_w;
                if available_w >= needed_w + hysteresis_w && device.try_resume() {
                    device.try_set_mode(1);
                    available_w -= needed_w;
                    resumed += 1;
                }
            }
        }
        (available_w, resumed, preempted)
    }

    /// Steps modes up, smallest consumers first (descending ranking walked
    /// from its tail), while surplus remains above the hysteresis margin.
    /// Repeats passes so a lone device can climb several modes in one tick.
    fn increase_devices(
        mut available_w: f32,
        hysteresis_w: f32,
        active: &mut Vec<&mut DeviceHandle>,
    ) -> (f32, u32) {
        rank_by_consumption_desc(active);
        let mut steps = 0u32;
        'passes: loop {
            let mut progressed = false;
            for device in active.iter_mut().rev() {
                if available_w <= hysteresis_w {
                    break 'passes;
                }
                if !can_be_increased(device) {
                    continue;
                }
                let cost_w = consumption_delta(device, StepDirection::Up);
                if available_w >= cost_w && device.try_up_mode() {
                    available_w -= cost_w;
                    steps += 1;
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        (available_w, steps)
    }

    /// Steps modes down, largest consumers first, until the deficit is
    /// recovered past the hysteresis margin.
    fn decrease_devices(
        mut available_w: f32,
        hysteresis_w: f32,
        active: &mut Vec<&mut DeviceHandle>,
    ) -> (f32, u32) {
        rank_by_consumption_desc(active);
        let mut steps = 0u32;
        'passes: loop {
            let mut progressed = false;
            for device in active.iter_mut() {
                if available_w >= hysteresis_w {
                    break 'passes;
                }
                if !can_be_decreased(device) {
                    continue;
                }
                let gain_w = consumption_delta(device, StepDirection::Down);
                if device.try_down_mode() {
                    available_w += gain_w;
                    steps += 1;
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        (available_w, steps)
    }

    /// Forced shedding: suspends largest consumers first until the deficit
    /// is recovered. Single pass; suspension resets the cycle counter.
    fn shed_devices(
        mut available_w: f32,
        hysteresis_w: f32,
        active: &mut Vec<&mut DeviceHandle>,
    ) -> (f32, u32) {
        rank_by_consumption_desc(active);
        let mut suspended = 0u32;
        for device in active.iter_mut() {
            if available_w >= hysteresis_w {
                break;
            }
            let gain_w = device.current_consumption_w();
            if device.try_suspend() {
                available_w += gain_w;
                suspended += 1;
            }
        }
        (available_w, suspended)
    }

    /// Preemptive suspension: scans active consumers largest-first for
    /// candidates old enough (`min_resume_cycles`) to evict, and commits
    /// the whole candidate set only once the accumulated draw closes the
    /// gap to `target_w`. Returns the new budget and eviction count, or
    /// `None` (nothing touched) when the target is unreachable.
    fn free_energy(
        min_resume_cycles: u32,
        active: &mut [&mut DeviceHandle],
        available_w: f32,
        target_w: f32,
    ) -> Option<(f32, u32)> {
        let mut candidates: Vec<(usize, f32)> = Vec::new();
        let mut accumulated_w = 0.0;
        for (index, device) in active.iter().enumerate() {
            if device.is_suspended() {
                continue;
            }
            if device.cycles_since_transition() < min_resume_cycles {
                continue;
            }
            let draw_w = device.current_consumption_w();
            if draw_w <= 0.0 {
                continue;
            }
            candidates.push((index, draw_w));
            accumulated_w += draw_w;
            if available_w + accumulated_w >= target_w {
                let mut freed_w = 0.0;
                let mut count = 0u32;
                for &(candidate, draw) in &candidates {
                    if active[candidate].try_suspend() {
                        freed_w += draw;
                        count += 1;
                    }
                }
                return Some((available_w + freed_w, count));
            }
        }
        None
    }

    // --- collaborator queries with neutral-value failure handling -------

    fn battery_charging(&self) -> bool {
        match self.battery.is_charging() {
            Ok(charging) => charging,
            Err(err) => {
                warn!(error = %err, "battery charge query failed");
                false
            }
        }
    }

    fn generator_running(&self) -> bool {
        match self.generator.state() {
            Ok(state) => state == GeneratorState::Running,
            Err(err) => {
                warn!(error = %err, "generator state query failed");
                false
            }
        }
    }

    /// Generator output in watts; any failure reads as zero output.
    fn generator_output_w(&self) -> f32 {
        let tension_v = match self.generator.nominal_tension().map(|s| s.as_volts()) {
            Ok(Ok(volts)) => volts,
            Ok(Err(err)) => {
                warn!(error = %err, "generator tension signal invalid");
                return 0.0;
            }
            Err(err) => {
                warn!(error = %err, "generator tension query failed");
                return 0.0;
            }
        };
        match self.generator.current_output().map(|s| s.to_watts(tension_v)) {
            Ok(Ok(watts)) => watts,
            Ok(Err(err)) => {
                warn!(error = %err, "generator output signal invalid");
                0.0
            }
            Err(err) => {
                warn!(error = %err, "generator output query failed");
                0.0
            }
        }
    }
}

impl std::fmt::Debug for EnergyBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnergyBalancer")
            .field("config", &self.config)
            .field("resume_threshold", &self.resume_threshold)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}
