//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use hem_sim::control::{ApplianceCatalog, BalancerConfig, DeviceRegistry, EnergyBalancer};
use hem_sim::devices::{
    Adjustable, BackupGenerator, DeviceError, GeneratorState, Meter, Signal, StorageBank,
};

/// Observable state of a scripted appliance, shared with the test body.
#[derive(Debug, Clone)]
pub struct ScriptedState {
    pub modes_w: Vec<f32>,
    pub mode: u32,
    pub suspended: bool,
    pub emergency: f32,
    pub refuse_suspend: bool,
}

/// Handle the test keeps to inspect or mutate a scripted appliance.
pub type StateProbe = Arc<Mutex<ScriptedState>>;

/// Appliance whose behavior is fully determined by a shared state cell.
pub struct ScriptedDevice(StateProbe);

impl ScriptedDevice {
    pub fn new(probe: StateProbe) -> Self {
        Self(probe)
    }
}

impl Adjustable for ScriptedDevice {
    fn max_mode(&self) -> Result<u32, DeviceError> {
        Ok(self.0.lock().modes_w.len() as u32)
    }

    fn current_mode(&self) -> Result<u32, DeviceError> {
        let state = self.0.lock();
        if state.suspended {
            return Err(DeviceError::Suspended);
        }
        Ok(state.mode)
    }

    fn set_mode(&mut self, mode: u32) -> Result<(), DeviceError> {
        let mut state = self.0.lock();
        if state.suspended {
            return Err(DeviceError::Suspended);
        }
        let max = state.modes_w.len() as u32;
        if mode == 0 || mode > max {
            return Err(DeviceError::ModeOutOfRange {
                requested: mode,
                max,
            });
        }
        state.mode = mode;
        Ok(())
    }

    fn up_mode(&mut self) -> Result<(), DeviceError> {
        let mode = self.current_mode()?;
        self.set_mode(mode + 1)
    }

    fn down_mode(&mut self) -> Result<(), DeviceError> {
        let mode = self.current_mode()?;
        self.set_mode(mode.wrapping_sub(1))
    }

    fn mode_consumption_w(&self, mode: u32) -> Result<f32, DeviceError> {
        let state = self.0.lock();
        let max = state.modes_w.len() as u32;
        state
            .modes_w
            .get(mode.wrapping_sub(1) as usize)
            .copied()
            .ok_or(DeviceError::ModeOutOfRange {
                requested: mode,
                max,
            })
    }

    fn is_suspended(&self) -> Result<bool, DeviceError> {
        Ok(self.0.lock().suspended)
    }

    fn suspend(&mut self) -> Result<(), DeviceError> {
        let mut state = self.0.lock();
        if state.suspended {
            return Err(DeviceError::Suspended);
        }
        if state.refuse_suspend {
            return Err(DeviceError::Rejected("held by test script"));
        }
        state.suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DeviceError> {
        let mut state = self.0.lock();
        if !state.suspended {
            return Err(DeviceError::NotSuspended);
        }
        state.suspended = false;
        Ok(())
    }

    fn emergency(&self) -> Result<f32, DeviceError> {
        let state = self.0.lock();
        if !state.suspended {
            return Err(DeviceError::NotSuspended);
        }
        Ok(state.emergency)
    }
}

/// Meter reading a shared `(production_w, consumption_w)` cell.
pub struct ScriptedMeter {
    feed: Arc<Mutex<(f32, f32)>>,
}

impl Meter for ScriptedMeter {
    fn current_production(&mut self) -> Result<Signal, DeviceError> {
        Ok(Signal::watts(self.feed.lock().0))
    }

    fn current_consumption(&mut self) -> Result<Signal, DeviceError> {
        Ok(Signal::watts(self.feed.lock().1))
    }

    fn tension(&self) -> Result<Signal, DeviceError> {
        Ok(Signal::volts(230.0))
    }
}

/// Storage bank whose charging relay is observable from the test.
pub struct SharedBattery {
    charging: Arc<Mutex<bool>>,
}

impl StorageBank for SharedBattery {
    fn start_charging(&mut self) -> Result<(), DeviceError> {
        let mut charging = self.charging.lock();
        if *charging {
            return Err(DeviceError::Rejected("already charging"));
        }
        *charging = true;
        Ok(())
    }

    fn stop_charging(&mut self) -> Result<(), DeviceError> {
        let mut charging = self.charging.lock();
        if !*charging {
            return Err(DeviceError::Rejected("not charging"));
        }
        *charging = false;
        Ok(())
    }

    fn is_charging(&self) -> Result<bool, DeviceError> {
        Ok(*self.charging.lock())
    }
}

/// Generator whose state is observable (and presettable) from the test.
pub struct SharedGenerator {
    state: Arc<Mutex<GeneratorState>>,
    output_w: f32,
}

impl BackupGenerator for SharedGenerator {
    fn start(&mut self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if *state == GeneratorState::Running {
            return Err(DeviceError::Rejected("generator already running"));
        }
        *state = GeneratorState::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if *state == GeneratorState::Idle {
            return Err(DeviceError::Rejected("generator already idle"));
        }
        *state = GeneratorState::Idle;
        Ok(())
    }

    fn state(&self) -> Result<GeneratorState, DeviceError> {
        Ok(*self.state.lock())
    }

    fn current_output(&self) -> Result<Signal, DeviceError> {
        let watts = match *self.state.lock() {
            GeneratorState::Running => self.output_w,
            GeneratorState::Idle => 0.0,
        };
        Ok(Signal::watts(watts))
    }

    fn nominal_tension(&self) -> Result<Signal, DeviceError> {
        Ok(Signal::volts(230.0))
    }
}

/// A balancer wired to scripted collaborators, with probes into all of them.
pub struct Harness {
    pub balancer: EnergyBalancer,
    pub registry: Arc<DeviceRegistry>,
    pub power: Arc<Mutex<(f32, f32)>>,
    pub battery_charging: Arc<Mutex<bool>>,
    pub generator_state: Arc<Mutex<GeneratorState>>,
}

impl Harness {
    /// Harness with the default 2300 W generator.
    pub fn new(config: BalancerConfig) -> Self {
        Self::with_generator_output(config, 2300.0)
    }

    pub fn with_generator_output(config: BalancerConfig, output_w: f32) -> Self {
        let registry = Arc::new(DeviceRegistry::new());
        let power = Arc::new(Mutex::new((0.0, 0.0)));
        let battery_charging = Arc::new(Mutex::new(false));
        let generator_state = Arc::new(Mutex::new(GeneratorState::Idle));
        let balancer = EnergyBalancer::new(
            config,
            Arc::clone(&registry),
            Box::new(ApplianceCatalog),
            Box::new(ScriptedMeter {
                feed: Arc::clone(&power),
            }),
            Box::new(SharedBattery {
                charging: Arc::clone(&battery_charging),
            }),
            Box::new(SharedGenerator {
                state: Arc::clone(&generator_state),
                output_w,
            }),
        );
        Self {
            balancer,
            registry,
            power,
            battery_charging,
            generator_state,
        }
    }

    /// Sets the meter readings seen by subsequent ticks.
    pub fn set_power(&self, production_w: f32, consumption_w: f32) {
        *self.power.lock() = (production_w, consumption_w);
    }

    /// Registers an active scripted appliance and returns its probe.
    pub fn add_active(&self, id: &str, modes_w: &[f32], mode: u32) -> StateProbe {
        self.add_scripted(
            id,
            ScriptedState {
                modes_w: modes_w.to_vec(),
                mode,
                suspended: false,
                emergency: 0.0,
                refuse_suspend: false,
            },
        )
    }

    /// Registers a suspended scripted appliance and returns its probe.
    pub fn add_suspended(&self, id: &str, modes_w: &[f32], emergency: f32) -> StateProbe {
        self.add_scripted(
            id,
            ScriptedState {
                modes_w: modes_w.to_vec(),
                mode: 1,
                suspended: true,
                emergency,
                refuse_suspend: false,
            },
        )
    }

    pub fn add_scripted(&self, id: &str, state: ScriptedState) -> StateProbe {
        let probe: StateProbe = Arc::new(Mutex::new(state));
        self.registry
            .register(id, Box::new(ScriptedDevice::new(Arc::clone(&probe))))
            .unwrap();
        probe
    }

    pub fn battery_charging(&self) -> bool {
        *self.battery_charging.lock()
    }

    pub fn generator_running(&self) -> bool {
        *self.generator_state.lock() == GeneratorState::Running
    }
}
