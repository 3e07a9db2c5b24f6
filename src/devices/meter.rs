//! Household meter: production/consumption signals and the line tension.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::devices::types::{DeviceError, Signal};

/// Read access to the household's electrical totals.
///
/// Production and consumption signals are unit-tagged; implementations may
/// report watts directly or amperes to be scaled by [`Meter::tension`].
pub trait Meter: Send {
    /// Total current production across local sources.
    fn current_production(&mut self) -> Result<Signal, DeviceError>;

    /// Total current consumption across all loads.
    fn current_consumption(&mut self) -> Result<Signal, DeviceError>;

    /// Line tension, in volts.
    fn tension(&self) -> Result<Signal, DeviceError>;
}

/// A simulated meter with sinusoidal daily profiles plus Gaussian noise.
///
/// Both totals follow a daily sinus around a configurable baseline, sampled
/// once per production read: `current_production` advances the internal
/// timestep and `current_consumption` reports the same step, matching the
/// read order of the control loop. Signals are reported in amperes so the
/// consumer exercises the current-to-power conversion path.
#[derive(Debug, Clone)]
pub struct SimMeter {
    base_production_w: f32,
    production_amp_w: f32,
    base_consumption_w: f32,
    consumption_amp_w: f32,
    noise_std_w: f32,
    steps_per_day: usize,
    tension_v: f32,
    timestep: usize,
    rng: StdRng,
}

impl SimMeter {
    /// Creates a simulated meter.
    ///
    /// # Panics
    ///
    /// Panics if `steps_per_day` is zero or `tension_v` is not positive.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        base_production_w: f32,
        production_amp_w: f32,
        base_consumption_w: f32,
        consumption_amp_w: f32,
        noise_std_w: f32,
        steps_per_day: usize,
        tension_v: f32,
        seed: u64,
    ) -> Self {
        assert!(steps_per_day > 0, "steps_per_day must be > 0");
        assert!(tension_v > 0.0, "tension must be positive");
        Self {
            base_production_w,
            production_amp_w,
            base_consumption_w,
            consumption_amp_w,
            noise_std_w,
            steps_per_day,
            tension_v,
            timestep: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn day_angle(&self) -> f32 {
        let day_pos = (self.timestep % self.steps_per_day) as f32 / self.steps_per_day as f32;
        2.0 * std::f32::consts::PI * day_pos
    }

    fn noise_w(&mut self) -> f32 {
        if self.noise_std_w <= 0.0 {
            return 0.0;
        }
        // Gaussian-ish noise via Box-Muller.
        let u1: f32 = self.rng.random::<f32>().clamp(1e-6, 1.0);
        let u2: f32 = self.rng.random::<f32>();
        let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
        z0 * self.noise_std_w
    }

    fn watts_to_signal(&self, watts: f32) -> Signal {
        Signal::amperes(watts / self.tension_v)
    }
}

impl Meter for SimMeter {
    fn current_production(&mut self) -> Result<Signal, DeviceError> {
        self.timestep += 1;
        let angle = self.day_angle();
        let watts = (self.base_production_w + self.production_amp_w * angle.sin() + self.noise_w())
            .max(0.0);
        Ok(self.watts_to_signal(watts))
    }

    fn current_consumption(&mut self) -> Result<Signal, DeviceError> {
        let angle = self.day_angle();
        let watts = (self.base_consumption_w + self.consumption_amp_w * angle.cos()
            + self.noise_w())
        .max(0.0);
        Ok(self.watts_to_signal(watts))
    }

    fn tension(&self) -> Result<Signal, DeviceError> {
        Ok(Signal::volts(self.tension_v))
    }
}
