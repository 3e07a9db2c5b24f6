//! Backup generator collaborator: reserve generation of last resort.

use crate::devices::types::{DeviceError, Signal};

/// Operating state reported by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Idle,
    Running,
}

/// Control surface of the household backup generator.
pub trait BackupGenerator: Send {
    fn start(&mut self) -> Result<(), DeviceError>;

    fn stop(&mut self) -> Result<(), DeviceError>;

    fn state(&self) -> Result<GeneratorState, DeviceError>;

    /// Instantaneous output. Zero while idle; unit-tagged like meter signals.
    fn current_output(&self) -> Result<Signal, DeviceError>;

    /// Nominal output tension, in volts.
    fn nominal_tension(&self) -> Result<Signal, DeviceError>;
}

/// A simulated generator with a fixed output when running.
#[derive(Debug, Clone)]
pub struct SimGenerator {
    state: GeneratorState,
    output_w: f32,
    tension_v: f32,
}

impl SimGenerator {
    /// Creates an idle generator with the given nominal output.
    ///
    /// # Panics
    ///
    /// Panics if output or tension is not positive.
    pub fn new(output_w: f32, tension_v: f32) -> Self {
        assert!(output_w > 0.0, "generator output must be positive");
        assert!(tension_v > 0.0, "tension must be positive");
        Self {
            state: GeneratorState::Idle,
            output_w,
            tension_v,
        }
    }
}

impl BackupGenerator for SimGenerator {
    fn start(&mut self) -> Result<(), DeviceError> {
        if self.state == GeneratorState::Running {
            return Err(DeviceError::Rejected("generator already running"));
        }
        self.state = GeneratorState::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        if self.state == GeneratorState::Idle {
            return Err(DeviceError::Rejected("generator already idle"));
        }
        self.state = GeneratorState::Idle;
        Ok(())
    }

    fn state(&self) -> Result<GeneratorState, DeviceError> {
        Ok(self.state)
    }

    fn current_output(&self) -> Result<Signal, DeviceError> {
        let amps = match self.state {
            GeneratorState::Running => self.output_w / self.tension_v,
            GeneratorState::Idle => 0.0,
        };
        Ok(Signal::amperes(amps))
    }

    fn nominal_tension(&self) -> Result<Signal, DeviceError> {
        Ok(Signal::volts(self.tension_v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_follows_state() {
        let mut g = SimGenerator::new(2300.0, 230.0);
        assert_eq!(g.state(), Ok(GeneratorState::Idle));
        assert_eq!(g.current_output().unwrap().value, 0.0);

        g.start().unwrap();
        let tension = g.nominal_tension().unwrap().as_volts().unwrap();
        let watts = g.current_output().unwrap().to_watts(tension).unwrap();
        assert!((watts - 2300.0).abs() < 1e-3);

        g.stop().unwrap();
        assert_eq!(g.state(), Ok(GeneratorState::Idle));
    }

    #[test]
    fn redundant_transitions_rejected() {
        let mut g = SimGenerator::new(1000.0, 230.0);
        assert!(g.stop().is_err());
        g.start().unwrap();
        assert!(g.start().is_err());
    }
}
