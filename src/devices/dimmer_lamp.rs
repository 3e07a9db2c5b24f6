//! Dimmable lamp with brightness steps mapped to consumption modes.

use crate::devices::types::{Adjustable, DeviceError, ModeTable};

/// Floor emergency reported by a suspended lamp. Lighting is never urgent
/// enough to preempt other loads on its own.
const LAMP_EMERGENCY: f32 = 0.1;

/// A simulated dimmer lamp.
///
/// Brightness steps are modes `1..=max_mode`. Unlike thermal appliances the
/// lamp reports a constant, low emergency while suspended.
#[derive(Debug, Clone)]
pub struct DimmerLamp {
    table: ModeTable,
    mode: u32,
    suspended: bool,
}

impl DimmerLamp {
    /// Creates a lamp with the given brightness/consumption table.
    ///
    /// # Panics
    ///
    /// Panics if `initial_mode` is outside `1..=max_mode`.
    pub fn new(table: ModeTable, initial_mode: u32) -> Self {
        assert!(
            initial_mode >= 1 && initial_mode <= table.max_mode(),
            "initial mode out of range"
        );
        Self {
            table,
            mode: initial_mode,
            suspended: false,
        }
    }

    fn reject_if_suspended(&self) -> Result<(), DeviceError> {
        if self.suspended {
            Err(DeviceError::Suspended)
        } else {
            Ok(())
        }
    }
}

impl Adjustable for DimmerLamp {
    fn max_mode(&self) -> Result<u32, DeviceError> {
        Ok(self.table.max_mode())
    }

    fn current_mode(&self) -> Result<u32, DeviceError> {
        self.reject_if_suspended()?;
        Ok(self.mode)
    }

    fn set_mode(&mut self, mode: u32) -> Result<(), DeviceError> {
        self.reject_if_suspended()?;
        self.table.consumption_w(mode)?;
        self.mode = mode;
        Ok(())
    }

    fn up_mode(&mut self) -> Result<(), DeviceError> {
        self.reject_if_suspended()?;
        let max = self.table.max_mode();
        if self.mode >= max {
            return Err(DeviceError::ModeOutOfRange {
                requested: self.mode + 1,
                max,
            });
        }
        self.mode += 1;
        Ok(())
    }

    fn down_mode(&mut self) -> Result<(), DeviceError> {
        self.reject_if_suspended()?;
        if self.mode <= 1 {
            return Err(DeviceError::ModeOutOfRange {
                requested: 0,
                max: self.table.max_mode(),
            });
        }
        self.mode -= 1;
        Ok(())
    }

    fn mode_consumption_w(&self, mode: u32) -> Result<f32, DeviceError> {
        self.table.consumption_w(mode)
    }

    fn is_suspended(&self) -> Result<bool, DeviceError> {
        Ok(self.suspended)
    }

    fn suspend(&mut self) -> Result<(), DeviceError> {
        self.reject_if_suspended()?;
        self.suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DeviceError> {
        if !self.suspended {
            return Err(DeviceError::NotSuspended);
        }
        self.suspended = false;
        Ok(())
    }

    fn emergency(&self) -> Result<f32, DeviceError> {
        if !self.suspended {
            return Err(DeviceError::NotSuspended);
        }
        Ok(LAMP_EMERGENCY)
    }
}
