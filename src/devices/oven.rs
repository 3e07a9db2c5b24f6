//! Kitchen oven with a bounded heat-program state machine.

use std::time::{Duration, Instant};

use crate::devices::types::{Adjustable, DeviceError, ModeTable};

/// A simulated oven.
///
/// Modes map to heat programs of increasing draw (keep-warm, bake, broil).
/// The top program refuses suspension: interrupting a broil mid-way ruins
/// the dish, so the oven rejects `suspend()` until stepped down first. A
/// suspended oven's urgency ramps quickly since food safety degrades fast.
#[derive(Debug, Clone)]
pub struct Oven {
    table: ModeTable,
    mode: u32,
    suspended_since: Option<Instant>,
    full_urgency: Duration,
}

impl Oven {
    /// Creates an oven with the given program table and initial program.
    ///
    /// # Panics
    ///
    /// Panics if `initial_mode` is outside `1..=max_mode`.
    pub fn new(table: ModeTable, initial_mode: u32, full_urgency: Duration) -> Self {
        assert!(
            initial_mode >= 1 && initial_mode <= table.max_mode(),
            "initial mode out of range"
        );
        Self {
            table,
            mode: initial_mode,
            suspended_since: None,
            full_urgency,
        }
    }

    fn reject_if_suspended(&self) -> Result<(), DeviceError> {
        if self.suspended_since.is_some() {
            Err(DeviceError::Suspended)
        } else {
            Ok(())
        }
    }
}

impl Adjustable for Oven {
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
        Ok(self.suspended_since.is_some())
    }

    fn suspend(&mut self) -> Result<(), DeviceError> {
        self.reject_if_suspended()?;
        if self.mode == self.table.max_mode() {
            return Err(DeviceError::Rejected("top heat program in progress"));
        }
        self.suspended_since = Some(Instant::now());
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DeviceError> {
        if self.suspended_since.is_none() {
            return Err(DeviceError::NotSuspended);
        }
        self.suspended_since = None;
        Ok(())
    }

    fn emergency(&self) -> Result<f32, DeviceError> {
        let Some(since) = self.suspended_since else {
            return Err(DeviceError::NotSuspended);
        };
        if self.full_urgency.is_zero() {
            return Ok(1.0);
        }
        let ratio = since.elapsed().as_secs_f32() / self.full_urgency.as_secs_f32();
        Ok(ratio.clamp(0.0, 1.0))
    }
}
