//! Storage-bank collaborator: the balancer's sink for excess production.

use crate::devices::types::DeviceError;

/// Control surface of the household storage bank.
///
/// The balancer only drives the charging relay; capacity accounting lives
/// inside the device.
pub trait StorageBank: Send {
    fn start_charging(&mut self) -> Result<(), DeviceError>;

    fn stop_charging(&mut self) -> Result<(), DeviceError>;

    fn is_charging(&self) -> Result<bool, DeviceError>;
}

/// A simulated storage bank tracking only its charging relay.
#[derive(Debug, Clone, Default)]
pub struct SimBattery {
    charging: bool,
}

impl SimBattery {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBank for SimBattery {
    fn start_charging(&mut self) -> Result<(), DeviceError> {
        if self.charging {
            return Err(DeviceError::Rejected("already charging"));
        }
        self.charging = true;
        Ok(())
    }

    fn stop_charging(&mut self) -> Result<(), DeviceError> {
        if !self.charging {
            return Err(DeviceError::Rejected("not charging"));
        }
        self.charging = false;
        Ok(())
    }

    fn is_charging(&self) -> Result<bool, DeviceError> {
        Ok(self.charging)
    }
}
