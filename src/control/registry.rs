//! Dynamic device registry and registration-time adapter resolution.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

use crate::config::ApplianceConfig;
use crate::control::handle::DeviceHandle;
use crate::devices::types::{Adjustable, ModeTable};
use crate::devices::{DimmerLamp, Heater, Oven};

/// Errors surfaced by registration-protocol calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("device id \"{0}\" is already registered")]
    AlreadyRegistered(String),
    #[error("device id \"{0}\" is not registered")]
    NotRegistered(String),
    #[error("no adapter known for descriptor \"{0}\"")]
    UnknownAdapter(String),
}

/// Resolves an adapter descriptor into a capability-compatible device.
///
/// Kept outside the balancer core and injected as a dependency, so the
/// mapping from device-specific control surfaces to the generic adjustable
/// capability set can vary per deployment.
pub trait AdapterResolver: Send {
    fn resolve(
        &self,
        descriptor: &str,
        spec: &ApplianceConfig,
    ) -> Result<Box<dyn Adjustable>, RegistryError>;
}

/// Built-in resolver covering the simulated appliance kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplianceCatalog;

impl AdapterResolver for ApplianceCatalog {
    fn resolve(
        &self,
        descriptor: &str,
        spec: &ApplianceConfig,
    ) -> Result<Box<dyn Adjustable>, RegistryError> {
        let table = ModeTable::new(spec.mode_w.clone());
        let full_urgency = Duration::from_secs_f32(spec.full_urgency_secs.max(0.0));
        match descriptor {
            "heater" => Ok(Box::new(Heater::new(table, spec.initial_mode, full_urgency))),
            "oven" => Ok(Box::new(Oven::new(table, spec.initial_mode, full_urgency))),
            "dimmer_lamp" => Ok(Box::new(DimmerLamp::new(table, spec.initial_mode))),
            other => Err(RegistryError::UnknownAdapter(other.to_string())),
        }
    }
}

/// The shared set of controllable devices.
///
/// A single registry-wide lock makes registration, unregistration, and the
/// balancer's read-rank-act sequence mutually exclusive: a handle can never
/// be torn down in the middle of a balancing pass.
#[derive(Default)]
pub struct DeviceRegistry {
    inner: Mutex<BTreeMap<String, DeviceHandle>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device connection under `id`.
    pub fn register(
        &self,
        id: impl Into<String>,
        device: Box<dyn Adjustable>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        let mut devices = self.inner.lock();
        if devices.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        info!(device = %id, "device registered");
        devices.insert(id.clone(), DeviceHandle::new(id, device));
        Ok(())
    }

    /// Removes the device and tears down its connection (drops the handle).
    pub fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        let mut devices = self.inner.lock();
        match devices.remove(id) {
            Some(_) => {
                info!(device = %id, "device unregistered");
                Ok(())
            }
            None => Err(RegistryError::NotRegistered(id.to_string())),
        }
    }

    pub fn registered(&self, id: &str) -> bool {
        self.inner.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Ids currently registered, in key order (copy-on-read).
    pub fn ids(&self) -> Vec<String> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Locks the registry for a full balancing tick.
    pub fn lock(&self) -> MutexGuard<'_, BTreeMap<String, DeviceHandle>> {
        self.inner.lock()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.ids())
            .finish()
    }
}
