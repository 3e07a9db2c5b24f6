//! Device models: the adjustable-appliance capability set, simulated
//! appliances, and the external collaborators (meter, storage, generator).

/// Storage-bank control surface and simulated battery.
pub mod battery;
/// Dimmable lamp model.
pub mod dimmer_lamp;
/// Backup generator control surface and simulated generator.
pub mod generator;
/// Electric heater model.
pub mod heater;
/// Household meter trait and simulated profile meter.
pub mod meter;
/// Oven model with a bounded heat-program state machine.
pub mod oven;
pub mod types;

// Re-export the main types for convenience
pub use battery::{SimBattery, StorageBank};
pub use dimmer_lamp::DimmerLamp;
pub use generator::{BackupGenerator, GeneratorState, SimGenerator};
pub use heater::Heater;
pub use meter::{Meter, SimMeter};
pub use oven::Oven;
pub use types::{Adjustable, DeviceError, ModeTable, Signal, Unit, UnsupportedUnit};
