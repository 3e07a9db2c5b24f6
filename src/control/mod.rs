//! The energy-management control core: device registry, ranking, and the
//! periodic balancing loop.

/// The per-tick decision procedure.
pub mod balancer;
/// Registered-device wrapper with neutral-value failure handling.
pub mod handle;
/// Pure ranking and eligibility functions.
pub mod ranking;
/// Device registry and adapter resolution.
pub mod registry;
/// Periodic loop runtime.
pub mod runtime;
/// Adaptive resume-threshold estimator.
pub mod threshold;
pub mod types;

// Re-export the main types for convenience
pub use balancer::{BalancerConfig, EnergyBalancer};
pub use handle::DeviceHandle;
pub use registry::{AdapterResolver, ApplianceCatalog, DeviceRegistry, RegistryError};
pub use runtime::ControlRuntime;
pub use types::{BalanceError, BranchTaken, EnergyState, TickReport};
