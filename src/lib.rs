//! Home energy-management control-loop simulator.

pub mod config;
/// Registry, ranking, balancer, and the periodic loop runtime.
pub mod control;
pub mod devices;
pub mod telemetry;
