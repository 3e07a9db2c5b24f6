//! Periodic control-loop runtime.
//!
//! The balancer is driven by a single recurring timer task: each tick runs
//! the full read-rank-act body to completion before the next one is
//! scheduled, so device decisions never overlap. The task stops on a
//! shutdown signal, after an optional tick budget, or never.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::control::balancer::EnergyBalancer;

/// Handle over the spawned control loop.
pub struct ControlRuntime {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<EnergyBalancer>,
}

impl ControlRuntime {
    /// Spawns the control loop on the current tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `balancer` - The balancer to drive; returned again on join
    /// * `period` - Effective control period (already acceleration-scaled)
    /// * `max_ticks` - Optional tick budget after which the loop ends
    pub fn spawn(balancer: EnergyBalancer, period: Duration, max_ticks: Option<u64>) -> Self {
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(run_loop(balancer, period, max_ticks, shutdown_rx));
        Self { shutdown, task }
    }

    /// A sender that stops the loop when fired; usable from another task
    /// (e.g. a signal handler) while the runtime itself is being joined.
    pub fn shutdown_trigger(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Signals the loop to stop and waits for it to finish.
    pub async fn shutdown(self) -> Result<EnergyBalancer, JoinError> {
        let _ = self.shutdown.send(());
        self.task.await
    }

    /// Waits for the loop to end on its own (tick budget reached).
    pub async fn join(self) -> Result<EnergyBalancer, JoinError> {
        self.task.await
    }
}

async fn run_loop(
    mut balancer: EnergyBalancer,
    period: Duration,
    max_ticks: Option<u64>,
    mut shutdown: broadcast::Receiver<()>,
) -> EnergyBalancer {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks_run: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("control loop shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                match balancer.tick() {
                    Ok(report) => info!(%report, "balance tick"),
                    // A failed tick is contained; the next tick re-evaluates.
                    Err(err) => error!(error = %err, "balance tick aborted"),
                }
                ticks_run += 1;
                if let Some(limit) = max_ticks {
                    if ticks_run >= limit {
                        debug!(ticks = ticks_run, "tick budget reached");
                        break;
                    }
                }
            }
        }
    }
    balancer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::balancer::BalancerConfig;
    use crate::control::registry::{ApplianceCatalog, DeviceRegistry};
    use crate::devices::types::{DeviceError, Signal};
    use crate::devices::{Meter, SimBattery, SimGenerator};
    use std::sync::Arc;

    struct IdleMeter;

    impl Meter for IdleMeter {
        fn current_production(&mut self) -> Result<Signal, DeviceError> {
            Ok(Signal::watts(100.0))
        }
        fn current_consumption(&mut self) -> Result<Signal, DeviceError> {
            Ok(Signal::watts(100.0))
        }
        fn tension(&self) -> Result<Signal, DeviceError> {
            Ok(Signal::volts(230.0))
        }
    }

    fn balancer() -> EnergyBalancer {
        EnergyBalancer::new(
            BalancerConfig::default(),
            Arc::new(DeviceRegistry::new()),
            Box::new(ApplianceCatalog),
            Box::new(IdleMeter),
            Box::new(SimBattery::new()),
            Box::new(SimGenerator::new(2300.0, 230.0)),
        )
    }

    #[tokio::test]
    async fn loop_stops_at_tick_budget() {
        let runtime = ControlRuntime::spawn(balancer(), Duration::from_millis(1), Some(5));
        let finished = runtime.join().await.expect("loop task should not panic");
        assert_eq!(finished.ticks(), 5);
    }

    #[tokio::test]
    async fn shutdown_interrupts_open_ended_loop() {
        let runtime = ControlRuntime::spawn(balancer(), Duration::from_millis(5), None);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let finished = runtime.shutdown().await.expect("loop task should not panic");
        assert!(finished.ticks() >= 1);
    }
}
