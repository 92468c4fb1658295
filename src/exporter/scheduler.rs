use super::{health::HealthBoard, stats::CycleStats};
use crate::sampler::{CycleError, CycleReport, Instance, Sampler};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span};
use tracing_futures::Instrument as _;

/// Runs every instance on its own timer.
#[derive(Clone)]
pub struct Scheduler {
    sampler: Sampler,
    stats: CycleStats,
    health: HealthBoard,
}

impl Scheduler {
    #[must_use]
    pub const fn new(sampler: Sampler, stats: CycleStats, health: HealthBoard) -> Self {
        Self {
            sampler,
            stats,
            health,
        }
    }

    /// Spawn one task per instance. Tasks stop at the next cycle boundary
    /// once `shutdown` flips to `true` and close their connection.
    #[must_use]
    pub fn spawn(
        &self,
        instances: Vec<Instance>,
        default_interval: Duration,
        shutdown: &watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        instances
            .into_iter()
            .map(|instance| {
                let period = instance.interval().unwrap_or(default_interval);
                let span = info_span!("instance", instance = %instance.name());
                let scheduler = self.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(scheduler.run_instance(instance, period, shutdown).instrument(span))
            })
            .collect()
    }

    async fn run_instance(
        self,
        mut instance: Instance,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(interval_secs = period.as_secs(), "sampling started");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    // errors are logged by the cycle span
                    let _ = self.run_once(&mut instance).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        instance.close().await;
        debug!("sampling stopped");
    }

    /// Run a single cycle and record its outcome in the self-monitoring
    /// metrics and the health board.
    ///
    /// # Errors
    ///
    /// Returns the cycle's error, already recorded.
    pub async fn run_once(&self, instance: &mut Instance) -> Result<CycleReport, CycleError> {
        let timer = self.stats.start_cycle(instance.name());
        let outcome = self.sampler.run_cycle(instance).await;
        timer.finish(&outcome);
        self.health
            .update(instance.name(), instance.is_connected(), &outcome);
        outcome
    }
}
