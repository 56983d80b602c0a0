//! Background liveness monitor.
//!
//! Ticks on a fixed interval, independent of remote calls, and applies the
//! ring's two-tier policy: slots silent past the soft timeout stop receiving
//! new jobs, slots silent past the hard timeout are evicted and their queues
//! split between the nearest eligible neighbours. Eviction never waits on the
//! worker.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::coordinator::Coordinator;
use crate::ring::TickReport;

pub struct LivenessMonitor {
    coordinator: Coordinator,
    interval: Duration,
}

impl LivenessMonitor {
    pub fn new(coordinator: Coordinator) -> Self {
        let interval = coordinator.config().monitor_interval();
        Self {
            coordinator,
            interval,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Tick until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; a fresh ring has nothing to inspect.
        interval.tick().await;

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Liveness monitor started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Liveness monitor stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One pass over the ring. Losses are reported, never propagated.
    pub async fn tick(&self) -> TickReport {
        let report = self.coordinator.tick().await;
        report_tick(&report);
        report
    }
}

fn report_tick(report: &TickReport) {
    for slot in &report.degraded {
        tracing::warn!(slot, "Heartbeat overdue, slot no longer receives jobs");
    }

    for eviction in &report.evictions {
        tracing::warn!(
            slot = eviction.slot,
            address = %eviction.address,
            moved = eviction.moved_jobs(),
            left = ?eviction.left,
            right = ?eviction.right,
            "Worker evicted"
        );

        for loss in &eviction.losses {
            let files: Vec<&str> = loss.jobs.iter().map(|j| j.filename.as_str()).collect();
            tracing::error!(
                slot = eviction.slot,
                side = %loss.side,
                lost = loss.jobs.len(),
                files = ?files,
                "Partial redistribution loss: no eligible neighbour"
            );
        }
    }
}
