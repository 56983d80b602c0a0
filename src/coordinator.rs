//! Shared handle over the slot ring.
//!
//! Every remote call and every monitor pass goes through one
//! `tokio::sync::Mutex<SlotRing>`. Each operation takes the guard, runs a
//! bounded O(N) ring operation and drops the guard on return, including on
//! error paths. Nothing awaits while the guard is held.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::config::RingConfig;
use crate::error::Result;
use crate::ring::{Job, SlotRing, SlotStatus, TickReport};

/// Ring status plus coordinator-wide counters.
#[derive(Debug, Clone, Serialize)]
pub struct RingSnapshot {
    pub slots: Vec<SlotStatus>,
    pub lost_jobs: u64,
}

#[derive(Clone)]
pub struct Coordinator {
    ring: Arc<Mutex<SlotRing>>,
    clock: Arc<dyn Clock>,
    lost_jobs: Arc<AtomicU64>,
    config: RingConfig,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("lost_jobs", &self.lost_jobs.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(config: RingConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RingConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let ring = SlotRing::new(config.clone())?;
        Ok(Self {
            ring: Arc::new(Mutex::new(ring)),
            clock,
            lost_jobs: Arc::new(AtomicU64::new(0)),
            config,
        })
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub async fn register(&self, address: &str) -> Result<u32> {
        let now = self.clock.now();
        self.ring.lock().await.register(address, now)
    }

    pub async fn heartbeat(&self, slot: u32) -> Result<()> {
        let now = self.clock.now();
        self.ring.lock().await.heartbeat(slot, now)
    }

    /// Heartbeat that also checks `slot` is still bound to `address`.
    pub async fn heartbeat_as(&self, slot: u32, address: &str) -> Result<()> {
        let now = self.clock.now();
        self.ring.lock().await.heartbeat_as(slot, Some(address), now)
    }

    pub async fn submit_job(&self, filename: &str) -> Result<u32> {
        self.ring.lock().await.submit_job(filename)
    }

    pub async fn pull_jobs(&self, address: &str) -> Vec<Job> {
        self.ring.lock().await.pull_jobs(address)
    }

    /// Run one liveness pass and fold its losses into the lost-job counter.
    pub async fn tick(&self) -> TickReport {
        let now = self.clock.now();
        let report = self.ring.lock().await.tick(now);
        let lost = report.lost_jobs() as u64;
        if lost > 0 {
            self.lost_jobs.fetch_add(lost, Ordering::Relaxed);
        }
        report
    }

    /// Total jobs dropped by evictions that found no eligible neighbour.
    pub fn lost_jobs(&self) -> u64 {
        self.lost_jobs.load(Ordering::Relaxed)
    }

    pub async fn snapshot(&self) -> RingSnapshot {
        let now = self.clock.now();
        let slots = self.ring.lock().await.status(now);
        RingSnapshot {
            slots,
            lost_jobs: self.lost_jobs(),
        }
    }

    /// Read-only access to the ring under the shared lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&SlotRing) -> R) -> R {
        f(&*self.ring.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CoordinatorError;

    #[tokio::test]
    async fn operations_share_one_ring() {
        let coordinator = Coordinator::new(RingConfig::new(4)).unwrap();
        let slot = coordinator.register("w0").await.unwrap();
        coordinator.heartbeat(slot).await.unwrap();

        let landed = coordinator.submit_job("a.txt").await.unwrap();
        assert_eq!(landed, slot);
        assert_eq!(coordinator.pull_jobs("w0").await, vec![Job::new("a.txt")]);
        assert!(coordinator.pull_jobs("w0").await.is_empty());
    }

    #[tokio::test]
    async fn error_paths_release_the_lock() {
        let coordinator = Coordinator::new(RingConfig::new(1)).unwrap();
        assert!(matches!(
            coordinator.submit_job("a.txt").await,
            Err(CoordinatorError::NoEligibleSlot)
        ));
        assert!(coordinator.heartbeat(0).await.is_err());
        coordinator.register("w0").await.unwrap();
        assert!(matches!(
            coordinator.register("w1").await,
            Err(CoordinatorError::NoCapacity)
        ));
        // Still usable after every failure above.
        assert_eq!(coordinator.submit_job("a.txt").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tick_counts_lost_jobs() {
        let clock = Arc::new(ManualClock::default());
        let coordinator = Coordinator::with_clock(RingConfig::new(1), clock.clone()).unwrap();
        coordinator.register("w0").await.unwrap();
        coordinator.submit_job("a.txt").await.unwrap();
        coordinator.submit_job("b.txt").await.unwrap();

        clock.advance(Duration::from_secs(11));
        let report = coordinator.tick().await;
        assert_eq!(report.lost_jobs(), 2);
        assert_eq!(coordinator.lost_jobs(), 2);

        let snapshot = coordinator.snapshot().await;
        assert_eq!(snapshot.lost_jobs, 2);
        assert!(snapshot.slots[0].address.is_none());
    }
}
