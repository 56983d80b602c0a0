use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{CoordinatorError, Result};

/// Sizing and liveness thresholds for the slot ring.
///
/// `slot_count` is fixed for the lifetime of a coordinator; evicted slots are
/// reused rather than removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Total number of slots (maximum number of concurrently bound workers)
    pub slot_count: usize,
    /// Heartbeat age after which a slot stops receiving new jobs
    pub soft_timeout_ms: u64,
    /// Heartbeat age after which a slot is evicted and its queue redistributed
    pub hard_timeout_ms: u64,
    /// How often the liveness monitor inspects the ring
    pub monitor_interval_ms: u64,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            slot_count: 12,
            soft_timeout_ms: 5_000,
            hard_timeout_ms: 10_000,
            monitor_interval_ms: 3_000,
        }
    }
}

impl RingConfig {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slot_count,
            ..Default::default()
        }
    }

    pub fn with_timeouts(mut self, soft_timeout_ms: u64, hard_timeout_ms: u64) -> Self {
        self.soft_timeout_ms = soft_timeout_ms;
        self.hard_timeout_ms = hard_timeout_ms;
        self
    }

    pub fn with_monitor_interval(mut self, monitor_interval_ms: u64) -> Self {
        self.monitor_interval_ms = monitor_interval_ms;
        self
    }

    pub fn soft_timeout(&self) -> Duration {
        Duration::from_millis(self.soft_timeout_ms)
    }

    pub fn hard_timeout(&self) -> Duration {
        Duration::from_millis(self.hard_timeout_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    /// Reject configurations the ring cannot operate under.
    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 {
            return Err(CoordinatorError::InvalidConfig(
                "slot_count must be at least 1".to_string(),
            ));
        }
        if u32::try_from(self.slot_count).is_err() {
            return Err(CoordinatorError::InvalidConfig(format!(
                "slot_count {} exceeds u32 range",
                self.slot_count
            )));
        }
        if self.soft_timeout_ms == 0 || self.monitor_interval_ms == 0 {
            return Err(CoordinatorError::InvalidConfig(
                "timeouts and monitor interval must be non-zero".to_string(),
            ));
        }
        if self.soft_timeout_ms >= self.hard_timeout_ms {
            return Err(CoordinatorError::InvalidConfig(format!(
                "soft timeout ({}ms) must be below hard timeout ({}ms)",
                self.soft_timeout_ms, self.hard_timeout_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub listen_addr: SocketAddr,
    pub dashboard_addr: Option<SocketAddr>,
    pub ring: RingConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:8880"
                .parse()
                .expect("default listen address is valid"),
            dashboard_addr: None,
            ring: RingConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn new(listen_addr: SocketAddr, ring: RingConfig) -> Self {
        Self {
            listen_addr,
            ring,
            ..Default::default()
        }
    }

    pub fn with_dashboard(mut self, addr: SocketAddr) -> Self {
        self.dashboard_addr = Some(addr);
        self
    }
}

/// Settings for a worker agent talking to a coordinator.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Coordinator endpoint (e.g. "http://127.0.0.1:8880")
    pub coordinator_addr: String,
    /// Identity this worker registers under; also its placement key
    pub address: String,
    pub heartbeat_interval_ms: u64,
    pub pull_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            coordinator_addr: "http://127.0.0.1:8880".to_string(),
            address: "127.0.0.1:9000".to_string(),
            heartbeat_interval_ms: 2_000,
            pull_interval_ms: 1_000,
        }
    }
}

impl WorkerConfig {
    pub fn new(coordinator_addr: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            coordinator_addr: coordinator_addr.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_intervals(mut self, heartbeat_interval_ms: u64, pull_interval_ms: u64) -> Self {
        self.heartbeat_interval_ms = heartbeat_interval_ms;
        self.pull_interval_ms = pull_interval_ms;
        self
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn pull_interval(&self) -> Duration {
        Duration::from_millis(self.pull_interval_ms)
    }

    /// Reject settings the agent's timers cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(CoordinatorError::InvalidConfig(
                "worker address must not be empty".to_string(),
            ));
        }
        if self.heartbeat_interval_ms == 0 || self.pull_interval_ms == 0 {
            return Err(CoordinatorError::InvalidConfig(
                "heartbeat and pull intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
