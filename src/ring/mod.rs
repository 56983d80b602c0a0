//! The fixed-capacity slot ring.
//!
//! The ring is a plain open-addressing table of `N` slots. Workers are placed
//! by hashing their address and probing forward for an empty slot; jobs are
//! routed by hashing their filename and probing forward for an eligible one.
//! The ring itself is not synchronised: callers hold one exclusive lock around
//! it for the whole of each operation (see [`crate::coordinator`]).
//!
//! # Components
//!
//! - [`hash`]: FNV-1a placement shared by workers and jobs
//! - [`slot`]: per-slot binding, queue and liveness state
//! - [`rebalance`]: eviction and neighbour redistribution

pub mod hash;
pub mod rebalance;
pub mod slot;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RingConfig;
use crate::error::{CoordinatorError, Result};

pub use hash::placement;
pub use rebalance::{Eviction, RedistributionLoss, Side};
pub use slot::{Job, Slot};

/// Scan direction for [`SlotRing::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Result of one liveness pass over the ring.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Slots that stopped receiving new jobs during this pass
    pub degraded: Vec<usize>,
    pub evictions: Vec<Eviction>,
}

impl TickReport {
    pub fn lost_jobs(&self) -> usize {
        self.evictions.iter().map(Eviction::lost_jobs).sum()
    }

    pub fn is_quiet(&self) -> bool {
        self.degraded.is_empty() && self.evictions.is_empty()
    }
}

/// Point-in-time view of a slot, for status surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub index: usize,
    pub address: Option<String>,
    pub eligible: bool,
    pub queued_jobs: usize,
    pub heartbeat_age_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SlotRing {
    slots: Vec<Slot>,
    soft_timeout: Duration,
    hard_timeout: Duration,
}

impl SlotRing {
    pub fn new(config: RingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            slots: vec![Slot::default(); config.slot_count],
            soft_timeout: config.soft_timeout(),
            hard_timeout: config.hard_timeout(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_bound()).count()
    }

    /// Visit up to `limit` slots starting at `start`, wrapping in `direction`,
    /// and return the first index `accept` approves.
    pub fn probe<F>(&self, start: usize, direction: Direction, limit: usize, accept: F) -> Option<usize>
    where
        F: Fn(usize, &Slot) -> bool,
    {
        let n = self.len();
        (0..limit.min(n))
            .map(|step| match direction {
                Direction::Forward => (start + step) % n,
                Direction::Backward => (start + n - step % n) % n,
            })
            .find(|&index| accept(index, &self.slots[index]))
    }

    /// Bind `address` to the first empty slot at or after its hash position.
    ///
    /// Addresses are not deduplicated: registering an address that is already
    /// bound claims a second slot. The earlier slot keeps its queue until it
    /// ages out and is evicted, at which point its jobs are redistributed like
    /// any other eviction. [`pull_jobs`](Self::pull_jobs) only drains the first
    /// match found from the address's hash position.
    pub fn register(&mut self, address: &str, now: DateTime<Utc>) -> Result<u32> {
        if address.is_empty() {
            return Err(CoordinatorError::InvalidAddress);
        }

        let start = placement(address, self.len());
        let index = self
            .probe(start, Direction::Forward, self.len(), |_, slot| !slot.is_bound())
            .ok_or(CoordinatorError::NoCapacity)?;

        self.slots[index].bind(address.to_string(), now);
        tracing::info!(slot = index, address, home = start, "Worker registered");
        Ok(index as u32)
    }

    /// Refresh a bound slot's heartbeat and make it eligible again.
    pub fn heartbeat(&mut self, slot: u32, now: DateTime<Utc>) -> Result<()> {
        self.heartbeat_as(slot, None, now)
    }

    /// Like [`heartbeat`](Self::heartbeat), but when `address` is given the
    /// slot must still be bound to it. A worker whose slot was evicted and
    /// rebound to someone else gets `UnknownSlot` and leaves the new owner's
    /// liveness untouched.
    pub fn heartbeat_as(
        &mut self,
        slot: u32,
        address: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let binding = self
            .slots
            .get_mut(slot as usize)
            .and_then(|s| s.binding.as_mut())
            .ok_or(CoordinatorError::UnknownSlot(slot))?;

        if let Some(address) = address {
            if binding.address != address {
                tracing::debug!(
                    slot,
                    address,
                    owner = %binding.address,
                    "Heartbeat from former owner rejected"
                );
                return Err(CoordinatorError::UnknownSlot(slot));
            }
        }

        if !binding.eligible {
            tracing::info!(slot, address = %binding.address, "Worker eligible again");
        }
        binding.last_heartbeat = now;
        binding.eligible = true;
        Ok(())
    }

    /// Append a job to the first eligible slot at or after its hash position.
    pub fn submit_job(&mut self, filename: &str) -> Result<u32> {
        let start = placement(filename, self.len());
        let index = self
            .probe(start, Direction::Forward, self.len(), |_, slot| slot.is_eligible())
            .ok_or(CoordinatorError::NoEligibleSlot)?;

        if let Some(binding) = self.slots[index].binding.as_mut() {
            binding.jobs.push(Job::new(filename));
        }
        tracing::debug!(slot = index, filename, home = start, "Job routed");
        Ok(index as u32)
    }

    /// Slot currently bound to `address`, if any.
    pub fn slot_of(&self, address: &str) -> Option<usize> {
        if address.is_empty() {
            return None;
        }
        let start = placement(address, self.len());
        self.probe(start, Direction::Forward, self.len(), |_, slot| {
            slot.address() == Some(address)
        })
    }

    /// Take every job queued for `address`. Unknown addresses get nothing.
    pub fn pull_jobs(&mut self, address: &str) -> Vec<Job> {
        let Some(index) = self.slot_of(address) else {
            return Vec::new();
        };
        self.slots[index]
            .binding
            .as_mut()
            .map(|b| std::mem::take(&mut b.jobs))
            .unwrap_or_default()
    }

    /// Apply the two-tier liveness policy to every bound slot, in index order.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        for index in 0..self.len() {
            let Some(age) = self.slots[index].heartbeat_age(now) else {
                continue;
            };

            if age >= self.hard_timeout {
                if let Some(eviction) = self.evict(index) {
                    report.evictions.push(eviction);
                }
            } else if age >= self.soft_timeout {
                if let Some(binding) = self.slots[index].binding.as_mut() {
                    if binding.eligible {
                        binding.eligible = false;
                        report.degraded.push(index);
                    }
                }
            }
        }

        report
    }

    pub fn status(&self, now: DateTime<Utc>) -> Vec<SlotStatus> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| SlotStatus {
                index,
                address: slot.address().map(str::to_string),
                eligible: slot.is_eligible(),
                queued_jobs: slot.jobs().len(),
                heartbeat_age_ms: slot.heartbeat_age(now).map(|d| d.as_millis() as u64),
            })
            .collect()
    }
}

#[cfg(test)]
impl SlotRing {
    pub(crate) fn bind_at(&mut self, index: usize, address: String, now: DateTime<Utc>) {
        self.slots[index].bind(address, now);
    }

    pub(crate) fn set_eligible(&mut self, index: usize, eligible: bool) {
        if let Some(b) = self.slots[index].binding.as_mut() {
            b.eligible = eligible;
        }
    }

    pub(crate) fn push_job(&mut self, index: usize, job: Job) {
        if let Some(b) = self.slots[index].binding.as_mut() {
            b.jobs.push(job);
        }
    }
}
