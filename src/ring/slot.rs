use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of work. The coordinator only routes the reference, never the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    pub filename: String,
}

impl Job {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

/// State held only while a worker owns a slot.
///
/// Keeping the queue inside the binding means an unbound slot cannot carry
/// jobs or an eligibility flag.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) address: String,
    pub(crate) jobs: Vec<Job>,
    pub(crate) last_heartbeat: DateTime<Utc>,
    pub(crate) eligible: bool,
}

/// One position in the ring.
#[derive(Debug, Clone, Default)]
pub struct Slot {
    pub(crate) binding: Option<Binding>,
}

impl Slot {
    pub(crate) fn bind(&mut self, address: String, now: DateTime<Utc>) {
        self.binding = Some(Binding {
            address,
            jobs: Vec::new(),
            last_heartbeat: now,
            eligible: true,
        });
    }

    /// Unbind the slot, handing back whatever it held.
    pub(crate) fn clear(&mut self) -> Option<Binding> {
        self.binding.take()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn is_eligible(&self) -> bool {
        self.binding.as_ref().is_some_and(|b| b.eligible)
    }

    pub fn address(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.address.as_str())
    }

    pub fn jobs(&self) -> &[Job] {
        self.binding.as_ref().map(|b| b.jobs.as_slice()).unwrap_or(&[])
    }

    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        self.binding.as_ref().map(|b| b.last_heartbeat)
    }

    /// Time since the last heartbeat. A timestamp ahead of `now` counts as fresh.
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_heartbeat()
            .map(|hb| (now - hb).to_std().unwrap_or(Duration::ZERO))
    }
}
