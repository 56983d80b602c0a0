//! Eviction of silent workers and redistribution of their backlog.

use serde::Serialize;

use super::slot::Job;
use super::{Direction, SlotRing};

/// Which half of an evicted queue a report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Jobs that could not be placed because one side had no eligible neighbour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedistributionLoss {
    pub side: Side,
    pub jobs: Vec<Job>,
}

/// Outcome of evicting one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eviction {
    pub slot: usize,
    pub address: String,
    /// Receiving neighbour and job count for each side that had one.
    pub left: Option<(usize, usize)>,
    pub right: Option<(usize, usize)>,
    pub losses: Vec<RedistributionLoss>,
}

impl Eviction {
    pub fn lost_jobs(&self) -> usize {
        self.losses.iter().map(|l| l.jobs.len()).sum()
    }

    pub fn moved_jobs(&self) -> usize {
        self.left.map_or(0, |(_, n)| n) + self.right.map_or(0, |(_, n)| n)
    }
}

impl SlotRing {
    /// Nearest eligible slot strictly before (`Backward`) or after (`Forward`)
    /// `index`, never `index` itself.
    pub fn eligible_neighbour(&self, index: usize, direction: Direction) -> Option<usize> {
        let n = self.len();
        let start = match direction {
            Direction::Forward => (index + 1) % n,
            Direction::Backward => (index + n - 1) % n,
        };
        self.probe(start, direction, n - 1, |_, slot| slot.is_eligible())
    }

    /// Clear `index` and split its queue between the nearest eligible
    /// neighbours: the first half (rounded down) to the left, the rest to the
    /// right. Returns `None` if the slot was not bound.
    pub fn evict(&mut self, index: usize) -> Option<Eviction> {
        let binding = self.slots.get_mut(index)?.clear()?;

        let mut eviction = Eviction {
            slot: index,
            address: binding.address,
            left: None,
            right: None,
            losses: Vec::new(),
        };

        let mut jobs = binding.jobs;
        if jobs.is_empty() {
            return Some(eviction);
        }

        let right_half = jobs.split_off(jobs.len() / 2);
        let left_half = jobs;

        for (side, half) in [(Side::Left, left_half), (Side::Right, right_half)] {
            if half.is_empty() {
                continue;
            }
            let direction = match side {
                Side::Left => Direction::Backward,
                Side::Right => Direction::Forward,
            };
            match self.eligible_neighbour(index, direction) {
                Some(target) => {
                    let count = half.len();
                    if let Some(b) = self.slots[target].binding.as_mut() {
                        b.jobs.extend(half);
                    }
                    match side {
                        Side::Left => eviction.left = Some((target, count)),
                        Side::Right => eviction.right = Some((target, count)),
                    }
                }
                None => eviction.losses.push(RedistributionLoss { side, jobs: half }),
            }
        }

        Some(eviction)
    }
}
