//! Sorted-vector event managers.
//!
//! The vector is kept latest-first so extraction is a `Vec::pop`.
//! [`SortedVecEventManager`] binary-searches every insertion into place;
//! [`BatchSortedVecEventManager`] parks insertions in an unsorted staging
//! buffer and merges them the next time the earliest event is needed, which
//! pays off when many events are scheduled between two extractions.

use super::lane::{Lane, SortedLane};
use super::{EventManager, Pending, Sequencer};
use crate::event::{Event, EventKey};
use crate::time::SimTime;

/// Staging batches up to this size are inserted one by one instead of
/// triggering a full re-sort.
const SMALL_BATCH: usize = 8;

// ── SortedVecEventManager ─────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SortedVecEventManager {
    lane: SortedLane,
    seq: Sequencer,
}

impl SortedVecEventManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventManager for SortedVecEventManager {
    fn add(&mut self, event: Box<dyn Event>) -> EventKey {
        let entry = self.seq.wrap(event);
        let key = entry.key;
        self.lane.push(entry);
        key
    }

    fn delete(&mut self, key: EventKey) -> Option<Box<dyn Event>> {
        self.lane.remove(key).map(|p| p.event)
    }

    fn poll_earliest(&mut self) -> Option<Box<dyn Event>> {
        self.lane.pop().map(|p| p.event)
    }

    fn peek_time(&self) -> Option<SimTime> {
        self.lane.peek().map(|p| p.time)
    }

    fn all_pending(&self) -> Vec<&dyn Event> {
        let mut out = Vec::with_capacity(self.lane.len());
        self.lane.collect_events(&mut out);
        out
    }

    fn count(&self) -> usize {
        self.lane.len()
    }

    fn clear(&mut self) {
        self.lane.clear();
    }

    fn name(&self) -> &'static str {
        "sorted-vec"
    }
}

// ── BatchSortedVecEventManager ────────────────────────────────────────

#[derive(Debug, Default)]
pub struct BatchSortedVecEventManager {
    sorted: SortedLane,
    staging: Vec<Pending>,
    seq: Sequencer,
}

impl BatchSortedVecEventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of insertions not yet merged into the sorted vector.
    pub fn staged(&self) -> usize {
        self.staging.len()
    }

    fn merge(&mut self) {
        if self.staging.len() <= SMALL_BATCH {
            for entry in self.staging.drain(..) {
                self.sorted.push(entry);
            }
        } else {
            self.sorted.extend_and_sort(&mut self.staging);
        }
    }
}

impl EventManager for BatchSortedVecEventManager {
    fn add(&mut self, event: Box<dyn Event>) -> EventKey {
        let entry = self.seq.wrap(event);
        let key = entry.key;
        self.staging.push(entry);
        key
    }

    fn delete(&mut self, key: EventKey) -> Option<Box<dyn Event>> {
        if let Some(idx) = self.staging.iter().position(|p| p.key == key) {
            return Some(self.staging.swap_remove(idx).event);
        }
        self.sorted.remove(key).map(|p| p.event)
    }

    fn poll_earliest(&mut self) -> Option<Box<dyn Event>> {
        self.merge();
        self.sorted.pop().map(|p| p.event)
    }

    fn peek_time(&self) -> Option<SimTime> {
        let staged = self.staging.iter().map(|p| p.time).min();
        let sorted = self.sorted.peek().map(|p| p.time);
        match (staged, sorted) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn all_pending(&self) -> Vec<&dyn Event> {
        let mut out = Vec::with_capacity(self.count());
        self.sorted.collect_events(&mut out);
        out.extend(self.staging.iter().map(|p| p.event.as_ref()));
        out
    }

    fn count(&self) -> usize {
        self.sorted.len() + self.staging.len()
    }

    fn clear(&mut self) {
        self.sorted.clear();
        self.staging.clear();
    }

    fn name(&self) -> &'static str {
        "batch-sorted-vec"
    }
}
