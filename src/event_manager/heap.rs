//! Binary-heap event manager.
//!
//! Uses a `BinaryHeap` with reversed `Ord` on the pending entry to act as a
//! min-heap keyed by `(time, key)`. Good general-purpose default:
//! `O(log n)` insertion and extraction, `O(n)` deletion.

use super::lane::{HeapLane, Lane};
use super::{EventManager, Sequencer};
use crate::event::{Event, EventKey};
use crate::time::SimTime;

#[derive(Debug, Default)]
pub struct HeapEventManager {
    lane: HeapLane,
    seq: Sequencer,
}

impl HeapEventManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventManager for HeapEventManager {
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
        "heap"
    }
}
