//! Heap with a same-time fast lane.
//!
//! Models frequently schedule follow-ups at the *current* time (zero-delay
//! hand-offs between stations). Those go into a FIFO that costs `O(1)` per
//! insertion and extraction; everything else goes to the binary heap.
//! Extraction compares the two fronts.

use std::collections::VecDeque;

use super::lane::{HeapLane, Lane};
use super::{EventManager, Pending, Sequencer};
use crate::event::{Event, EventKey};
use crate::time::SimTime;

#[derive(Debug, Default)]
pub struct MultiHeapEventManager {
    /// Events at `last_polled`, in key order.
    now_lane: VecDeque<Pending>,
    heap: HeapLane,
    seq: Sequencer,
    last_polled: Option<SimTime>,
}

impl MultiHeapEventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events currently held in the same-time lane.
    pub fn fast_lane_len(&self) -> usize {
        self.now_lane.len()
    }

    fn front_is_fast_lane(&self) -> bool {
        match (self.now_lane.front(), self.heap.peek()) {
            (Some(f), Some(h)) => f.order_key() < h.order_key(),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl EventManager for MultiHeapEventManager {
    fn add(&mut self, event: Box<dyn Event>) -> EventKey {
        let entry = self.seq.wrap(event);
        let key = entry.key;
        let fast = self.last_polled == Some(entry.time)
            && self.now_lane.back().map_or(true, |b| b.time == entry.time);
        if fast {
            self.now_lane.push_back(entry);
        } else {
            self.heap.push(entry);
        }
        key
    }

    fn delete(&mut self, key: EventKey) -> Option<Box<dyn Event>> {
        if let Some(idx) = self.now_lane.iter().position(|p| p.key == key) {
            return self.now_lane.remove(idx).map(|p| p.event);
        }
        self.heap.remove(key).map(|p| p.event)
    }

    fn poll_earliest(&mut self) -> Option<Box<dyn Event>> {
        let entry = if self.front_is_fast_lane() {
            self.now_lane.pop_front()
        } else {
            self.heap.pop()
        }?;
        self.last_polled = Some(entry.time);
        Some(entry.event)
    }

    fn peek_time(&self) -> Option<SimTime> {
        if self.front_is_fast_lane() {
            self.now_lane.front().map(|p| p.time)
        } else {
            self.heap.peek().map(|p| p.time)
        }
    }

    fn all_pending(&self) -> Vec<&dyn Event> {
        let mut out = Vec::with_capacity(self.count());
        out.extend(self.now_lane.iter().map(|p| p.event.as_ref()));
        self.heap.collect_events(&mut out);
        out
    }

    fn count(&self) -> usize {
        self.now_lane.len() + self.heap.len()
    }

    fn clear(&mut self) {
        self.now_lane.clear();
        self.heap.clear();
        self.last_polled = None;
    }

    fn name(&self) -> &'static str {
        "multi-heap"
    }
}
