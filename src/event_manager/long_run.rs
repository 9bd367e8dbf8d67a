//! Time-bucketed event managers for long runs.
//!
//! Pending events are spread over `n` lanes by time: lane `i` covers
//! `[base + i*width, base + (i+1)*width)`, lane 0 additionally takes
//! everything before `base` and the last lane is an unbounded overflow.
//! Each lane stays small, so insertions and extractions touch only a
//! fraction of the pending set.
//!
//! When every bounded lane has drained and only the overflow holds events,
//! the buckets are re-based onto the overflow's time span and its events
//! redistributed.

use std::collections::HashMap;

use tracing::trace;

use super::lane::{HeapLane, Lane, SortedLane};
use super::{EventManager, Sequencer};
use crate::event::{Event, EventKey};
use crate::time::SimTime;

/// Default number of lanes, overflow included.
pub const DEFAULT_LANES: usize = 8;

/// Initial width of each bounded lane, in milliseconds.
pub const DEFAULT_BUCKET_WIDTH: u64 = 1_000;

// ── Shared bucketing ─────────────────────────────────────────────────

#[derive(Debug)]
struct Buckets<L: Lane> {
    lanes: Vec<L>,
    base: u64,
    width: u64,
    /// key → time, to locate the lane of a pending key.
    index: HashMap<EventKey, SimTime>,
    seq: Sequencer,
    rebases: u64,
}

impl<L: Lane> Buckets<L> {
    fn new(lanes: usize, width: u64) -> Self {
        let lanes = lanes.max(2);
        Buckets {
            lanes: (0..lanes).map(|_| L::default()).collect(),
            base: 0,
            width: width.max(1),
            index: HashMap::new(),
            seq: Sequencer::default(),
            rebases: 0,
        }
    }

    #[inline]
    fn overflow(&self) -> usize {
        self.lanes.len() - 1
    }

    fn lane_of(&self, time: SimTime) -> usize {
        let t = time.millis();
        if t < self.base {
            return 0;
        }
        let bucket = (t - self.base) / self.width;
        // Bounded by the overflow index, so the cast cannot truncate.
        bucket.min(self.overflow() as u64) as usize
    }

    fn add(&mut self, event: Box<dyn Event>) -> EventKey {
        let entry = self.seq.wrap(event);
        let key = entry.key;
        self.index.insert(key, entry.time);
        let lane = self.lane_of(entry.time);
        self.lanes[lane].push(entry);
        key
    }

    fn delete(&mut self, key: EventKey) -> Option<Box<dyn Event>> {
        let time = self.index.remove(&key)?;
        let lane = self.lane_of(time);
        self.lanes[lane].remove(key).map(|p| p.event)
    }

    /// Re-base the bounded lanes onto the overflow's time span.
    fn rebase(&mut self) {
        let overflow = self.overflow();
        let entries = self.lanes[overflow].take_all();
        let (Some(min), Some(max)) = (
            entries.iter().map(|p| p.time.millis()).min(),
            entries.iter().map(|p| p.time.millis()).max(),
        ) else {
            return;
        };
        self.base = min;
        // Guarantees (max - min) / width < overflow: no entry lands back
        // in the overflow lane.
        self.width = (max - min) / overflow as u64 + 1;
        self.rebases += 1;
        trace!(base = self.base, width = self.width, moved = entries.len(), "rebased lanes");
        for entry in entries {
            let lane = self.lane_of(entry.time);
            self.lanes[lane].push(entry);
        }
    }

    fn poll(&mut self) -> Option<Box<dyn Event>> {
        if self.index.is_empty() {
            return None;
        }
        let overflow = self.overflow();
        if self.lanes[..overflow].iter().all(Lane::is_empty) {
            self.rebase();
        }
        let lane = self.lanes.iter_mut().find(|l| !l.is_empty())?;
        let entry = lane.pop()?;
        self.index.remove(&entry.key);
        Some(entry.event)
    }

    fn peek_time(&self) -> Option<SimTime> {
        self.lanes
            .iter()
            .find_map(|l| l.peek())
            .map(|p| p.time)
    }

    fn all_pending(&self) -> Vec<&dyn Event> {
        let mut out = Vec::with_capacity(self.index.len());
        for lane in &self.lanes {
            lane.collect_events(&mut out);
        }
        out
    }

    fn clear(&mut self) {
        for lane in &mut self.lanes {
            lane.clear();
        }
        self.index.clear();
        self.base = 0;
    }

    fn lane_lengths(&self) -> Vec<usize> {
        self.lanes.iter().map(Lane::len).collect()
    }
}

macro_rules! long_run_manager {
    ($(#[$doc:meta])* $name:ident, $lane:ty, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            buckets: Buckets<$lane>,
        }

        impl $name {
            /// Manager with `lanes` lanes (at least 2, the last being the
            /// overflow) of [`DEFAULT_BUCKET_WIDTH`] each.
            pub fn new(lanes: usize) -> Self {
                Self::with_bucket_width(lanes, DEFAULT_BUCKET_WIDTH)
            }

            /// Manager with an explicit initial lane width in milliseconds.
            pub fn with_bucket_width(lanes: usize, width: u64) -> Self {
                $name {
                    buckets: Buckets::new(lanes, width),
                }
            }

            /// Number of lanes, overflow included.
            pub fn lanes(&self) -> usize {
                self.buckets.lanes.len()
            }

            /// Pending events per lane.
            pub fn lane_lengths(&self) -> Vec<usize> {
                self.buckets.lane_lengths()
            }

            /// Current (base, width) of the bounded lanes.
            pub fn bucket_span(&self) -> (SimTime, u64) {
                (SimTime::from_millis(self.buckets.base), self.buckets.width)
            }

            /// How many times the lanes were re-based.
            pub fn rebases(&self) -> u64 {
                self.buckets.rebases
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(DEFAULT_LANES)
            }
        }

        impl EventManager for $name {
            fn add(&mut self, event: Box<dyn Event>) -> EventKey {
                self.buckets.add(event)
            }

            fn delete(&mut self, key: EventKey) -> Option<Box<dyn Event>> {
                self.buckets.delete(key)
            }

            fn poll_earliest(&mut self) -> Option<Box<dyn Event>> {
                self.buckets.poll()
            }

            fn peek_time(&self) -> Option<SimTime> {
                self.buckets.peek_time()
            }

            fn all_pending(&self) -> Vec<&dyn Event> {
                self.buckets.all_pending()
            }

            fn count(&self) -> usize {
                self.buckets.index.len()
            }

            fn clear(&mut self) {
                self.buckets.clear();
            }

            fn name(&self) -> &'static str {
                $label
            }
        }
    };
}

long_run_manager!(
    /// Time-bucketed binary heaps.
    LongRunHeapEventManager,
    HeapLane,
    "long-run-heap"
);

long_run_manager!(
    /// Time-bucketed sorted vectors.
    LongRunSortedVecEventManager,
    SortedLane,
    "long-run-sorted-vec"
);
