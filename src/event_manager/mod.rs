//! Pending-event containers.
//!
//! An [`EventManager`] holds the pending events of one replication and hands
//! them out earliest-first. Several backing structures exist because the
//! extraction path is the hottest loop in the engine and the best structure
//! depends on the model: how many events are pending, how many share a
//! time, and how far into the future they reach.
//!
//! All strategies share one ordering contract: ascending time, and among
//! equal times ascending [`EventKey`] (insertion order).
//!
//! ```text
//!   add ──► [ strategy-specific structure ] ──► poll_earliest
//!              ▲                    │
//!      delete(EventKey)        all_pending / count
//! ```

mod heap;
mod lane;
mod long_run;
mod map;
mod multi_heap;
mod sorted_vec;

use std::cmp::Ordering;
use std::fmt;

use crate::event::{Event, EventKey};
use crate::time::SimTime;

pub use heap::HeapEventManager;
pub use long_run::{
    LongRunHeapEventManager, LongRunSortedVecEventManager, DEFAULT_BUCKET_WIDTH, DEFAULT_LANES,
};
pub use map::MapEventManager;
pub use multi_heap::MultiHeapEventManager;
pub use sorted_vec::{BatchSortedVecEventManager, SortedVecEventManager};

// ── EventManager trait ───────────────────────────────────────────────

/// An ordered container of pending events.
///
/// Every method is safe to call while another event of the same
/// replication is executing: the executing event is not in the manager.
pub trait EventManager: Send {
    /// Insert an event and return the handle that identifies this pending
    /// instance.
    fn add(&mut self, event: Box<dyn Event>) -> EventKey;

    /// Remove the pending instance `key`.
    ///
    /// Returns `None` with no other effect when `key` is not pending, whether
    /// it never existed, already fired or was already deleted.
    fn delete(&mut self, key: EventKey) -> Option<Box<dyn Event>>;

    /// Remove and return the earliest pending event.
    fn poll_earliest(&mut self) -> Option<Box<dyn Event>>;

    /// Time of the earliest pending event.
    fn peek_time(&self) -> Option<SimTime>;

    /// Snapshot of all pending events, in no particular order.
    fn all_pending(&self) -> Vec<&dyn Event>;

    /// Number of pending events.
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Drop every pending event.
    fn clear(&mut self);

    /// Short strategy name for diagnostics.
    fn name(&self) -> &'static str;
}

impl fmt::Debug for dyn EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("strategy", &self.name())
            .field("pending", &self.count())
            .finish()
    }
}

// ── Pending entry ────────────────────────────────────────────────────

/// A pending event together with the keys it is ordered by.
///
/// The time is copied out of the event at insertion so that ordering never
/// depends on the event's own mutable header.
pub(crate) struct Pending {
    pub time: SimTime,
    pub key: EventKey,
    pub event: Box<dyn Event>,
}

impl Pending {
    #[inline]
    pub fn order_key(&self) -> (SimTime, EventKey) {
        (self.time, self.key)
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("time", &self.time)
            .field("key", &self.key)
            .field("event", &self.event)
            .finish()
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Pending {}

/// Ordering: smallest `(time, key)` first.
///
/// Rust's `BinaryHeap` is a *max*-heap, so the natural ordering is
/// **reversed** here to turn it into a min-heap.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.key.cmp(&self.key))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ── Sequencer ────────────────────────────────────────────────────────

/// Mints the insertion keys of one manager.
#[derive(Debug, Clone, Default)]
pub(crate) struct Sequencer {
    next: u64,
}

impl Sequencer {
    pub fn wrap(&mut self, event: Box<dyn Event>) -> Pending {
        let key = EventKey::new(self.next);
        self.next += 1;
        Pending {
            time: event.time(),
            key,
            event,
        }
    }
}

// ── Strategy selector ────────────────────────────────────────────────

/// Configuration-level choice of event manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventManagerKind {
    /// One binary heap.
    #[default]
    Heap,
    /// Same-time FIFO lane in front of a binary heap.
    MultiHeap,
    /// One sorted vector.
    SortedVec,
    /// Sorted vector with a lazily merged staging buffer.
    BatchSortedVec,
    /// Ordered map from time to FIFO of events.
    Map,
    /// `lanes` time-bucketed heaps.
    LongRunHeap { lanes: usize },
    /// `lanes` time-bucketed sorted vectors.
    LongRunSortedVec { lanes: usize },
}

impl EventManagerKind {
    /// Every strategy, with default lane counts for the bucketed ones.
    pub const ALL: [EventManagerKind; 7] = [
        EventManagerKind::Heap,
        EventManagerKind::MultiHeap,
        EventManagerKind::SortedVec,
        EventManagerKind::BatchSortedVec,
        EventManagerKind::Map,
        EventManagerKind::LongRunHeap {
            lanes: DEFAULT_LANES,
        },
        EventManagerKind::LongRunSortedVec {
            lanes: DEFAULT_LANES,
        },
    ];

    /// Build a fresh, empty manager of this kind.
    pub fn create(self) -> Box<dyn EventManager> {
        match self {
            EventManagerKind::Heap => Box::new(HeapEventManager::new()),
            EventManagerKind::MultiHeap => Box::new(MultiHeapEventManager::new()),
            EventManagerKind::SortedVec => Box::new(SortedVecEventManager::new()),
            EventManagerKind::BatchSortedVec => Box::new(BatchSortedVecEventManager::new()),
            EventManagerKind::Map => Box::new(MapEventManager::new()),
            EventManagerKind::LongRunHeap { lanes } => {
                Box::new(LongRunHeapEventManager::new(lanes))
            }
            EventManagerKind::LongRunSortedVec { lanes } => {
                Box::new(LongRunSortedVecEventManager::new(lanes))
            }
        }
    }
}

impl fmt::Display for EventManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventManagerKind::Heap => write!(f, "heap"),
            EventManagerKind::MultiHeap => write!(f, "multi-heap"),
            EventManagerKind::SortedVec => write!(f, "sorted-vec"),
            EventManagerKind::BatchSortedVec => write!(f, "batch-sorted-vec"),
            EventManagerKind::Map => write!(f, "map"),
            EventManagerKind::LongRunHeap { lanes } => write!(f, "long-run-heap({})", lanes),
            EventManagerKind::LongRunSortedVec { lanes } => {
                write!(f, "long-run-sorted-vec({})", lanes)
            }
        }
    }
}

// ── Conformance tests (every strategy) ───────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEvent;
    use proptest::prelude::*;

    fn all_managers() -> Vec<Box<dyn EventManager>> {
        let mut v: Vec<Box<dyn EventManager>> =
            EventManagerKind::ALL.iter().map(|k| k.create()).collect();
        // Narrow buckets so the long-run strategies actually spread and rebase.
        v.push(Box::new(LongRunHeapEventManager::with_bucket_width(3, 10)));
        v.push(Box::new(LongRunSortedVecEventManager::with_bucket_width(5, 7)));
        v
    }

    fn drain(m: &mut dyn EventManager) -> Vec<(u64, u64)> {
        let mut out = Vec::new();
        while let Some(e) = m.poll_earliest() {
            out.push((e.time().millis(), e.id().raw()));
        }
        out
    }

    #[test]
    fn test_time_ordering_all_strategies() {
        for mut m in all_managers() {
            for &(t, id) in &[(30, 0), (10, 1), (20, 2), (50_000, 3), (0, 4)] {
                m.add(Box::new(TestEvent::new(t, id)));
            }
            assert_eq!(m.count(), 5, "{}", m.name());
            assert_eq!(m.peek_time(), Some(SimTime::ZERO), "{}", m.name());
            let times: Vec<u64> = drain(m.as_mut()).into_iter().map(|(t, _)| t).collect();
            assert_eq!(times, vec![0, 10, 20, 30, 50_000], "{}", m.name());
            assert!(m.is_empty());
        }
    }

    #[test]
    fn test_fifo_at_same_time_all_strategies() {
        for mut m in all_managers() {
            for id in 0..20 {
                m.add(Box::new(TestEvent::new(100, id)));
            }
            let ids: Vec<u64> = drain(m.as_mut()).into_iter().map(|(_, id)| id).collect();
            assert_eq!(ids, (0..20).collect::<Vec<_>>(), "{}", m.name());
        }
    }

    #[test]
    fn test_same_time_added_after_poll_keeps_fifo() {
        // Follow-ups at the current time go behind earlier same-time events.
        for mut m in all_managers() {
            m.add(Box::new(TestEvent::new(100, 0)));
            m.add(Box::new(TestEvent::new(100, 1)));
            m.add(Box::new(TestEvent::new(200, 2)));
            let first = m.poll_earliest().unwrap();
            assert_eq!(first.id().raw(), 0);
            m.add(Box::new(TestEvent::new(100, 3)));
            m.add(Box::new(TestEvent::new(150, 4)));
            let ids: Vec<u64> = drain(m.as_mut()).into_iter().map(|(_, id)| id).collect();
            assert_eq!(ids, vec![1, 3, 4, 2], "{}", m.name());
        }
    }

    #[test]
    fn test_delete_pending_and_absent() {
        for mut m in all_managers() {
            let k1 = m.add(Box::new(TestEvent::new(100, 1)));
            let k2 = m.add(Box::new(TestEvent::new(200, 2)));
            let k3 = m.add(Box::new(TestEvent::new(300, 3)));

            let removed = m.delete(k2).expect("pending event is deletable");
            assert_eq!(removed.id().raw(), 2, "{}", m.name());
            assert_eq!(m.count(), 2);

            // Second delete of the same key, and a key that never existed.
            assert!(m.delete(k2).is_none(), "{}", m.name());
            assert!(m.delete(EventKey::new(9_999)).is_none(), "{}", m.name());
            assert_eq!(m.count(), 2);

            // Delete after firing is a no-op too.
            let fired = m.poll_earliest().unwrap();
            assert_eq!(fired.id().raw(), 1);
            assert!(m.delete(k1).is_none(), "{}", m.name());

            assert_eq!(drain(m.as_mut()), vec![(300, 3)], "{}", m.name());
            assert!(m.delete(k3).is_none());
        }
    }

    #[test]
    fn test_delete_earliest_updates_peek() {
        for mut m in all_managers() {
            let k = m.add(Box::new(TestEvent::new(5, 0)));
            m.add(Box::new(TestEvent::new(7, 1)));
            assert_eq!(m.peek_time(), Some(SimTime::from_millis(5)));
            m.delete(k);
            assert_eq!(m.peek_time(), Some(SimTime::from_millis(7)), "{}", m.name());
        }
    }

    #[test]
    fn test_all_pending_and_clear() {
        for mut m in all_managers() {
            for id in 0..10 {
                m.add(Box::new(TestEvent::new(id * 37 % 11, id)));
            }
            let mut ids: Vec<u64> = m.all_pending().iter().map(|e| e.id().raw()).collect();
            ids.sort_unstable();
            assert_eq!(ids, (0..10).collect::<Vec<_>>(), "{}", m.name());
            m.clear();
            assert_eq!(m.count(), 0);
            assert!(m.all_pending().is_empty());
            assert!(m.poll_earliest().is_none());
            assert!(m.peek_time().is_none());
        }
    }

    #[test]
    fn test_empty_manager() {
        for mut m in all_managers() {
            assert!(m.is_empty());
            assert!(m.poll_earliest().is_none(), "{}", m.name());
            assert!(m.delete(EventKey::new(0)).is_none());
        }
    }

    #[test]
    fn test_kind_display_and_create_names() {
        assert_eq!(EventManagerKind::Heap.to_string(), "heap");
        assert_eq!(
            EventManagerKind::LongRunHeap { lanes: 4 }.to_string(),
            "long-run-heap(4)"
        );
        let names: Vec<&str> = EventManagerKind::ALL
            .iter()
            .map(|k| k.create().name())
            .collect();
        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_pending_reverse_ordering() {
        let mut seq = Sequencer::default();
        let a = seq.wrap(Box::new(TestEvent::new(10, 0)));
        let b = seq.wrap(Box::new(TestEvent::new(20, 1)));
        let c = seq.wrap(Box::new(TestEvent::new(10, 2)));
        // Smaller (time, key) compares greater in the reversed ordering.
        assert!(a > b);
        assert!(a > c);
        assert!(c > b);
    }

    proptest! {
        #[test]
        fn prop_every_strategy_yields_sorted_insertion_set(
            times in prop::collection::vec(0u64..5_000, 0..200)
        ) {
            let mut expected: Vec<(u64, u64)> = times
                .iter()
                .enumerate()
                .map(|(i, &t)| (t, i as u64))
                .collect();
            expected.sort();

            for mut m in all_managers() {
                for (i, &t) in times.iter().enumerate() {
                    m.add(Box::new(TestEvent::new(t, i as u64)));
                }
                prop_assert_eq!(drain(m.as_mut()), expected.clone(), "{}", m.name());
            }
        }

        #[test]
        fn prop_interleaved_add_poll_delete_matches_heap(
            ops in prop::collection::vec((0u8..3, 0u64..300), 1..200)
        ) {
            // Every strategy must agree with the plain heap under any mix
            // of operations that never schedules into the past.
            let mut reference: Box<dyn EventManager> = Box::new(HeapEventManager::new());
            let mut managers = all_managers();
            let mut ref_out = Vec::new();
            let mut outs = vec![Vec::new(); managers.len()];
            let mut now = 0u64;
            let mut keys = Vec::new();

            for (i, &(op, v)) in ops.iter().enumerate() {
                match op {
                    0 => {
                        let t = now + v;
                        keys.push(reference.add(Box::new(TestEvent::new(t, i as u64))));
                        for m in managers.iter_mut() {
                            m.add(Box::new(TestEvent::new(t, i as u64)));
                        }
                    }
                    1 => {
                        if let Some(e) = reference.poll_earliest() {
                            now = e.time().millis();
                            ref_out.push(e.id().raw());
                        }
                        for (m, out) in managers.iter_mut().zip(outs.iter_mut()) {
                            if let Some(e) = m.poll_earliest() {
                                out.push(e.id().raw());
                            }
                        }
                    }
                    _ => {
                        if !keys.is_empty() {
                            let k = keys[(v as usize) % keys.len()];
                            let r = reference.delete(k).map(|e| e.id().raw());
                            for m in managers.iter_mut() {
                                prop_assert_eq!(m.delete(k).map(|e| e.id().raw()), r, "{}", m.name());
                            }
                        }
                    }
                }
            }
            for (m, out) in managers.iter_mut().zip(outs.iter_mut()) {
                prop_assert_eq!(m.count(), reference.count(), "{}", m.name());
                while let Some(e) = m.poll_earliest() {
                    out.push(e.id().raw());
                }
            }
            while let Some(e) = reference.poll_earliest() {
                ref_out.push(e.id().raw());
            }
            for (m, out) in managers.iter().zip(outs.iter()) {
                prop_assert_eq!(out, &ref_out, "{}", m.name());
            }
        }
    }
}
