//! Ordered building blocks shared by the event manager strategies.
//!
//! A lane is a self-contained priority structure over [`Pending`] entries.
//! The single-structure managers wrap one lane; the long-run managers keep
//! one lane per time bucket.

use std::collections::BinaryHeap;

use super::Pending;
use crate::event::{Event, EventKey};

pub(crate) trait Lane: Default + Send {
    fn push(&mut self, entry: Pending);

    /// Remove the entry with the smallest `(time, key)`.
    fn pop(&mut self) -> Option<Pending>;

    fn peek(&self) -> Option<&Pending>;

    fn remove(&mut self, key: EventKey) -> Option<Pending>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move every entry out, in no particular order.
    fn take_all(&mut self) -> Vec<Pending>;

    fn collect_events<'a>(&'a self, out: &mut Vec<&'a dyn Event>);

    fn clear(&mut self);
}

// ── Heap lane ─────────────────────────────────────────────────────────

/// Binary min-heap (via the reversed `Ord` on `Pending`).
#[derive(Debug, Default)]
pub(crate) struct HeapLane {
    heap: BinaryHeap<Pending>,
}

impl Lane for HeapLane {
    #[inline]
    fn push(&mut self, entry: Pending) {
        self.heap.push(entry);
    }

    #[inline]
    fn pop(&mut self) -> Option<Pending> {
        self.heap.pop()
    }

    #[inline]
    fn peek(&self) -> Option<&Pending> {
        self.heap.peek()
    }

    fn remove(&mut self, key: EventKey) -> Option<Pending> {
        if !self.heap.iter().any(|p| p.key == key) {
            return None;
        }
        // BinaryHeap has no removal by position: rebuild without the entry.
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        let idx = entries.iter().position(|p| p.key == key)?;
        let removed = entries.swap_remove(idx);
        self.heap = BinaryHeap::from(entries);
        Some(removed)
    }

    #[inline]
    fn len(&self) -> usize {
        self.heap.len()
    }

    fn take_all(&mut self) -> Vec<Pending> {
        std::mem::take(&mut self.heap).into_vec()
    }

    fn collect_events<'a>(&'a self, out: &mut Vec<&'a dyn Event>) {
        out.extend(self.heap.iter().map(|p| p.event.as_ref()));
    }

    fn clear(&mut self) {
        self.heap.clear();
    }
}

// ── Sorted lane ───────────────────────────────────────────────────────

/// Vector kept sorted latest-first, so the earliest entry pops off the tail.
#[derive(Debug, Default)]
pub(crate) struct SortedLane {
    items: Vec<Pending>,
}

impl SortedLane {
    /// Append many entries and restore the order in one sort.
    pub fn extend_and_sort(&mut self, entries: &mut Vec<Pending>) {
        self.items.append(entries);
        // Reversed `Ord` on Pending: ascending sort puts the earliest last.
        self.items.sort_unstable();
    }
}

impl Lane for SortedLane {
    fn push(&mut self, entry: Pending) {
        let key = entry.order_key();
        let at = self.items.partition_point(|p| p.order_key() > key);
        self.items.insert(at, entry);
    }

    #[inline]
    fn pop(&mut self) -> Option<Pending> {
        self.items.pop()
    }

    #[inline]
    fn peek(&self) -> Option<&Pending> {
        self.items.last()
    }

    fn remove(&mut self, key: EventKey) -> Option<Pending> {
        let idx = self.items.iter().position(|p| p.key == key)?;
        Some(self.items.remove(idx))
    }

    #[inline]
    fn len(&self) -> usize {
        self.items.len()
    }

    fn take_all(&mut self) -> Vec<Pending> {
        std::mem::take(&mut self.items)
    }

    fn collect_events<'a>(&'a self, out: &mut Vec<&'a dyn Event>) {
        out.extend(self.items.iter().map(|p| p.event.as_ref()));
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_manager::Sequencer;
    use crate::test_support::TestEvent;

    fn fill<L: Lane>(lane: &mut L, seq: &mut Sequencer, times: &[u64]) -> Vec<EventKey> {
        times
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let p = seq.wrap(Box::new(TestEvent::new(t, i as u64)));
                let k = p.key;
                lane.push(p);
                k
            })
            .collect()
    }

    fn pop_times<L: Lane>(lane: &mut L) -> Vec<u64> {
        std::iter::from_fn(|| lane.pop().map(|p| p.time.millis())).collect()
    }

    #[test]
    fn test_heap_lane_order_and_remove() {
        let mut lane = HeapLane::default();
        let mut seq = Sequencer::default();
        let keys = fill(&mut lane, &mut seq, &[5, 1, 4, 2, 3]);
        assert_eq!(lane.peek().map(|p| p.time.millis()), Some(1));
        assert_eq!(lane.remove(keys[2]).map(|p| p.time.millis()), Some(4));
        assert!(lane.remove(keys[2]).is_none());
        assert_eq!(pop_times(&mut lane), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_sorted_lane_order_and_remove() {
        let mut lane = SortedLane::default();
        let mut seq = Sequencer::default();
        let keys = fill(&mut lane, &mut seq, &[5, 1, 4, 1, 3]);
        assert_eq!(lane.peek().map(|p| p.key), Some(keys[1]));
        assert_eq!(lane.remove(keys[0]).map(|p| p.time.millis()), Some(5));
        assert_eq!(lane.len(), 4);
        let first = lane.pop().unwrap();
        assert_eq!(first.key, keys[1]);
        assert_eq!(pop_times(&mut lane), vec![1, 3, 4]);
    }

    #[test]
    fn test_sorted_lane_bulk_extend() {
        let mut lane = SortedLane::default();
        let mut seq = Sequencer::default();
        fill(&mut lane, &mut seq, &[10, 30]);
        let mut batch: Vec<Pending> = [20u64, 5, 40]
            .iter()
            .map(|&t| seq.wrap(Box::new(TestEvent::new(t, 0))))
            .collect();
        lane.extend_and_sort(&mut batch);
        assert!(batch.is_empty());
        assert_eq!(pop_times(&mut lane), vec![5, 10, 20, 30, 40]);
    }

    #[test]
    fn test_take_all_empties_lane() {
        let mut lane = HeapLane::default();
        let mut seq = Sequencer::default();
        fill(&mut lane, &mut seq, &[1, 2, 3]);
        assert_eq!(lane.take_all().len(), 3);
        assert!(lane.is_empty());
    }
}
