//! Time-keyed map event manager.
//!
//! Events sharing a time live in one FIFO under a single map key, so models
//! where many events coincide pay for one tree lookup per distinct time
//! rather than per event. A key→time index makes deletion a direct lookup.

use std::collections::{BTreeMap, HashMap, VecDeque};

use super::{EventManager, Pending, Sequencer};
use crate::event::{Event, EventKey};
use crate::time::SimTime;

#[derive(Debug, Default)]
pub struct MapEventManager {
    slots: BTreeMap<SimTime, VecDeque<Pending>>,
    index: HashMap<EventKey, SimTime>,
    seq: Sequencer,
}

impl MapEventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct pending times.
    pub fn distinct_times(&self) -> usize {
        self.slots.len()
    }
}

impl EventManager for MapEventManager {
    fn add(&mut self, event: Box<dyn Event>) -> EventKey {
        let entry = self.seq.wrap(event);
        let key = entry.key;
        self.index.insert(key, entry.time);
        self.slots.entry(entry.time).or_default().push_back(entry);
        key
    }

    fn delete(&mut self, key: EventKey) -> Option<Box<dyn Event>> {
        let time = self.index.remove(&key)?;
        let slot = self.slots.get_mut(&time)?;
        let idx = slot.iter().position(|p| p.key == key)?;
        let removed = slot.remove(idx);
        if slot.is_empty() {
            self.slots.remove(&time);
        }
        removed.map(|p| p.event)
    }

    fn poll_earliest(&mut self) -> Option<Box<dyn Event>> {
        let mut first = self.slots.first_entry()?;
        let entry = first.get_mut().pop_front();
        if first.get().is_empty() {
            first.remove();
        }
        let entry = entry?;
        self.index.remove(&entry.key);
        Some(entry.event)
    }

    fn peek_time(&self) -> Option<SimTime> {
        self.slots.keys().next().copied()
    }

    fn all_pending(&self) -> Vec<&dyn Event> {
        self.slots
            .values()
            .flat_map(|slot| slot.iter().map(|p| p.event.as_ref()))
            .collect()
    }

    fn count(&self) -> usize {
        self.index.len()
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    fn name(&self) -> &'static str {
        "map"
    }
}
