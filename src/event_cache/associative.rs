//! Dense-table cache indexed directly by the kind tag.

use std::collections::HashMap;

use super::{EventCache, Pool, DEFAULT_POOL_LIMIT};
use crate::event::{Event, EventKind};

/// Largest number of dense slots; kinds at or above it go to a side map.
pub const DENSE_KIND_LIMIT: usize = 1_024;

/// One slot per kind index; the table grows to the largest kind seen.
///
/// Constant-time lookup for any number of kinds, at the cost of one empty
/// slot per unused tag below the largest one. Tags beyond
/// [`DENSE_KIND_LIMIT`] are pooled in a hash map instead.
#[derive(Debug)]
pub struct AssociativeEventCache {
    slots: Vec<Pool>,
    overflow: HashMap<EventKind, Pool>,
    limit: usize,
}

impl AssociativeEventCache {
    pub fn new() -> Self {
        Self::with_pool_limit(DEFAULT_POOL_LIMIT)
    }

    pub fn with_pool_limit(limit: usize) -> Self {
        AssociativeEventCache {
            slots: Vec::new(),
            overflow: HashMap::new(),
            limit,
        }
    }

    fn pool_mut(&mut self, kind: EventKind) -> &mut Pool {
        let idx = kind.index();
        if idx >= DENSE_KIND_LIMIT {
            return self.overflow.entry(kind).or_default();
        }
        if self.slots.len() <= idx {
            self.slots.resize_with(idx + 1, Pool::default);
        }
        &mut self.slots[idx]
    }
}

impl Default for AssociativeEventCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCache for AssociativeEventCache {
    fn recycle(&mut self, event: Box<dyn Event>) {
        let limit = self.limit;
        self.pool_mut(event.kind()).put(event, limit);
    }

    fn acquire_or_none(&mut self, kind: EventKind) -> Option<Box<dyn Event>> {
        match self.slots.get_mut(kind.index()) {
            Some(pool) => pool.take(),
            None => self.overflow.get_mut(&kind)?.take(),
        }
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(Pool::clear);
        self.overflow.clear();
    }

    fn pooled(&self) -> usize {
        self.slots.iter().chain(self.overflow.values()).map(Pool::len).sum()
    }

    fn name(&self) -> &'static str {
        "associative"
    }
}
