//! Hash-keyed cache for sparse or large kind tags.

use std::collections::HashMap;

use super::{EventCache, Pool, DEFAULT_POOL_LIMIT};
use crate::event::{Event, EventKind};

#[derive(Debug)]
pub struct HashMapEventCache {
    pools: HashMap<EventKind, Pool>,
    limit: usize,
}

impl HashMapEventCache {
    pub fn new() -> Self {
        Self::with_pool_limit(DEFAULT_POOL_LIMIT)
    }

    pub fn with_pool_limit(limit: usize) -> Self {
        HashMapEventCache {
            pools: HashMap::new(),
            limit,
        }
    }

    /// Number of kinds that have a pool.
    pub fn kinds(&self) -> usize {
        self.pools.len()
    }
}

impl Default for HashMapEventCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCache for HashMapEventCache {
    fn recycle(&mut self, event: Box<dyn Event>) {
        self.pools
            .entry(event.kind())
            .or_default()
            .put(event, self.limit);
    }

    fn acquire_or_none(&mut self, kind: EventKind) -> Option<Box<dyn Event>> {
        self.pools.get_mut(&kind)?.take()
    }

    fn clear(&mut self) {
        self.pools.clear();
    }

    fn pooled(&self) -> usize {
        self.pools.values().map(Pool::len).sum()
    }

    fn name(&self) -> &'static str {
        "hash-map"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{OtherEvent, TestEvent};

    #[test]
    fn test_one_pool_per_kind() {
        let mut cache = HashMapEventCache::new();
        cache.recycle(Box::new(TestEvent::new(1, 1)));
        cache.recycle(Box::new(TestEvent::new(2, 2)));
        cache.recycle(Box::new(OtherEvent::default()));
        assert_eq!(cache.kinds(), 2);
        cache.clear();
        assert_eq!(cache.kinds(), 0);
    }
}
