//! Linear-scan cache, plain and mutex-guarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{EventCache, Pool, DEFAULT_POOL_LIMIT};
use crate::event::{Event, EventKind};
use crate::registry::EventRegistry;

/// Pools stored as `(kind, pool)` pairs and found by linear scan.
///
/// Cheapest lookup when a model only uses a few event kinds.
#[derive(Debug)]
pub struct ListEventCache {
    pools: Vec<(EventKind, Pool)>,
    limit: usize,
}

impl ListEventCache {
    pub fn new() -> Self {
        Self::with_pool_limit(DEFAULT_POOL_LIMIT)
    }

    pub fn with_pool_limit(limit: usize) -> Self {
        ListEventCache {
            pools: Vec::new(),
            limit,
        }
    }

    fn pool_mut(&mut self, kind: EventKind) -> Option<&mut Pool> {
        self.pools
            .iter_mut()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p)
    }
}

impl Default for ListEventCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCache for ListEventCache {
    fn recycle(&mut self, event: Box<dyn Event>) {
        let kind = event.kind();
        let limit = self.limit;
        match self.pool_mut(kind) {
            Some(pool) => pool.put(event, limit),
            None => {
                let mut pool = Pool::default();
                pool.put(event, limit);
                self.pools.push((kind, pool));
            }
        }
    }

    fn acquire_or_none(&mut self, kind: EventKind) -> Option<Box<dyn Event>> {
        self.pool_mut(kind)?.take()
    }

    fn clear(&mut self) {
        for (_, pool) in &mut self.pools {
            pool.clear();
        }
    }

    fn pooled(&self) -> usize {
        self.pools.iter().map(|(_, p)| p.len()).sum()
    }

    fn name(&self) -> &'static str {
        "list"
    }
}

// ── LockedEventCache ─────────────────────────────────────────────────

/// A [`ListEventCache`] behind a mutex.
///
/// Clones share one pool, so a single cache can serve several replications.
/// Every operation takes the lock; replications that own their cache should
/// use an unlocked strategy instead.
#[derive(Debug, Clone)]
pub struct LockedEventCache {
    inner: Arc<Mutex<ListEventCache>>,
}

impl LockedEventCache {
    pub fn new() -> Self {
        Self::with_pool_limit(DEFAULT_POOL_LIMIT)
    }

    pub fn with_pool_limit(limit: usize) -> Self {
        LockedEventCache {
            inner: Arc::new(Mutex::new(ListEventCache::with_pool_limit(limit))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListEventCache> {
        // A panic while holding the lock cannot leave the free lists
        // half-updated, so the poisoned state is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of handles sharing this cache.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Default for LockedEventCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCache for LockedEventCache {
    fn recycle(&mut self, event: Box<dyn Event>) {
        self.lock().recycle(event);
    }

    fn acquire_or_none(&mut self, kind: EventKind) -> Option<Box<dyn Event>> {
        self.lock().acquire_or_none(kind)
    }

    fn acquire(&mut self, kind: EventKind, registry: &EventRegistry) -> Option<Box<dyn Event>> {
        // Construction happens outside the lock.
        let pooled = self.lock().acquire_or_none(kind);
        pooled.or_else(|| registry.construct(kind))
    }

    fn clear(&mut self) {
        self.lock().clear();
    }

    fn pooled(&self) -> usize {
        self.lock().pooled()
    }

    fn name(&self) -> &'static str {
        "locked-list"
    }
}
