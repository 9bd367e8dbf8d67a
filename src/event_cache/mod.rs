//! Per-kind object pools for retired events.
//!
//! After execution an event box is handed to the replication's cache
//! instead of being freed; the next request for the same kind reuses it.
//! Caches differ only in how they find the pool of a kind:
//!
//! | Cache | Lookup |
//! |---|---|
//! | [`ListEventCache`] | linear scan, best for a handful of kinds |
//! | [`LockedEventCache`] | list cache behind a mutex, shareable across replications |
//! | [`AssociativeEventCache`] | dense table indexed by kind |
//! | [`HashMapEventCache`] | hash map keyed by kind |
//! | [`NoEventCache`] | none: recycling drops, acquisition always misses |
//!
//! Every pooling cache bounds each per-kind pool; surplus events are dropped.

mod associative;
mod hash_map;
mod list;
mod none;

use std::fmt;

use tracing::trace;

use crate::event::{Event, EventKind};
use crate::registry::EventRegistry;

pub use associative::{AssociativeEventCache, DENSE_KIND_LIMIT};
pub use hash_map::HashMapEventCache;
pub use list::{ListEventCache, LockedEventCache};
pub use none::NoEventCache;

/// Default maximum number of pooled events per kind.
pub const DEFAULT_POOL_LIMIT: usize = 4_096;

// ── EventCache trait ─────────────────────────────────────────────────

pub trait EventCache: Send {
    /// Take ownership of a retired event, filed under its kind.
    fn recycle(&mut self, event: Box<dyn Event>);

    /// A pooled instance of `kind`, if any. Never allocates.
    fn acquire_or_none(&mut self, kind: EventKind) -> Option<Box<dyn Event>>;

    /// A pooled instance of `kind`, otherwise a freshly constructed one.
    ///
    /// `None` only when the pool is empty and `kind` cannot be constructed.
    fn acquire(&mut self, kind: EventKind, registry: &EventRegistry) -> Option<Box<dyn Event>> {
        self.acquire_or_none(kind)
            .or_else(|| registry.construct(kind))
    }

    /// Drop every pooled event.
    fn clear(&mut self);

    /// Total number of pooled events over all kinds.
    fn pooled(&self) -> usize;

    fn name(&self) -> &'static str;
}

impl fmt::Debug for dyn EventCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCache")
            .field("strategy", &self.name())
            .field("pooled", &self.pooled())
            .finish()
    }
}

// ── Pool ─────────────────────────────────────────────────────────────

/// Bounded free list of one kind.
#[derive(Debug, Default)]
pub(crate) struct Pool {
    items: Vec<Box<dyn Event>>,
}

impl Pool {
    /// Keep `event` unless the pool already holds `limit` events.
    #[inline]
    pub fn put(&mut self, event: Box<dyn Event>, limit: usize) {
        if self.items.len() >= limit {
            trace!(kind = %event.kind(), limit, "pool full, dropping event");
            return;
        }
        self.items.push(event);
    }

    #[inline]
    pub fn take(&mut self) -> Option<Box<dyn Event>> {
        self.items.pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// ── Strategy selector ────────────────────────────────────────────────

/// Configuration-level choice of event cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventCacheKind {
    /// No cache configured at all.
    Disabled,
    /// A cache that never pools.
    NoCache,
    #[default]
    List,
    Associative,
    HashMap,
}

impl EventCacheKind {
    pub const ALL: [EventCacheKind; 5] = [
        EventCacheKind::Disabled,
        EventCacheKind::NoCache,
        EventCacheKind::List,
        EventCacheKind::Associative,
        EventCacheKind::HashMap,
    ];

    /// Build a fresh cache, or `None` for [`EventCacheKind::Disabled`].
    pub fn create(self) -> Option<Box<dyn EventCache>> {
        match self {
            EventCacheKind::Disabled => None,
            EventCacheKind::NoCache => Some(Box::new(NoEventCache)),
            EventCacheKind::List => Some(Box::new(ListEventCache::new())),
            EventCacheKind::Associative => Some(Box::new(AssociativeEventCache::new())),
            EventCacheKind::HashMap => Some(Box::new(HashMapEventCache::new())),
        }
    }
}

impl fmt::Display for EventCacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventCacheKind::Disabled => "disabled",
            EventCacheKind::NoCache => "none",
            EventCacheKind::List => "list",
            EventCacheKind::Associative => "associative",
            EventCacheKind::HashMap => "hash-map",
        };
        f.write_str(s)
    }
}

// ── Conformance tests (every cache) ──────────────────────────────────
