//! Cache that never pools.

use super::EventCache;
use crate::event::{Event, EventKind};

/// Recycling drops the event; acquisition always misses, so
/// [`EventCache::acquire`] always constructs fresh.
///
/// Behaves exactly like a replication with no cache configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEventCache;

impl EventCache for NoEventCache {
    fn recycle(&mut self, _event: Box<dyn Event>) {}

    fn acquire_or_none(&mut self, _kind: EventKind) -> Option<Box<dyn Event>> {
        None
    }

    fn clear(&mut self) {}

    fn pooled(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
