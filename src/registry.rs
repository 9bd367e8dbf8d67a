//! Kind-tag → constructor table.
//!
//! Event caches fall back to fresh construction when their pool for a kind
//! is empty. Rather than introspecting types at runtime, each event type
//! registers a plain constructor against its [`EventKind`] once, before the
//! replications start. Kinds registered as *abstract* are known by name but
//! cannot be instantiated.

use std::collections::hash_map::Entry as Slot;
use std::collections::HashMap;

use crate::error::{SimError, SimResult};
use crate::event::{Event, EventKind, KindedEvent};

/// Constructor for a fresh event of one kind.
pub type EventConstructor = fn() -> Box<dyn Event>;

#[derive(Debug, Clone)]
struct Entry {
    name: &'static str,
    construct: Option<EventConstructor>,
}

/// Read-only after setup; share across replications with `Arc`.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    entries: HashMap<EventKind, Entry>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instantiable kind.
    pub fn register(
        &mut self,
        kind: EventKind,
        name: &'static str,
        construct: EventConstructor,
    ) -> SimResult<()> {
        self.insert(
            kind,
            Entry {
                name,
                construct: Some(construct),
            },
        )
    }

    /// Register a concrete event type by its static kind tag.
    pub fn register_type<T: KindedEvent + Default>(&mut self, name: &'static str) -> SimResult<()> {
        self.register(T::KIND, name, || Box::new(T::default()))
    }

    /// Register a kind that exists but cannot be constructed.
    pub fn register_abstract(&mut self, kind: EventKind, name: &'static str) -> SimResult<()> {
        self.insert(
            kind,
            Entry {
                name,
                construct: None,
            },
        )
    }

    fn insert(&mut self, kind: EventKind, entry: Entry) -> SimResult<()> {
        match self.entries.entry(kind) {
            Slot::Occupied(_) => Err(SimError::DuplicateEventKind(kind)),
            Slot::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    fn entry(&self, kind: EventKind) -> Option<&Entry> {
        self.entries.get(&kind)
    }

    /// Build a fresh instance, or `None` for abstract and unknown kinds.
    pub fn construct(&self, kind: EventKind) -> Option<Box<dyn Event>> {
        self.entry(kind).and_then(|e| e.construct).map(|f| f())
    }

    pub fn name(&self, kind: EventKind) -> Option<&'static str> {
        self.entry(kind).map(|e| e.name)
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.entry(kind).is_some()
    }

    /// Whether `kind` is registered and can be constructed.
    pub fn is_constructible(&self, kind: EventKind) -> bool {
        self.entry(kind).is_some_and(|e| e.construct.is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
