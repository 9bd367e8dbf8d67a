//! Event model for the discrete-event simulation core.
//!
//! Every effect in a replication is modeled as an [`Event`]: a boxed trait
//! object carrying an [`EventHeader`] (time and id) and the behavior to run
//! when the clock reaches it. Ownership of the box moves between exactly one
//! holder at a time: an event manager while pending, the executing stack
//! while in flight, an event cache while retired.

use std::any::Any;
use std::fmt::Debug;

use crate::sim_data::SimData;
use crate::time::SimTime;

// ── Event ID ──────────────────────────────────────────────────────────

/// Label an event carries into log lines and debug output.
///
/// Minted per replication by [`SimData::next_event_id`], so the same id
/// shows up on every thread. Ordering of equal-time events never looks at
/// it; that is the job of the manager's [`EventKey`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        EventId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

/// Counter behind [`SimData::next_event_id`]; starts at zero.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen(u64);

impl EventIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.0);
        self.0 += 1;
        id
    }
}

// ── Event Kind ────────────────────────────────────────────────────────

/// Small integer tag identifying a concrete event type.
///
/// Caches file retired events under their kind and the
/// [`EventRegistry`](crate::registry::EventRegistry) maps kinds to
/// constructors, so lookups never need runtime type introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventKind(u32);

impl EventKind {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        EventKind(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The kind as a dense table index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "K{}", self.0)
    }
}

// ── Event Key ─────────────────────────────────────────────────────────

/// Handle of one *pending* event inside one event manager.
///
/// Returned by [`EventManager::add`](crate::event_manager::EventManager::add)
/// and accepted by `delete`. The value is the manager's insertion sequence
/// number, which doubles as the tie-break for events sharing a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey(u64);

impl EventKey {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        EventKey(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Event Header ─────────────────────────────────────────────────────

/// Schedule data every event embeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventHeader {
    /// The simulation time at which the event fires.
    pub time: SimTime,
    /// Diagnostic identifier.
    pub id: EventId,
}

impl EventHeader {
    pub const fn new(time: SimTime, id: EventId) -> Self {
        EventHeader { time, id }
    }
}

// ── Event trait ───────────────────────────────────────────────────────

/// A schedulable unit of work.
///
/// Implementors embed an [`EventHeader`] and expose it through
/// [`header`](Event::header) / [`header_mut`](Event::header_mut). Execution
/// receives the owning replication's [`SimData`], through which the event may
/// schedule or cancel other events. The returned follow-up (if any) is
/// enqueued into the same manager after `execute` returns.
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// struct Arrival { header: EventHeader }
///
/// impl Event for Arrival {
///     fn kind(&self) -> EventKind { Self::KIND }
///     fn header(&self) -> &EventHeader { &self.header }
///     fn header_mut(&mut self) -> &mut EventHeader { &mut self.header }
///     fn execute(&mut self, data: &mut SimData) -> Option<Box<dyn Event>> {
///         let next = self.time().plus(1_000)?;
///         Some(self.copy(next, data.next_event_id()))
///     }
///     fn copy(&self, time: SimTime, id: EventId) -> Box<dyn Event> {
///         Box::new(Arrival { header: EventHeader::new(time, id) })
///     }
///     fn as_any(&self) -> &dyn Any { self }
///     fn into_any(self: Box<Self>) -> Box<dyn Any + Send> { self }
/// }
/// ```
pub trait Event: Send + Debug + 'static {
    /// The runtime kind tag of this event.
    fn kind(&self) -> EventKind;

    fn header(&self) -> &EventHeader;

    fn header_mut(&mut self) -> &mut EventHeader;

    /// Run the event. Called exactly once per firing.
    fn execute(&mut self, data: &mut SimData) -> Option<Box<dyn Event>>;

    /// A behavior-equivalent event with a new schedule.
    fn copy(&self, time: SimTime, id: EventId) -> Box<dyn Event>;

    /// Downcast support for inspection.
    fn as_any(&self) -> &dyn Any;

    /// Downcast support for typed reacquisition from a cache.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    // ── Provided ──────────────────────────────────────────

    #[inline]
    fn time(&self) -> SimTime {
        self.header().time
    }

    #[inline]
    fn id(&self) -> EventId {
        self.header().id
    }

    /// Overwrite the schedule of a reused instance.
    fn reschedule(&mut self, time: SimTime, id: EventId) {
        *self.header_mut() = EventHeader::new(time, id);
    }
}

/// Static kind tag for a concrete event type.
pub trait KindedEvent: Event + Sized {
    const KIND: EventKind;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEvent;

    #[test]
    fn test_ids_count_up_from_zero() {
        let mut ids = EventIdGen::new();
        let minted: Vec<u64> = (0..3).map(|_| ids.next_id().raw()).collect();
        assert_eq!(minted, vec![0, 1, 2]);
        assert_eq!(EventIdGen::default().next_id(), EventId::default());
    }

    #[test]
    fn test_display() {
        assert_eq!(EventId::new(42).to_string(), "E#42");
        assert_eq!(EventKind::new(3).to_string(), "K3");
        assert_eq!(EventKey::new(9).to_string(), "#9");
    }

    #[test]
    fn test_reschedule_overwrites_header() {
        let mut e = TestEvent::new(100, 1);
        e.reschedule(SimTime::from_millis(500), EventId::new(7));
        assert_eq!(e.time(), SimTime::from_millis(500));
        assert_eq!(e.id(), EventId::new(7));
    }

    #[test]
    fn test_copy_preserves_kind_and_changes_schedule() {
        let e = TestEvent::new(100, 1);
        let c = e.copy(SimTime::from_millis(200), EventId::new(2));
        assert_eq!(c.kind(), e.kind());
        assert_eq!(c.time().millis(), 200);
        assert_eq!(c.id().raw(), 2);
        assert_eq!(e.time().millis(), 100);
    }

    #[test]
    fn test_into_any_downcasts() {
        let boxed: Box<dyn Event> = Box::new(TestEvent::new(5, 5));
        let typed = boxed.into_any().downcast::<TestEvent>();
        assert!(typed.is_ok());
    }
}
