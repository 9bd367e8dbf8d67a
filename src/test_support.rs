//! Configurable events shared by the unit tests.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::event::{Event, EventHeader, EventId, EventKind, KindedEvent};
use crate::registry::EventRegistry;
use crate::sim_data::SimData;
use crate::time::SimTime;

pub(crate) const OTHER_KIND: EventKind = EventKind::new(2);
pub(crate) const ABSTRACT_KIND: EventKind = EventKind::new(3);

/// Lines of the form `"{id} {time}"`, one per execution.
pub(crate) type LogSink = Arc<Mutex<Vec<String>>>;

/// Follow-up behavior: may schedule or cancel through the context and
/// returns the follow-up event, if any.
pub(crate) type NextFn =
    Arc<dyn Fn(&mut SimData, &TestEvent) -> Option<Box<dyn Event>> + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct TestEvent {
    header: EventHeader,
    log: Option<LogSink>,
    next: Option<NextFn>,
    /// Overrides [`TestEvent::KIND`].
    kind: Option<EventKind>,
}

impl TestEvent {
    pub fn new(time: u64, id: u64) -> Self {
        TestEvent {
            header: EventHeader::new(SimTime::from_millis(time), EventId::new(id)),
            log: None,
            next: None,
            kind: None,
        }
    }

    pub fn logging_to(mut self, sink: LogSink) -> Self {
        self.log = Some(sink);
        self
    }

    pub fn with_next(mut self, next: NextFn) -> Self {
        self.next = Some(next);
        self
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl fmt::Debug for TestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestEvent")
            .field("time", &self.header.time)
            .field("id", &self.header.id)
            .field("logs", &self.log.is_some())
            .field("chains", &self.next.is_some())
            .finish()
    }
}

impl KindedEvent for TestEvent {
    const KIND: EventKind = EventKind::new(1);
}

impl Event for TestEvent {
    fn kind(&self) -> EventKind {
        self.kind.unwrap_or(Self::KIND)
    }

    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EventHeader {
        &mut self.header
    }

    fn execute(&mut self, data: &mut SimData) -> Option<Box<dyn Event>> {
        let line = format!("{} {}", self.id().raw(), self.time().millis());
        if data.logging_active() {
            data.log_event_execution("TestEvent", None, &line);
        }
        if let Some(log) = &self.log {
            log.lock().unwrap().push(line);
        }
        let next = self.next.clone()?;
        next(data, self)
    }

    fn copy(&self, time: SimTime, id: EventId) -> Box<dyn Event> {
        let mut copy = self.clone();
        copy.header = EventHeader::new(time, id);
        Box::new(copy)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A second concrete kind with no behavior.
#[derive(Debug, Clone, Default)]
pub(crate) struct OtherEvent {
    header: EventHeader,
}

impl KindedEvent for OtherEvent {
    const KIND: EventKind = OTHER_KIND;
}

impl Event for OtherEvent {
    fn kind(&self) -> EventKind {
        Self::KIND
    }

    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EventHeader {
        &mut self.header
    }

    fn execute(&mut self, _data: &mut SimData) -> Option<Box<dyn Event>> {
        None
    }

    fn copy(&self, time: SimTime, id: EventId) -> Box<dyn Event> {
        Box::new(OtherEvent {
            header: EventHeader::new(time, id),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Registry with both concrete test kinds and one abstract kind.
pub(crate) fn test_registry() -> EventRegistry {
    let mut r = EventRegistry::new();
    r.register_type::<TestEvent>("test").unwrap();
    r.register_type::<OtherEvent>("other").unwrap();
    r.register_abstract(ABSTRACT_KIND, "abstract").unwrap();
    r
}

/// Chain `id → id+1` at `time = (id+1) * 100` until the id reaches `last`.
pub(crate) fn chain_until(last: u64) -> NextFn {
    Arc::new(move |_data: &mut SimData, e: &TestEvent| {
        let id = e.id().raw();
        if id >= last {
            return None;
        }
        Some(e.copy(SimTime::from_millis((id + 1) * 100), EventId::new(id + 1)))
    })
}
