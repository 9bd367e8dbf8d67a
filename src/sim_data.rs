//! Per-replication simulation context.
//!
//! A [`SimData`] bundles everything one replication owns: its event manager,
//! its (optional) event cache, the clock, counters and the model log sink.
//! Events receive it mutably while executing, so they can schedule and
//! cancel other events, fetch reusable instances and write log lines.
//!
//! It also carries the single-threaded execution loop ([`SimData::step`] /
//! [`SimData::run`]); the multi-threaded [`Simulator`](crate::simulator::Simulator)
//! simply drives one `SimData` per worker thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::event::{Event, EventId, EventIdGen, EventKey, EventKind, KindedEvent};
use crate::event_cache::EventCache;
use crate::event_manager::EventManager;
use crate::logging::{LogEntry, SimLogger};
use crate::registry::EventRegistry;
use crate::time::{self, SimTime};

pub struct SimData {
    manager: Box<dyn EventManager>,
    cache: Option<Box<dyn EventCache>>,
    registry: Arc<EventRegistry>,

    current_time: SimTime,
    events_processed: u64,
    current_day: u64,
    thread_nr: usize,
    thread_count: usize,
    ids: EventIdGen,
    warm_up: bool,

    logger: Option<Box<dyn SimLogger>>,
    /// Shared with the orchestrator, which may suspend logging mid-run.
    logging_paused: Arc<AtomicBool>,
}

impl SimData {
    /// Context for replication `thread_nr` out of `thread_count`.
    ///
    /// Passing `None` for the cache is equivalent to a cache that never
    /// pools: recycled events are dropped and every request constructs
    /// fresh.
    pub fn new(
        manager: Box<dyn EventManager>,
        cache: Option<Box<dyn EventCache>>,
        thread_nr: usize,
        thread_count: usize,
    ) -> Self {
        SimData {
            manager,
            cache,
            registry: Arc::new(EventRegistry::new()),
            current_time: SimTime::ZERO,
            events_processed: 0,
            current_day: 0,
            thread_nr,
            thread_count,
            ids: EventIdGen::new(),
            warm_up: false,
            logger: None,
            logging_paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use `registry` for fresh construction of event kinds.
    pub fn with_registry(mut self, registry: Arc<EventRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub(crate) fn with_logging_switch(mut self, paused: Arc<AtomicBool>) -> Self {
        self.logging_paused = paused;
        self
    }

    // ── Scheduling ───────────────────────────────────────────────────

    /// Enqueue an event. The key can later be passed to
    /// [`cancel_event`](Self::cancel_event).
    pub fn schedule(&mut self, event: Box<dyn Event>) -> EventKey {
        self.manager.add(event)
    }

    /// Remove a pending event and recycle it. Returns `false` if `key` was
    /// not pending.
    pub fn cancel_event(&mut self, key: EventKey) -> bool {
        match self.manager.delete(key) {
            Some(event) => {
                self.recycle_event(event);
                true
            }
            None => false,
        }
    }

    /// Mint a fresh event id for this replication.
    pub fn next_event_id(&mut self) -> EventId {
        self.ids.next_id()
    }

    pub fn event_manager(&self) -> &dyn EventManager {
        self.manager.as_ref()
    }

    pub fn event_manager_mut(&mut self) -> &mut dyn EventManager {
        self.manager.as_mut()
    }

    pub fn event_cache(&self) -> Option<&dyn EventCache> {
        self.cache.as_deref()
    }

    pub fn event_cache_mut(&mut self) -> Option<&mut (dyn EventCache + 'static)> {
        self.cache.as_deref_mut()
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    // ── Cache delegation ─────────────────────────────────────────────

    /// Hand a retired event to the cache, or drop it if none is configured.
    pub fn recycle_event(&mut self, event: Box<dyn Event>) {
        if let Some(cache) = self.cache.as_mut() {
            cache.recycle(event);
        }
    }

    /// A pooled instance of `kind`; never allocates.
    pub fn get_event_or_none(&mut self, kind: EventKind) -> Option<Box<dyn Event>> {
        self.cache.as_mut()?.acquire_or_none(kind)
    }

    /// A pooled instance of `kind`, otherwise a fresh one. `None` only for
    /// kinds that cannot be constructed.
    pub fn get_event(&mut self, kind: EventKind) -> Option<Box<dyn Event>> {
        match self.cache.as_mut() {
            Some(cache) => cache.acquire(kind, &self.registry),
            None => self.registry.construct(kind),
        }
    }

    /// [`get_event`](Self::get_event) downcast to its concrete type.
    pub fn get_typed_event<T: KindedEvent>(&mut self) -> Option<Box<T>> {
        self.get_event(T::KIND)?.into_any().downcast::<T>().ok()
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Execute the earliest pending event.
    ///
    /// Advances the clock to the event's time, runs it, enqueues its
    /// follow-up and recycles the executed instance. Returns the time of the
    /// executed event, or `None` if nothing was pending.
    ///
    /// The clock never moves backward: an event scheduled before the current
    /// time is executed at the current time instead, with a warning.
    pub fn step(&mut self) -> Option<SimTime> {
        let mut event = self.manager.poll_earliest()?;
        let mut time = event.time();
        if time < self.current_time {
            warn!(
                thread = self.thread_nr,
                event = %event.id(),
                scheduled = %time,
                now = %self.current_time,
                "non-causal event, executing at current time"
            );
            time = self.current_time;
            event.header_mut().time = time;
        }
        self.current_time = time;
        self.events_processed += 1;

        if let Some(next) = event.execute(self) {
            self.manager.add(next);
        }
        self.recycle_event(event);
        Some(time)
    }

    /// Execute events until the manager is empty. Returns the number of
    /// events executed by this call.
    pub fn run(&mut self) -> u64 {
        let start = self.events_processed;
        while self.step().is_some() {}
        self.events_processed - start
    }

    /// Execute at most `max_steps` events.
    pub fn run_for(&mut self, max_steps: u64) -> u64 {
        let start = self.events_processed;
        for _ in 0..max_steps {
            if self.step().is_none() {
                break;
            }
        }
        self.events_processed - start
    }

    pub fn is_finished(&self) -> bool {
        self.manager.is_empty()
    }

    // ── Clock & counters ─────────────────────────────────────────────

    /// Time of the most recently executed event.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Index of the simulated day in progress.
    pub fn current_day(&self) -> u64 {
        self.current_day
    }

    pub fn thread_nr(&self) -> usize {
        self.thread_nr
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Whether the replication is still in its warm-up phase.
    pub fn is_warm_up(&self) -> bool {
        self.warm_up
    }

    pub fn set_warm_up(&mut self, warm_up: bool) {
        self.warm_up = warm_up;
    }

    // ── Day lifecycle ────────────────────────────────────────────────

    /// Prepare simulated day `day`: the clock restarts at zero.
    pub fn begin_day(&mut self, day: u64) {
        self.current_day = day;
        self.current_time = SimTime::ZERO;
    }

    /// Close the current day; events still pending are discarded.
    pub fn end_day(&mut self) {
        let leftover = self.manager.count();
        if leftover > 0 {
            debug!(thread = self.thread_nr, day = self.current_day, leftover, "discarding pending events");
            self.manager.clear();
        }
        self.current_time = SimTime::ZERO;
    }

    /// Release everything at the end of the replication: pooled events,
    /// pending events and the log sink.
    pub fn final_clean_up(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
        self.manager.clear();
        self.disable_logging();
    }

    // ── Logging ──────────────────────────────────────────────────────

    /// Attach a log sink, closing any previous one.
    ///
    /// Returns whether logging is now active: a sink that is not ready is
    /// dropped and leaves logging inactive.
    pub fn activate_logging(&mut self, logger: Box<dyn SimLogger>) -> bool {
        self.disable_logging();
        if logger.is_ready() {
            self.logger = Some(logger);
        }
        self.logging_active()
    }

    /// Detach and close the log sink.
    pub fn disable_logging(&mut self) {
        if let Some(mut old) = self.logger.take() {
            old.done();
        }
    }

    /// Whether log lines are currently being recorded.
    pub fn logging_active(&self) -> bool {
        self.logger.is_some() && !self.logging_paused.load(Ordering::Relaxed)
    }

    /// Record what `event` did at `station`.
    ///
    /// Returns `true` when logging is inactive (nothing to do) and otherwise
    /// whether the sink stored the line.
    pub fn log_event_execution(&mut self, event: &str, station: Option<u32>, info: &str) -> bool {
        if self.logging_paused.load(Ordering::Relaxed) {
            return true;
        }
        let Some(logger) = self.logger.as_mut() else {
            return true;
        };
        logger.write(&LogEntry {
            time: self.current_time,
            thread_nr: self.thread_nr,
            event: event.to_owned(),
            station,
            info: info.to_owned(),
        })
    }

    // ── Formatting ───────────────────────────────────────────────────

    /// See [`time::format_sim_time`].
    pub fn format_sim_time(ms: u64) -> String {
        time::format_sim_time(ms)
    }

    /// See [`time::format_sim_date_time`].
    pub fn format_sim_date_time(ms: u64) -> String {
        time::format_sim_date_time(ms)
    }

    /// Short token identifying an object in log lines: `"0"` for none,
    /// otherwise its address in hex.
    pub fn format_object_id<T: ?Sized>(obj: Option<&T>) -> String {
        match obj {
            None => "0".to_owned(),
            Some(r) => format!("{:x}", r as *const T as *const () as usize),
        }
    }
}

impl fmt::Debug for SimData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimData")
            .field("thread_nr", &self.thread_nr)
            .field("current_time", &self.current_time)
            .field("events_processed", &self.events_processed)
            .field("current_day", &self.current_day)
            .field("manager", &self.manager.name())
            .field("cache", &self.cache.as_ref().map(|c| c.name()))
            .field("logging", &self.logger.is_some())
            .finish()
    }
}
