//! Simulator configuration.

use std::num::NonZeroUsize;
use std::thread;

use crate::error::{SimError, SimResult};
use crate::event_cache::EventCacheKind;
use crate::event_manager::EventManagerKind;

/// How many replications to run and with which strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct SimulatorConfig {
    /// Independent replications, one worker thread each.
    pub thread_count: usize,
    /// Simulated days each replication runs back to back.
    pub days_per_thread: u64,
    pub event_manager: EventManagerKind,
    pub event_cache: EventCacheKind,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            thread_count: 1,
            days_per_thread: 1,
            event_manager: EventManagerKind::default(),
            event_cache: EventCacheKind::default(),
        }
    }
}

impl SimulatorConfig {
    /// One replication per available core, capped at `max_threads`.
    ///
    /// `more_threads` adds one thread beyond the core count.
    pub fn auto(max_threads: usize, more_threads: bool) -> Self {
        let cores = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let wanted = cores + usize::from(more_threads);
        SimulatorConfig {
            thread_count: wanted.min(max_threads).max(1),
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_days(mut self, days_per_thread: u64) -> Self {
        self.days_per_thread = days_per_thread;
        self
    }

    pub fn with_event_manager(mut self, kind: EventManagerKind) -> Self {
        self.event_manager = kind;
        self
    }

    pub fn with_event_cache(mut self, kind: EventCacheKind) -> Self {
        self.event_cache = kind;
        self
    }

    /// Total simulated days over all replications.
    pub fn total_days(&self) -> u64 {
        self.days_per_thread * self.thread_count as u64
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.thread_count == 0 {
            return Err(SimError::InvalidThreadCount);
        }
        if self.days_per_thread == 0 {
            return Err(SimError::InvalidDayCount);
        }
        Ok(())
    }
}
