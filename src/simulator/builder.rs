//! Fluent builder for a [`Simulator`].
//!
//! Collects the configuration and the per-thread factories, then validates
//! everything once in [`SimulatorBuilder::build`].
//!
//! ```rust
//! use simcore::simulator::SimulatorBuilder;
//! use simcore::event_manager::EventManagerKind;
//!
//! let sim = SimulatorBuilder::new()
//!     .threads(2)
//!     .event_manager(EventManagerKind::Map)
//!     .initial_events(|_data, _thread| Vec::new())
//!     .build()
//!     .unwrap();
//! assert_eq!(sim.thread_count(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use super::config::SimulatorConfig;
use super::Simulator;
use crate::error::{SimError, SimResult};
use crate::event::Event;
use crate::event_cache::{EventCache, EventCacheKind, LockedEventCache};
use crate::event_manager::{EventManager, EventManagerKind};
use crate::registry::EventRegistry;
use crate::sim_data::SimData;

/// Builds one event manager per replication.
pub type ManagerFactory = Arc<dyn Fn() -> Box<dyn EventManager> + Send + Sync>;

/// Builds the (optional) event cache of one replication.
pub type CacheFactory = Arc<dyn Fn() -> Option<Box<dyn EventCache>> + Send + Sync>;

/// Produces the initial events of one simulated day for replication
/// `thread`. May also schedule directly through the `SimData`.
pub type InitialEvents = Arc<dyn Fn(&mut SimData, usize) -> Vec<Box<dyn Event>> + Send + Sync>;

/// Everything a worker needs to set up its replication.
#[derive(Clone)]
pub(crate) struct Factories {
    pub manager: ManagerFactory,
    pub cache: CacheFactory,
    pub initial: InitialEvents,
    pub registry: Arc<EventRegistry>,
}

impl fmt::Debug for Factories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factories")
            .field("registry", &self.registry.len())
            .finish_non_exhaustive()
    }
}

// ── SimulatorBuilder ─────────────────────────────────────────────────

pub struct SimulatorBuilder {
    config: SimulatorConfig,
    manager: Option<ManagerFactory>,
    cache: Option<CacheFactory>,
    initial: Option<InitialEvents>,
    registry: Arc<EventRegistry>,
}

impl SimulatorBuilder {
    pub fn new() -> Self {
        SimulatorBuilder {
            config: SimulatorConfig::default(),
            manager: None,
            cache: None,
            initial: None,
            registry: Arc::new(EventRegistry::new()),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn threads(mut self, thread_count: usize) -> Self {
        self.config.thread_count = thread_count;
        self
    }

    pub fn days_per_thread(mut self, days: u64) -> Self {
        self.config.days_per_thread = days;
        self
    }

    // ── Event managers ────────────────────────────────────────

    /// Use one of the built-in strategies.
    pub fn event_manager(mut self, kind: EventManagerKind) -> Self {
        self.config.event_manager = kind;
        self.manager = None;
        self
    }

    /// Use a custom factory, called once per replication.
    pub fn event_manager_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn EventManager> + Send + Sync + 'static,
    {
        self.manager = Some(Arc::new(factory));
        self
    }

    // ── Event caches ──────────────────────────────────────────

    pub fn event_cache(mut self, kind: EventCacheKind) -> Self {
        self.config.event_cache = kind;
        self.cache = None;
        self
    }

    pub fn event_cache_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Option<Box<dyn EventCache>> + Send + Sync + 'static,
    {
        self.cache = Some(Arc::new(factory));
        self
    }

    /// Let every replication use handles to one shared, locked cache.
    pub fn shared_event_cache(self, cache: LockedEventCache) -> Self {
        self.event_cache_factory(move || Some(Box::new(cache.clone()) as Box<dyn EventCache>))
    }

    // ── Events ────────────────────────────────────────────────

    pub fn registry(mut self, registry: EventRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn shared_registry(mut self, registry: Arc<EventRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Initial-event factory, invoked in each worker once per simulated day.
    pub fn initial_events<F>(mut self, factory: F) -> Self
    where
        F: Fn(&mut SimData, usize) -> Vec<Box<dyn Event>> + Send + Sync + 'static,
    {
        self.initial = Some(Arc::new(factory));
        self
    }

    // ── Build ─────────────────────────────────────────────────

    pub fn build(self) -> SimResult<Simulator> {
        self.config.validate()?;
        let initial = self.initial.ok_or(SimError::MissingInitialEvents)?;
        let manager_kind = self.config.event_manager;
        let cache_kind = self.config.event_cache;
        let manager: ManagerFactory = match self.manager {
            Some(custom) => custom,
            None => Arc::new(move || manager_kind.create()),
        };
        let cache: CacheFactory = match self.cache {
            Some(custom) => custom,
            None => Arc::new(move || cache_kind.create()),
        };
        let factories = Factories {
            manager,
            cache,
            initial,
            registry: self.registry,
        };
        Ok(Simulator::from_parts(self.config, factories))
    }
}

impl Default for SimulatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SimulatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatorBuilder")
            .field("config", &self.config)
            .field("custom_manager", &self.manager.is_some())
            .field("custom_cache", &self.cache.is_some())
            .field("initial_events", &self.initial.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_manager::MapEventManager;

    #[test]
    fn test_build_requires_initial_events() {
        let err = SimulatorBuilder::new().build().unwrap_err();
        assert_eq!(err, SimError::MissingInitialEvents);
    }

    #[test]
    fn test_build_validates_config() {
        let err = SimulatorBuilder::new()
            .threads(0)
            .initial_events(|_, _| Vec::new())
            .build()
            .unwrap_err();
        assert_eq!(err, SimError::InvalidThreadCount);
    }

    #[test]
    fn test_default_factories_follow_config() {
        let sim = SimulatorBuilder::new()
            .threads(3)
            .days_per_thread(2)
            .event_manager(EventManagerKind::SortedVec)
            .event_cache(EventCacheKind::Disabled)
            .initial_events(|_, _| Vec::new())
            .build()
            .unwrap();
        assert_eq!(sim.thread_count(), 3);
        assert_eq!(sim.config().days_per_thread, 2);
        assert_eq!((sim.factories.manager)().name(), "sorted-vec");
        assert!((sim.factories.cache)().is_none());
    }

    #[test]
    fn test_custom_and_shared_factories() {
        let shared = LockedEventCache::new();
        let sim = SimulatorBuilder::new()
            .event_manager_factory(|| Box::new(MapEventManager::new()))
            .shared_event_cache(shared.clone())
            .initial_events(|_, _| Vec::new())
            .build()
            .unwrap();
        assert_eq!((sim.factories.manager)().name(), "map");
        let cache = (sim.factories.cache)().unwrap();
        assert_eq!(cache.name(), "locked-list");
        assert_eq!(shared.handles(), 3);
    }
}
