//! # simcore: Discrete-Event Simulation Core
//!
//! The engine underneath a queueing simulator: ordered event containers,
//! pools of retired events, a per-replication context, and an orchestrator
//! that runs independent replications of one model on parallel threads.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   Simulator                    │ ← start/pause/step/cancel
//! │  ┌──────────────────┐   ┌──────────────────┐  │
//! │  │ worker 0         │   │ worker n-1       │  │ ← one thread per replication
//! │  │ ┌──────────────┐ │   │ ┌──────────────┐ │  │
//! │  │ │   SimData    │ │...│ │   SimData    │ │  │ ← clock, counters, log sink
//! │  │ │ ┌──────────┐ │ │   │ │ ┌──────────┐ │ │  │
//! │  │ │ │ Manager  │ │ │   │ │ │ Manager  │ │ │  │ ← pending events, time order
//! │  │ │ ├──────────┤ │ │   │ │ ├──────────┤ │ │  │
//! │  │ │ │  Cache   │ │ │   │ │ │  Cache   │ │ │  │ ← retired events per kind
//! │  │ │ └──────────┘ │ │   │ │ └──────────┘ │ │  │
//! │  │ └──────────────┘ │   │ └──────────────┘ │  │
//! │  └──────────────────┘   └──────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Nothing on the scheduling path is shared between replications. The only
//! optional shared resources are a [`LockedEventCache`] and a [`SharedLog`]
//! writer thread.

pub mod error;
pub mod event;
pub mod event_cache;
pub mod event_manager;
pub mod logging;
pub mod registry;
pub mod sim_data;
pub mod simulator;
pub mod time;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience.
pub use error::{SimError, SimResult};
pub use event::{Event, EventHeader, EventId, EventIdGen, EventKey, EventKind, KindedEvent};
pub use event_cache::{
    AssociativeEventCache, EventCache, EventCacheKind, HashMapEventCache, ListEventCache,
    LockedEventCache, NoEventCache,
};
pub use event_manager::{
    BatchSortedVecEventManager, EventManager, EventManagerKind, HeapEventManager,
    LongRunHeapEventManager, LongRunSortedVecEventManager, MapEventManager,
    MultiHeapEventManager, SortedVecEventManager,
};
pub use logging::{
    CallbackLogger, LimitedPlainTextLogger, LogEntry, MemoryLogger, PlainTextLogger, SharedLog,
    SharedLogHandle, SimLogger,
};
pub use registry::EventRegistry;
pub use sim_data::SimData;
pub use simulator::{
    CancelHandle, Simulator, SimulatorBuilder, SimulatorConfig, SimulatorState, SimulatorStats,
};
pub use time::SimTime;
