//! Structured error types for the simulation core.
//!
//! The scheduling core itself never fails: deleting an absent event is a
//! no-op and an uninstantiable event kind yields `None`. Errors are reserved
//! for orchestration misuse (lifecycle violations), configuration problems
//! and worker failures.

use thiserror::Error;

use crate::event::EventKind;

/// The top-level error type for the simulation core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    // ── Lifecycle errors ──────────────────────────────────

    /// `start` was called on a simulator that is already running.
    #[error("simulator has already been started")]
    AlreadyStarted,

    /// An operation that needs running workers was called before `start`.
    #[error("simulator has not been started")]
    NotStarted,

    /// `step_execution` was called while the workers are not paused.
    #[error("single steps are only possible while the simulation is paused")]
    NotPaused,

    /// The simulator was cancelled; cancellation is terminal.
    #[error("simulator was cancelled")]
    Cancelled,

    /// The run has already been finalized.
    #[error("simulator has already been finalized")]
    AlreadyFinalized,

    // ── Worker errors ─────────────────────────────────────

    /// The operating system refused to spawn a thread.
    #[error("failed to spawn {role} thread {index}: {message}")]
    SpawnFailed {
        role: &'static str,
        index: usize,
        message: String,
    },

    /// A worker panicked while executing events. Other replications are
    /// unaffected.
    #[error("replication {thread} panicked: {message}")]
    WorkerPanicked { thread: usize, message: String },

    // ── Configuration errors ──────────────────────────────

    /// The configuration asks for zero worker threads.
    #[error("thread count must be at least 1")]
    InvalidThreadCount,

    /// The configuration asks for zero simulated days per thread.
    #[error("days per thread must be at least 1")]
    InvalidDayCount,

    /// No initial-event factory was supplied to the builder.
    #[error("no initial event factory configured")]
    MissingInitialEvents,

    /// An event kind was registered twice.
    #[error("event kind {0} is already registered")]
    DuplicateEventKind(EventKind),
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
