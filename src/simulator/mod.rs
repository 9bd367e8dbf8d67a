//! Multi-threaded replication orchestrator.
//!
//! A [`Simulator`] runs `thread_count` independent replications of the same
//! model, one worker thread each. Every worker owns its own [`SimData`]
//! (event manager, cache, clock), so nothing on the scheduling path is
//! shared between threads.
//!
//! ```text
//!   Created ──start──▶ Running ◀──resume── Paused
//!                         │  ──pause──────▶  │ ──step──▶ (one event each)
//!                         └────────┬─────────┘
//!                            finalize_run
//!                                  ▼
//!                              Finalized
//!
//!   cancel: Created | Running | Paused ──▶ Cancelled (terminal)
//! ```
//!
//! Workers check a per-thread control word between events, never during
//! one, so pause, step and cancel all take effect at event boundaries.

mod builder;
mod config;
mod stats;
mod worker;


use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

pub use builder::{CacheFactory, InitialEvents, ManagerFactory, SimulatorBuilder};
pub use config::SimulatorConfig;
pub use stats::{SimulatorState, SimulatorStats};

use builder::Factories;
use worker::{run_worker, WorkerReport, WorkerShared, CANCELLED, PAUSED, RUNNING};

use crate::error::{SimError, SimResult};
use crate::event::Event;
use crate::sim_data::SimData;

/// Flags readable from outside the owning `Simulator`.
#[derive(Debug, Default)]
struct RunFlags {
    cancelled: AtomicBool,
    finalized: AtomicBool,
}

// ── Simulator ────────────────────────────────────────────────────────

pub struct Simulator {
    config: SimulatorConfig,
    factories: Factories,
    workers: Vec<Arc<WorkerShared>>,
    handles: Vec<Option<JoinHandle<WorkerReport>>>,
    /// Per-replication data, filled in as workers are joined.
    data: Vec<Option<SimData>>,
    thread_runtimes: Vec<Duration>,
    flags: Arc<RunFlags>,
    started: bool,
    paused: bool,
    start_instant: Option<Instant>,
    run_time: Option<Duration>,
}

impl Simulator {
    pub fn builder() -> SimulatorBuilder {
        SimulatorBuilder::new()
    }

    /// Simulator with the built-in strategies named in `config`.
    pub fn new<F>(config: SimulatorConfig, initial_events: F) -> SimResult<Self>
    where
        F: Fn(&mut SimData, usize) -> Vec<Box<dyn Event>> + Send + Sync + 'static,
    {
        SimulatorBuilder::new()
            .config(config)
            .initial_events(initial_events)
            .build()
    }

    pub(crate) fn from_parts(config: SimulatorConfig, factories: Factories) -> Self {
        let n = config.thread_count;
        Simulator {
            workers: (0..n).map(|nr| Arc::new(WorkerShared::new(nr))).collect(),
            handles: Vec::with_capacity(n),
            data: (0..n).map(|_| None).collect(),
            thread_runtimes: vec![Duration::ZERO; n],
            flags: Arc::new(RunFlags::default()),
            started: false,
            paused: false,
            start_instant: None,
            run_time: None,
            config,
            factories,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Launch one worker per replication.
    ///
    /// With `resume_existing`, calling this on an already started simulator
    /// resumes it instead of failing. With `start_paused`, workers set up
    /// their initial events and then wait for [`step_execution`] or
    /// [`resume_execution`].
    ///
    /// [`step_execution`]: Self::step_execution
    /// [`resume_execution`]: Self::resume_execution
    pub fn start(&mut self, resume_existing: bool, start_paused: bool) -> SimResult<()> {
        self.ensure_live()?;
        if self.started {
            if !resume_existing {
                return Err(SimError::AlreadyStarted);
            }
            return if self.paused {
                self.resume_execution()
            } else {
                Ok(())
            };
        }

        let word = if start_paused { PAUSED } else { RUNNING };
        for w in &self.workers {
            w.set_control(word);
        }
        self.start_instant = Some(Instant::now());

        for nr in 0..self.workers.len() {
            let worker = Arc::clone(&self.workers[nr]);
            let factories = self.factories.clone();
            let thread_count = self.config.thread_count;
            let days = self.config.days_per_thread;
            let spawned = thread::Builder::new()
                .name(format!("simcore-worker-{nr}"))
                .spawn(move || run_worker(worker, factories, thread_count, days));
            match spawned {
                Ok(handle) => self.handles.push(Some(handle)),
                Err(e) => {
                    warn!(thread = nr, error = %e, "failed to spawn worker");
                    self.cancel();
                    self.join_workers();
                    return Err(SimError::SpawnFailed {
                        role: "worker",
                        index: nr,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.started = true;
        self.paused = start_paused;
        info!(
            threads = self.config.thread_count,
            days = self.config.days_per_thread,
            manager = %self.config.event_manager,
            cache = %self.config.event_cache,
            paused = start_paused,
            "simulation started"
        );
        Ok(())
    }

    /// Ask every worker to stop after its current event.
    pub fn pause_execution(&mut self) -> SimResult<()> {
        self.ensure_started()?;
        if !self.paused {
            for w in &self.workers {
                w.set_control(PAUSED);
            }
            self.paused = true;
            debug!("simulation paused");
        }
        Ok(())
    }

    /// Like [`pause_execution`](Self::pause_execution), but returns only
    /// once every worker is actually parked (or finished).
    pub fn pause_execution_and_wait(&mut self) -> SimResult<()> {
        self.pause_execution()?;
        for w in &self.workers {
            w.wait_until_parked();
        }
        Ok(())
    }

    /// Let each paused worker execute exactly one event.
    ///
    /// Returns how many workers were granted a step; finished workers are
    /// skipped. With `wait`, blocks until those steps were taken.
    pub fn step_execution(&mut self, wait: bool) -> SimResult<usize> {
        self.ensure_started()?;
        if !self.paused {
            return Err(SimError::NotPaused);
        }
        let granted: Vec<(&WorkerShared, u64)> = self
            .workers
            .iter()
            .filter_map(|w| w.grant_step().map(|target| (w.as_ref(), target)))
            .collect();
        if wait {
            for (w, target) in &granted {
                w.wait_for_steps(*target);
            }
        }
        Ok(granted.len())
    }

    pub fn resume_execution(&mut self) -> SimResult<()> {
        self.ensure_started()?;
        if !self.paused {
            return Err(SimError::NotPaused);
        }
        for w in &self.workers {
            w.set_control(RUNNING);
        }
        self.paused = false;
        debug!("simulation resumed");
        Ok(())
    }

    /// Block until every worker has drained its event manager (or observed
    /// a cancel) and collect the per-replication results.
    ///
    /// A paused simulator is resumed first. Calling this again is a no-op.
    /// If a worker panicked, the other replications are still collected and
    /// the first panic is reported.
    pub fn finalize_run(&mut self) -> SimResult<()> {
        if !self.started {
            return Err(SimError::NotStarted);
        }
        if self.is_finalized() {
            return Ok(());
        }
        if self.paused && !self.is_cancelled() {
            for w in &self.workers {
                w.set_control(RUNNING);
            }
        }
        self.paused = false;

        let failure = self.join_workers();
        self.flags.finalized.store(true, Ordering::Release);
        let run_time = self.start_instant.map(|s| s.elapsed()).unwrap_or_default();
        self.run_time = Some(run_time);
        info!(
            events = self.event_count(),
            run_time_ms = run_time.as_millis() as u64,
            cancelled = self.is_cancelled(),
            "simulation finalized"
        );
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Stop all workers at their next event boundary. Never fails; does
    /// nothing once the run is finalized.
    pub fn cancel(&self) {
        cancel_all(&self.flags, &self.workers);
    }

    /// A cloneable handle that can cancel this simulator from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flags: Arc::clone(&self.flags),
            workers: self.workers.clone(),
        }
    }

    /// Join every spawned worker. Returns the first panic, if any.
    fn join_workers(&mut self) -> Option<SimError> {
        let mut failure = None;
        for (nr, slot) in self.handles.iter_mut().enumerate() {
            let Some(handle) = slot.take() else {
                continue;
            };
            match handle.join() {
                Ok(report) => {
                    self.thread_runtimes[nr] = report.runtime;
                    self.data[nr] = Some(report.data);
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(thread = nr, %message, "worker panicked");
                    failure.get_or_insert(SimError::WorkerPanicked { thread: nr, message });
                }
            }
        }
        failure
    }

    fn ensure_live(&self) -> SimResult<()> {
        if self.is_cancelled() {
            return Err(SimError::Cancelled);
        }
        if self.is_finalized() {
            return Err(SimError::AlreadyFinalized);
        }
        Ok(())
    }

    fn ensure_started(&self) -> SimResult<()> {
        self.ensure_live()?;
        if !self.started {
            return Err(SimError::NotStarted);
        }
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Started, not finalized, and at least one worker still has work.
    pub fn is_running(&self) -> bool {
        self.started && !self.is_finalized() && self.workers.iter().any(|w| !w.is_finished())
    }

    pub fn is_paused(&self) -> bool {
        self.paused && !self.is_cancelled() && !self.is_finalized()
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.cancelled.load(Ordering::Acquire)
    }

    pub fn is_finalized(&self) -> bool {
        self.flags.finalized.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SimulatorState {
        if self.is_cancelled() {
            SimulatorState::Cancelled
        } else if !self.started {
            SimulatorState::Created
        } else if self.is_finalized() {
            SimulatorState::Finalized
        } else if self.paused {
            SimulatorState::Paused
        } else {
            SimulatorState::Running
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn thread_count(&self) -> usize {
        self.config.thread_count
    }

    /// Events executed so far, summed over all replications.
    pub fn event_count(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.events_processed.load(Ordering::Relaxed))
            .sum()
    }

    /// Events still pending, summed over all replications. Zero once every
    /// worker has finished.
    pub fn event_queue_length(&self) -> usize {
        self.workers
            .iter()
            .map(|w| w.queue_length.load(Ordering::Relaxed))
            .sum()
    }

    /// Wall-clock runtime of each replication. Zero for replications not
    /// yet joined.
    pub fn thread_runtimes(&self) -> Vec<Duration> {
        self.thread_runtimes.clone()
    }

    /// Wall-clock time since start, frozen once finalized.
    pub fn run_time(&self) -> Duration {
        match (self.run_time, self.start_instant) {
            (Some(total), _) => total,
            (None, Some(start)) => start.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    pub fn events_per_second(&self) -> u64 {
        let ms = (self.run_time().as_millis() as u64).max(1);
        self.event_count().saturating_mul(1000) / ms
    }

    /// Simulated days completed, summed over all replications.
    pub fn sim_day_count(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.days_done.load(Ordering::Relaxed))
            .sum()
    }

    pub fn stats(&self) -> SimulatorStats {
        let thread_runtimes_ms = if self.is_finalized() {
            self.thread_runtimes
                .iter()
                .map(|d| d.as_millis() as u64)
                .collect()
        } else {
            Vec::new()
        };
        SimulatorStats {
            state: self.state(),
            thread_count: self.thread_count(),
            events: self.event_count(),
            queue_length: self.event_queue_length(),
            sim_days: self.sim_day_count(),
            events_per_second: self.events_per_second(),
            run_time_ms: self.run_time().as_millis() as u64,
            thread_runtimes_ms,
        }
    }

    /// Data of replication `nr`, available once its worker was joined.
    pub fn sim_data(&self, nr: usize) -> Option<&SimData> {
        self.data.get(nr)?.as_ref()
    }

    // ── Logging ──────────────────────────────────────────────────────

    /// Suspend model logging in every replication.
    pub fn pause_logging(&self) {
        for w in &self.workers {
            w.logging_paused.store(true, Ordering::Relaxed);
        }
    }

    pub fn continue_logging(&self) {
        for w in &self.workers {
            w.logging_paused.store(false, Ordering::Relaxed);
        }
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        if self.handles.iter().any(Option::is_some) {
            self.cancel();
            for handle in self.handles.iter_mut().filter_map(Option::take) {
                let _ = handle.join();
            }
        }
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("events", &self.event_count())
            .finish_non_exhaustive()
    }
}

// ── CancelHandle ─────────────────────────────────────────────────────

/// Cancels a running [`Simulator`] from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flags: Arc<RunFlags>,
    workers: Vec<Arc<WorkerShared>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        cancel_all(&self.flags, &self.workers);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.cancelled.load(Ordering::Acquire)
    }
}

fn cancel_all(flags: &RunFlags, workers: &[Arc<WorkerShared>]) {
    if flags.finalized.load(Ordering::Acquire) {
        return;
    }
    if !flags.cancelled.swap(true, Ordering::AcqRel) {
        info!("simulation cancelled");
    }
    for w in workers {
        w.set_control(CANCELLED);
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
