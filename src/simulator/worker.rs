//! One replication thread and the control block it shares with the
//! orchestrator.
//!
//! The control word is an atomic the worker reads once per event, without
//! locking, while running. Only when paused does the worker take the gate
//! mutex and block on a condition variable until it is resumed, cancelled
//! or granted a single step.
//!
//! Every writer of the control word stores the new value first and then
//! notifies while holding the gate lock; the worker re-reads the word under
//! the same lock before waiting, so no wake-up is lost.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::builder::Factories;
use crate::sim_data::SimData;

pub(crate) const RUNNING: u8 = 0;
pub(crate) const PAUSED: u8 = 1;
pub(crate) const CANCELLED: u8 = 2;

#[derive(Debug, Default)]
struct Gate {
    /// Single steps granted but not yet taken.
    step_permits: u64,
    /// Single steps taken since start.
    steps_taken: u64,
    /// The worker is blocked waiting for a turn.
    parked: bool,
    /// The worker thread has exited (normally or by panic).
    finished: bool,
}

/// State shared between one worker thread and the orchestrator.
#[derive(Debug)]
pub(crate) struct WorkerShared {
    pub nr: usize,
    control: AtomicU8,
    gate: Mutex<Gate>,
    /// Worker waits here for a turn.
    wake: Condvar,
    /// Orchestrator waits here for step completion, parking or exit.
    ack: Condvar,

    pub events_processed: AtomicU64,
    pub queue_length: AtomicUsize,
    pub days_done: AtomicU64,
    pub logging_paused: Arc<AtomicBool>,
}

/// What the worker may do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    Run,
    Step,
    Stop,
}

impl WorkerShared {
    pub fn new(nr: usize) -> Self {
        WorkerShared {
            nr,
            control: AtomicU8::new(RUNNING),
            gate: Mutex::new(Gate::default()),
            wake: Condvar::new(),
            ack: Condvar::new(),
            events_processed: AtomicU64::new(0),
            queue_length: AtomicUsize::new(0),
            days_done: AtomicU64::new(0),
            logging_paused: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock_gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn control(&self) -> u8 {
        self.control.load(Ordering::Acquire)
    }

    /// Store a new control word and wake everyone waiting on this worker.
    ///
    /// `CANCELLED` is sticky: once stored it is never overwritten.
    pub fn set_control(&self, word: u8) {
        let mut gate = self.lock_gate();
        let prev = self.control.load(Ordering::Acquire);
        if prev == CANCELLED {
            return;
        }
        self.control.store(word, Ordering::Release);
        if word == RUNNING {
            gate.step_permits = 0;
        }
        self.wake.notify_all();
        self.ack.notify_all();
    }

    pub fn is_finished(&self) -> bool {
        self.lock_gate().finished
    }

    // ── Orchestrator side ────────────────────────────────────────────

    /// Allow one more event while paused. Returns the step count to wait
    /// for, or `None` if the worker has already exited.
    pub fn grant_step(&self) -> Option<u64> {
        let mut gate = self.lock_gate();
        if gate.finished {
            return None;
        }
        gate.step_permits += 1;
        let target = gate.steps_taken + gate.step_permits;
        self.wake.notify_all();
        Some(target)
    }

    /// Block until `target` single steps were taken, or the worker can no
    /// longer take them (exited, resumed or cancelled).
    pub fn wait_for_steps(&self, target: u64) {
        let mut gate = self.lock_gate();
        while gate.steps_taken < target && !gate.finished && self.control() == PAUSED {
            gate = self.ack.wait(gate).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the worker is parked between events or has exited.
    pub fn wait_until_parked(&self) {
        let mut gate = self.lock_gate();
        while !gate.parked && !gate.finished && self.control() == PAUSED {
            gate = self.ack.wait(gate).unwrap_or_else(PoisonError::into_inner);
        }
    }

    // ── Worker side ──────────────────────────────────────────────────

    fn await_turn(&self) -> Turn {
        match self.control() {
            RUNNING => return Turn::Run,
            CANCELLED => return Turn::Stop,
            _ => {}
        }
        let mut gate = self.lock_gate();
        loop {
            let turn = match self.control() {
                RUNNING => Some(Turn::Run),
                CANCELLED => Some(Turn::Stop),
                _ if gate.step_permits > 0 => {
                    gate.step_permits -= 1;
                    Some(Turn::Step)
                }
                _ => None,
            };
            if let Some(turn) = turn {
                gate.parked = false;
                return turn;
            }
            if !gate.parked {
                gate.parked = true;
                self.ack.notify_all();
            }
            gate = self.wake.wait(gate).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn step_done(&self) {
        let mut gate = self.lock_gate();
        gate.steps_taken += 1;
        self.ack.notify_all();
    }

    fn mark_finished(&self) {
        self.queue_length.store(0, Ordering::Relaxed);
        let mut gate = self.lock_gate();
        gate.finished = true;
        gate.parked = false;
        self.ack.notify_all();
    }
}

/// Marks the worker finished on every exit path, panics included.
struct FinishGuard<'a>(&'a WorkerShared);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.mark_finished();
    }
}

/// What a worker hands back when its thread is joined.
#[derive(Debug)]
pub(crate) struct WorkerReport {
    pub data: SimData,
    pub runtime: Duration,
}

/// Body of one replication thread.
pub(crate) fn run_worker(
    shared: Arc<WorkerShared>,
    factories: Factories,
    thread_count: usize,
    days: u64,
) -> WorkerReport {
    let started = Instant::now();
    let _finish = FinishGuard(&shared);
    let nr = shared.nr;

    let mut data = SimData::new((factories.manager)(), (factories.cache)(), nr, thread_count)
        .with_registry(Arc::clone(&factories.registry))
        .with_logging_switch(Arc::clone(&shared.logging_paused));
    debug!(thread = nr, manager = data.event_manager().name(), "worker started");

    for day in 0..days {
        if shared.control() == CANCELLED {
            break;
        }
        data.begin_day(day);
        for event in (factories.initial)(&mut data, nr) {
            data.schedule(event);
        }
        shared
            .queue_length
            .store(data.event_manager().count(), Ordering::Relaxed);

        let completed = drive(&shared, &mut data);
        data.end_day();
        if !completed {
            break;
        }
        shared.days_done.fetch_add(1, Ordering::Relaxed);
        trace!(thread = nr, day, "day completed");
    }

    data.final_clean_up();
    let runtime = started.elapsed();
    debug!(
        thread = nr,
        events = data.events_processed(),
        runtime_ms = runtime.as_millis() as u64,
        "worker finished"
    );
    WorkerReport { data, runtime }
}

/// Execute events of the current day. Returns `false` if cancelled before
/// the manager drained.
fn drive(shared: &WorkerShared, data: &mut SimData) -> bool {
    loop {
        if data.event_manager().is_empty() {
            return true;
        }
        let turn = shared.await_turn();
        if turn == Turn::Stop {
            debug!(thread = shared.nr, pending = data.event_manager().count(), "worker cancelled");
            return false;
        }
        data.step();
        shared
            .events_processed
            .store(data.events_processed(), Ordering::Relaxed);
        shared
            .queue_length
            .store(data.event_manager().count(), Ordering::Relaxed);
        if turn == Turn::Step {
            shared.step_done();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancel_is_sticky() {
        let w = WorkerShared::new(0);
        w.set_control(CANCELLED);
        w.set_control(RUNNING);
        assert_eq!(w.control(), CANCELLED);
    }

    #[test]
    fn test_paused_worker_takes_granted_step() {
        let w = Arc::new(WorkerShared::new(0));
        w.set_control(PAUSED);
        let worker = {
            let w = Arc::clone(&w);
            thread::spawn(move || {
                let turn = w.await_turn();
                w.step_done();
                turn
            })
        };
        w.wait_until_parked();
        let target = w.grant_step().unwrap();
        w.wait_for_steps(target);
        assert_eq!(worker.join().unwrap(), Turn::Step);
    }

    #[test]
    fn test_resume_releases_parked_worker() {
        let w = Arc::new(WorkerShared::new(0));
        w.set_control(PAUSED);
        let worker = {
            let w = Arc::clone(&w);
            thread::spawn(move || w.await_turn())
        };
        w.wait_until_parked();
        w.set_control(RUNNING);
        assert_eq!(worker.join().unwrap(), Turn::Run);
    }

    #[test]
    fn test_finish_guard_marks_finished_on_panic() {
        let w = Arc::new(WorkerShared::new(0));
        w.queue_length.store(5, Ordering::Relaxed);
        let r = {
            let w = Arc::clone(&w);
            thread::spawn(move || {
                let _g = FinishGuard(&w);
                panic!("event failed");
            })
            .join()
        };
        assert!(r.is_err());
        assert!(w.is_finished());
        assert_eq!(w.queue_length.load(Ordering::Relaxed), 0);
        assert!(w.grant_step().is_none());
    }
}
