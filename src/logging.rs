//! Model log sinks.
//!
//! Events report what they did through
//! [`SimData::log_event_execution`](crate::sim_data::SimData::log_event_execution),
//! which hands a [`LogEntry`] to the replication's [`SimLogger`]. The core
//! only relies on two things from a sink: whether it is ready, and whether a
//! write succeeded. Everything else (file formats, callbacks) is up to the
//! sink.
//!
//! Replications never share a sink directly. To collect lines from several
//! threads into one destination, wrap the destination in a [`SharedLog`]:
//! one writer thread owns it and every replication gets a cheap
//! [`SharedLogHandle`] that forwards entries over a channel.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, warn};

use crate::error::{SimError, SimResult};
use crate::time::{format_sim_time, SimTime};

// ── Log entry ────────────────────────────────────────────────────────

/// One model log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Simulation clock when the line was written.
    pub time: SimTime,
    /// Replication that wrote it.
    pub thread_nr: usize,
    /// Name of the event that caused the line.
    pub event: String,
    /// Station the event happened at, if any.
    pub station: Option<u32>,
    pub info: String,
}

/// Tab-separated: `time  thread  event  station  info`, with `-` for no
/// station.
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}\t", format_sim_time(self.time.millis()), self.thread_nr, self.event)?;
        match self.station {
            Some(s) => write!(f, "{}", s)?,
            None => f.write_str("-")?,
        }
        write!(f, "\t{}", self.info)
    }
}

// ── SimLogger trait ──────────────────────────────────────────────────

pub trait SimLogger: Send {
    /// Whether the sink can accept lines (e.g. its file opened).
    fn is_ready(&self) -> bool;

    /// Write one entry. Returns `false` if the line was not stored.
    fn write(&mut self, entry: &LogEntry) -> bool;

    /// Flush and close. Called once when the sink is detached.
    fn done(&mut self) {}
}

// ── CallbackLogger ───────────────────────────────────────────────────

/// Forwards every entry to a closure.
pub struct CallbackLogger {
    callback: Box<dyn FnMut(&LogEntry) + Send>,
}

impl CallbackLogger {
    pub fn new(callback: impl FnMut(&LogEntry) + Send + 'static) -> Self {
        CallbackLogger {
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for CallbackLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackLogger").finish_non_exhaustive()
    }
}

impl SimLogger for CallbackLogger {
    fn is_ready(&self) -> bool {
        true
    }

    fn write(&mut self, entry: &LogEntry) -> bool {
        (self.callback)(entry);
        true
    }
}

// ── MemoryLogger ─────────────────────────────────────────────────────

/// Append-only in-memory log.
///
/// Clones share the same buffer, so a caller can keep one handle while the
/// replication owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded entries rendered as lines.
    pub fn lines(&self) -> Vec<String> {
        self.entries().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every entry as one line to `w`.
    pub fn export<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for entry in self.entries() {
            writeln!(w, "{}", entry)?;
        }
        Ok(())
    }
}

impl SimLogger for MemoryLogger {
    fn is_ready(&self) -> bool {
        true
    }

    fn write(&mut self, entry: &LogEntry) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        true
    }
}

// ── PlainTextLogger ──────────────────────────────────────────────────

/// Writes one line per entry to a file or any other writer.
pub struct PlainTextLogger {
    out: Option<Box<dyn Write + Send>>,
}

impl PlainTextLogger {
    /// Create (truncate) `path`. The logger is not ready if the path is
    /// empty or the file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return PlainTextLogger { out: None };
        }
        let out = match File::create(path) {
            Ok(file) => Some(Box::new(BufWriter::new(file)) as Box<dyn Write + Send>),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open log file");
                None
            }
        };
        PlainTextLogger { out }
    }

    pub fn from_writer(w: impl Write + Send + 'static) -> Self {
        PlainTextLogger {
            out: Some(Box::new(w)),
        }
    }
}

impl fmt::Debug for PlainTextLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainTextLogger")
            .field("ready", &self.out.is_some())
            .finish()
    }
}

impl SimLogger for PlainTextLogger {
    fn is_ready(&self) -> bool {
        self.out.is_some()
    }

    fn write(&mut self, entry: &LogEntry) -> bool {
        match self.out.as_mut() {
            Some(out) => writeln!(out, "{}", entry).is_ok(),
            None => false,
        }
    }

    fn done(&mut self) {
        if let Some(mut out) = self.out.take() {
            if let Err(e) = out.flush() {
                warn!(error = %e, "flushing log file failed");
            }
        }
    }
}

// ── LimitedPlainTextLogger ───────────────────────────────────────────

/// A [`PlainTextLogger`] that stops after `max_lines` lines.
#[derive(Debug)]
pub struct LimitedPlainTextLogger {
    inner: PlainTextLogger,
    max_lines: usize,
    written: usize,
}

impl LimitedPlainTextLogger {
    pub fn open(path: impl AsRef<Path>, max_lines: usize) -> Self {
        Self::wrap(PlainTextLogger::open(path), max_lines)
    }

    pub fn wrap(inner: PlainTextLogger, max_lines: usize) -> Self {
        LimitedPlainTextLogger {
            inner,
            max_lines,
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl SimLogger for LimitedPlainTextLogger {
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn write(&mut self, entry: &LogEntry) -> bool {
        if self.written >= self.max_lines {
            return false;
        }
        let ok = self.inner.write(entry);
        if ok {
            self.written += 1;
        }
        ok
    }

    fn done(&mut self) {
        self.inner.done();
    }
}

// ── SharedLog ────────────────────────────────────────────────────────

/// What travels over the shared channel.
#[derive(Debug)]
enum LogMessage {
    Entry(LogEntry),
    Shutdown,
}

/// A sink owned by a dedicated writer thread.
///
/// All handles send entries over one unbounded channel; the writer applies
/// them in arrival order, so lines from different replications never
/// interleave within a line. [`finish`](SharedLog::finish) or dropping the
/// log queues a shutdown message: entries sent before it are still written,
/// and handles that outlive the writer fail their writes.
pub struct SharedLog<L: SimLogger + 'static> {
    tx: Option<Sender<LogMessage>>,
    writer: Option<JoinHandle<L>>,
    idle: Option<L>,
}

impl<L: SimLogger + 'static> SharedLog<L> {
    /// Start the writer thread. A sink that is not ready gets no thread and
    /// hands out handles that are not ready either.
    pub fn spawn(sink: L) -> SimResult<Self> {
        if !sink.is_ready() {
            return Ok(SharedLog {
                tx: None,
                writer: None,
                idle: Some(sink),
            });
        }
        let (tx, rx) = unbounded::<LogMessage>();
        let writer = thread::Builder::new()
            .name("simcore-log".into())
            .spawn(move || {
                let mut sink = sink;
                let mut lines = 0u64;
                while let Ok(LogMessage::Entry(entry)) = rx.recv() {
                    if sink.write(&entry) {
                        lines += 1;
                    }
                }
                sink.done();
                debug!(lines, "log writer finished");
                sink
            })
            .map_err(|e| SimError::SpawnFailed {
                role: "log writer",
                index: 0,
                message: e.to_string(),
            })?;
        Ok(SharedLog {
            tx: Some(tx),
            writer: Some(writer),
            idle: None,
        })
    }

    /// A new sending handle.
    pub fn handle(&self) -> SharedLogHandle {
        SharedLogHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.tx.is_some()
    }

    fn shut_down(&mut self) -> Option<thread::Result<L>> {
        if let Some(tx) = self.tx.take() {
            // Fails only if the writer is already gone.
            let _ = tx.send(LogMessage::Shutdown);
        }
        self.writer.take().map(JoinHandle::join)
    }

    /// Stop the writer once it has drained everything sent so far, and
    /// return the sink.
    pub fn finish(mut self) -> SimResult<L> {
        if let Some(sink) = self.idle.take() {
            return Ok(sink);
        }
        match self.shut_down() {
            Some(joined) => joined.map_err(|payload| SimError::WorkerPanicked {
                thread: 0,
                message: crate::simulator::panic_message(payload.as_ref()),
            }),
            None => Err(SimError::AlreadyFinalized),
        }
    }
}

impl<L: SimLogger + 'static> Drop for SharedLog<L> {
    fn drop(&mut self) {
        if let Some(Err(payload)) = self.shut_down() {
            warn!(
                message = %crate::simulator::panic_message(payload.as_ref()),
                "log writer panicked"
            );
        }
    }
}

impl<L: SimLogger + 'static> fmt::Debug for SharedLog<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLog")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Sending side of a [`SharedLog`].
#[derive(Debug, Clone)]
pub struct SharedLogHandle {
    tx: Option<Sender<LogMessage>>,
}

impl SimLogger for SharedLogHandle {
    fn is_ready(&self) -> bool {
        self.tx.is_some()
    }

    fn write(&mut self, entry: &LogEntry) -> bool {
        match &self.tx {
            Some(tx) => tx.send(LogMessage::Entry(entry.clone())).is_ok(),
            None => false,
        }
    }

    fn done(&mut self) {
        self.tx = None;
    }
}
