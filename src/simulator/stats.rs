//! Point-in-time snapshot of a simulator for reporting.

use std::fmt;

/// Coarse lifecycle state of a [`Simulator`](super::Simulator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SimulatorState {
    /// Built, not yet started.
    Created,
    /// Workers are executing events.
    Running,
    /// Workers are blocked between events.
    Paused,
    /// `finalize_run` completed.
    Finalized,
    /// `cancel` was called. Terminal.
    Cancelled,
}

impl fmt::Display for SimulatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimulatorState::Created => "created",
            SimulatorState::Running => "running",
            SimulatorState::Paused => "paused",
            SimulatorState::Finalized => "finalized",
            SimulatorState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Aggregate counters over all replications.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulatorStats {
    pub state: SimulatorState,
    pub thread_count: usize,
    /// Events executed, summed over replications.
    pub events: u64,
    /// Events still pending, summed over replications.
    pub queue_length: usize,
    /// Simulated days completed, summed over replications.
    pub sim_days: u64,
    pub events_per_second: u64,
    /// Wall-clock time since start (or of the whole run once finalized).
    pub run_time_ms: u64,
    /// Per-replication wall-clock runtimes; empty until finalized.
    pub thread_runtimes_ms: Vec<u64>,
}

impl SimulatorStats {
    /// Pretty-printed JSON.
    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".into())
    }
}

impl fmt::Display for SimulatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} threads, {} events ({}/s), {} pending, {} days, {} ms [{}]",
            self.thread_count,
            self.events,
            self.events_per_second,
            self.queue_length,
            self.sim_days,
            self.run_time_ms,
            self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SimulatorStats {
        SimulatorStats {
            state: SimulatorState::Finalized,
            thread_count: 2,
            events: 6_000,
            queue_length: 0,
            sim_days: 2,
            events_per_second: 120_000,
            run_time_ms: 50,
            thread_runtimes_ms: vec![48, 50],
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "2 threads, 6000 events (120000/s), 0 pending, 2 days, 50 ms [finalized]"
        );
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_json_export() {
        let json = sample().to_json();
        assert!(json.contains("\"events\": 6000"));
        let back: SimulatorStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }
}
