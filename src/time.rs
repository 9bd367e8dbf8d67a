//! Simulation clock values and their human-readable renderings.
//!
//! The clock counts milliseconds since the start of a simulated day. It
//! only advances when an event is executed; there is no relationship to
//! wall-clock time.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// A point on the simulation clock, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(u64);

impl SimTime {
    /// The zero-point of simulation time.
    pub const ZERO: SimTime = SimTime(0);

    /// Create a `SimTime` from a raw millisecond value.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        SimTime(ms)
    }

    /// Create a `SimTime` from whole seconds.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs * MS_PER_SECOND)
    }

    /// Return the raw millisecond value.
    #[inline]
    pub const fn millis(self) -> u64 {
        self.0
    }

    /// Time `delay` milliseconds after `self`, or `None` on overflow.
    #[inline]
    pub fn plus(self, delay: u64) -> Option<SimTime> {
        self.0.checked_add(delay).map(SimTime)
    }

    /// Milliseconds elapsed since `earlier`, or `None` if `earlier` is later.
    #[inline]
    pub fn duration_since(self, earlier: SimTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// Number of complete simulated days contained in this time.
    #[inline]
    pub fn whole_days(self) -> u64 {
        self.0 / MS_PER_DAY
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_sim_time(self.0))
    }
}

impl From<u64> for SimTime {
    fn from(ms: u64) -> Self {
        SimTime(ms)
    }
}

/// Render a clock value as `HH:MM:SS,mmm`.
///
/// Once the value reaches one simulated day a day counter is prepended:
/// `D:HH:MM:SS,mmm`. Hours wrap at 24 in that form.
pub fn format_sim_time(ms: u64) -> String {
    let mut out = String::with_capacity(16);
    let days = ms / MS_PER_DAY;
    if days > 0 {
        let _ = write!(out, "{}:", days);
    }
    let _ = write!(
        out,
        "{:02}:{:02}:{:02},{:03}",
        (ms / MS_PER_HOUR) % 24,
        (ms / MS_PER_MINUTE) % 60,
        (ms / MS_PER_SECOND) % 60,
        ms % MS_PER_SECOND
    );
    out
}

/// Render a clock value as an absolute UTC timestamp `yyyy-MM-dd HH:mm:ss`
/// anchored at the Unix epoch.
///
/// Values beyond the representable calendar range fall back to
/// [`format_sim_time`].
pub fn format_sim_date_time(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format_sim_time(ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sim_time_below_one_day() {
        assert_eq!(format_sim_time(0), "00:00:00,000");
        assert_eq!(format_sim_time(1), "00:00:00,001");
        assert_eq!(format_sim_time(20), "00:00:00,020");
        assert_eq!(format_sim_time(321), "00:00:00,321");
        assert_eq!(format_sim_time(62 * 1000 + 1), "00:01:02,001");
        assert_eq!(format_sim_time(600 * 1000 + 1), "00:10:00,001");
        assert_eq!(format_sim_time(83_001), "00:01:23,001");
        assert_eq!(format_sim_time(3600 * 1000 + 1), "01:00:00,001");
        assert_eq!(format_sim_time(12 * 3600 * 1000 + 1), "12:00:00,001");
    }

    #[test]
    fn test_format_sim_time_with_days() {
        assert_eq!(format_sim_time(86_400_000), "1:00:00:00,000");
        assert_eq!(format_sim_time(86_400_001), "1:00:00:00,001");
        assert_eq!(
            format_sim_time(86_400_000 + 3_600_000 + 1),
            "1:01:00:00,001"
        );
        assert_eq!(format_sim_time(86_399_999), "23:59:59,999");
    }

    #[test]
    fn test_format_sim_date_time() {
        assert_eq!(format_sim_date_time(0), "1970-01-01 00:00:00");
        assert_eq!(format_sim_date_time(86_400_000 + 61_000), "1970-01-02 00:01:01");
    }

    #[test]
    fn test_format_sim_date_time_out_of_range() {
        assert_eq!(format_sim_date_time(u64::MAX), format_sim_time(u64::MAX));
    }

    #[test]
    fn test_plus_and_duration() {
        let t = SimTime::from_millis(100);
        assert_eq!(t.plus(50), Some(SimTime::from_millis(150)));
        assert!(SimTime::from_millis(u64::MAX).plus(1).is_none());
        assert_eq!(SimTime::from_millis(150).duration_since(t), Some(50));
        assert_eq!(t.duration_since(SimTime::from_millis(150)), None);
    }

    #[test]
    fn test_display_and_days() {
        assert_eq!(SimTime::from_secs(83).to_string(), "00:01:23,000");
        assert_eq!(SimTime::from_millis(2 * 86_400_000 + 5).whole_days(), 2);
    }
}
