use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Source names the telescope logs while not pointing at a science target.
pub const NON_SCIENCE_SOURCES: [&str; 4] = ["PARK", "ZENITH", "RECYCLE", "RECYCLING"];

/// PWV cell text written while the dome is closed.
pub const SHUTTER_CLOSED: &str = "Shutter closed";

/// Raw scan duration (seconds) logged for cancelled scans.
pub const CANCELLED_DURATION_SECONDS: f64 = -999.0;

/// Scan types counted as on-source science time when no whitelist is given.
pub const DEFAULT_ON_TYPES: [&str; 2] = ["ONOFF", "OTF"];

/// Returns `true` for the parking/maintenance pseudo-sources.
pub fn is_non_science_source(source: &str) -> bool {
    NON_SCIENCE_SOURCES.contains(&source)
}

/// Precipitable water vapour as logged for one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pwv {
    /// Millimetres of PWV.
    Reading(f64),
    /// The dome was closed; no weather reading exists.
    ShutterClosed,
}

impl Pwv {
    pub fn is_shutter_closed(&self) -> bool {
        matches!(self, Pwv::ShutterClosed)
    }

    /// The numeric reading, `None` for shutter-closed rows.
    pub fn millimetres(&self) -> Option<f64> {
        match self {
            Pwv::Reading(mm) => Some(*mm),
            Pwv::ShutterClosed => None,
        }
    }
}

/// Columns the aggregator groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum GroupKey {
    /// `(source, line)`
    SourceLine,
    /// `(scan_status, source, line)`
    StatusSourceLine,
}

/// Ordering of aggregated groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending by group key.
    #[default]
    ByKey,
    /// Longest total first; ties ascending by group key.
    DurationDesc,
}

/// One normalised row of an observing log.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    /// Scan start time.
    pub utc: DateTime<Utc>,
    /// Sequence number from the log.
    pub scan_id: i64,
    /// Target name.
    pub source: String,
    /// Raw molecular-line field, e.g. `"CO(2-1) 230.538 GHz"`.
    pub mol_line: String,
    /// First whitespace token of `mol_line`.
    pub line: String,
    pub scan_type: String,
    pub scan_status: String,
    /// Elapsed scan time, never negative.
    pub scan_duration: Duration,
    pub pwv: Pwv,
    /// Log file the row was read from.
    pub origin: PathBuf,
    /// Remaining columns, keyed by canonical column name.
    pub extra: BTreeMap<String, String>,
}

impl ScanRecord {
    /// Scan duration in minutes, rounded to one decimal place.
    pub fn duration_minutes(&self) -> f64 {
        minutes_rounded(self.scan_duration)
    }

    /// `false` for rows logged while parked, stowed or recycling.
    pub fn is_science_pointing(&self) -> bool {
        !is_non_science_source(&self.source)
    }
}

/// Convert float seconds to a [`Duration`] with millisecond resolution.
///
/// `None` when the value is not finite or does not fit a [`Duration`].
pub fn duration_from_seconds(seconds: f64) -> Option<Duration> {
    let ms = (seconds * 1000.0).round();
    // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
    if !ms.is_finite() || ms >= i64::MAX as f64 || ms < i64::MIN as f64 {
        return None;
    }
    Duration::try_milliseconds(ms as i64)
}

/// Express `duration` in minutes rounded to one decimal place.
pub fn minutes_rounded(duration: Duration) -> f64 {
    let minutes = duration.num_milliseconds() as f64 / 60_000.0;
    (minutes * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── sentinels ─────────────────────────────────────────────────────────────

    #[test]
    fn test_non_science_sources() {
        for name in ["PARK", "ZENITH", "RECYCLE", "RECYCLING"] {
            assert!(is_non_science_source(name), "{name} is a pointing state");
        }
        assert!(!is_non_science_source("M17"));
        assert!(!is_non_science_source("park"));
    }

    #[test]
    fn test_pwv_accessors() {
        assert_eq!(Pwv::Reading(0.8).millimetres(), Some(0.8));
        assert!(Pwv::ShutterClosed.millimetres().is_none());
        assert!(Pwv::ShutterClosed.is_shutter_closed());
        assert!(!Pwv::Reading(1.2).is_shutter_closed());
    }

    // ── durations ─────────────────────────────────────────────────────────────

    #[test]
    fn test_duration_from_seconds() {
        assert_eq!(duration_from_seconds(120.0), Some(Duration::seconds(120)));
        assert_eq!(duration_from_seconds(0.5), Some(Duration::milliseconds(500)));
    }

    #[test]
    fn test_duration_from_seconds_out_of_range() {
        assert!(duration_from_seconds(1e17).is_none());
        assert!(duration_from_seconds(f64::INFINITY).is_none());
        assert!(duration_from_seconds(f64::NAN).is_none());
        assert!(duration_from_seconds(5e15).is_some());
    }

    #[test]
    fn test_minutes_rounded() {
        assert_eq!(minutes_rounded(Duration::seconds(120)), 2.0);
        assert_eq!(minutes_rounded(Duration::seconds(100)), 1.7);
        assert_eq!(minutes_rounded(Duration::zero()), 0.0);
        assert_eq!(minutes_rounded(Duration::seconds(3600)), 60.0);
    }
}
