//! Grouped on-sky time sums.

use std::collections::BTreeMap;

use chrono::Duration;
use obslog_core::error::{ObslogError, Result};
use obslog_core::models::{minutes_rounded, GroupKey, ScanRecord, SortOrder};
use tracing::debug;

// ── SummaryRow ────────────────────────────────────────────────────────────────

/// Total scan time of one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    /// Scan status; only set for [`GroupKey::StatusSourceLine`].
    pub status: Option<String>,
    pub source: String,
    pub line: String,
    /// Summed scan duration.
    pub total: Duration,
    /// Number of scans in the group.
    pub scans: u32,
}

impl SummaryRow {
    /// Total in minutes, rounded to one decimal place.
    pub fn minutes(&self) -> f64 {
        minutes_rounded(self.total)
    }

    /// The grouping key as a tuple; `status` is `""` when not grouped on.
    pub fn key(&self) -> (&str, &str, &str) {
        (
            self.status.as_deref().unwrap_or(""),
            &self.source,
            &self.line,
        )
    }

    /// Human label, e.g. `"M17 / CO(2-1)"` or `"OK / M17 / CO(2-1)"`.
    pub fn label(&self) -> String {
        match &self.status {
            Some(status) => format!("{} / {} / {}", status, self.source, self.line),
            None => format!("{} / {}", self.source, self.line),
        }
    }
}

// ── SummaryTotals ─────────────────────────────────────────────────────────────

/// Totals over all groups of a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTotals {
    pub total: Duration,
    pub scans: u32,
    pub groups: usize,
}

impl Default for SummaryTotals {
    fn default() -> Self {
        Self {
            total: Duration::zero(),
            scans: 0,
            groups: 0,
        }
    }
}

impl SummaryTotals {
    pub fn minutes(&self) -> f64 {
        minutes_rounded(self.total)
    }
}

// ── aggregate ─────────────────────────────────────────────────────────────────

type Key = (Option<String>, String, String);

fn key_of(record: &ScanRecord, group_by: GroupKey) -> Key {
    let status = match group_by {
        GroupKey::SourceLine => None,
        GroupKey::StatusSourceLine => Some(record.scan_status.clone()),
    };
    (status, record.source.clone(), record.line.clone())
}

fn key_label((status, source, line): &Key) -> String {
    match status {
        Some(status) => format!("{} / {} / {}", status, source, line),
        None => format!("{} / {}", source, line),
    }
}

/// Sum scan durations per group.
///
/// Only groups with at least one row appear. With [`SortOrder::ByKey`] rows
/// come out ascending by key; with [`SortOrder::DurationDesc`] the longest
/// totals come first and equal totals stay ascending by key.
///
/// A group whose summed duration leaves the representable range is an
/// [`ObslogError::DurationOverflow`] error.
pub fn aggregate(
    records: &[ScanRecord],
    group_by: GroupKey,
    order: SortOrder,
) -> Result<Vec<SummaryRow>> {
    // BTreeMap keeps keys ordered.
    let mut groups: BTreeMap<Key, (Duration, u32)> = BTreeMap::new();

    for record in records {
        let key = key_of(record, group_by);
        let entry = groups.entry(key.clone()).or_insert((Duration::zero(), 0));
        entry.0 = entry
            .0
            .checked_add(&record.scan_duration)
            .ok_or_else(|| ObslogError::DurationOverflow {
                group: key_label(&key),
            })?;
        entry.1 += 1;
    }

    let mut rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|((status, source, line), (total, scans))| SummaryRow {
            status,
            source,
            line,
            total,
            scans,
        })
        .collect();

    if order == SortOrder::DurationDesc {
        // Stable sort: equal totals keep the ascending key order from above.
        rows.sort_by(|a, b| b.total.cmp(&a.total));
    }

    debug!("Aggregated {} rows into {} groups", records.len(), rows.len());
    Ok(rows)
}

/// Sum the totals of all groups.
pub fn totals(rows: &[SummaryRow]) -> Result<SummaryTotals> {
    rows.iter().try_fold(SummaryTotals::default(), |mut acc, row| {
        acc.total = acc
            .total
            .checked_add(&row.total)
            .ok_or_else(|| ObslogError::DurationOverflow {
                group: "all groups".to_string(),
            })?;
        acc.scans += row.scans;
        acc.groups += 1;
        Ok(acc)
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use obslog_core::error::ErrorKind;
    use obslog_core::models::Pwv;
    use std::path::PathBuf;

    fn make_record(status: &str, source: &str, line: &str, seconds: i64) -> ScanRecord {
        ScanRecord {
            utc: Utc.with_ymd_and_hms(2019, 6, 1, 2, 0, 0).unwrap(),
            scan_id: 1,
            source: source.to_string(),
            mol_line: format!("{line} 345.796 GHz"),
            line: line.to_string(),
            scan_type: "ONOFF".to_string(),
            scan_status: status.to_string(),
            scan_duration: Duration::seconds(seconds),
            pwv: Pwv::Reading(0.9),
            origin: PathBuf::from("a.html"),
            extra: BTreeMap::new(),
        }
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_source_line_groups_and_sums() {
        let records = vec![
            make_record("OK", "M17", "CO", 120),
            make_record("FAILED", "M17", "CO", 0),
            make_record("OK", "M17", "HCN", 300),
            make_record("OK", "NGC6334", "CO", 90),
        ];
        let rows = aggregate(&records, GroupKey::SourceLine, SortOrder::ByKey).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].key(), ("", "M17", "CO"));
        assert_eq!(rows[0].minutes(), 2.0);
        assert_eq!(rows[0].scans, 2);
        assert_eq!(rows[1].key(), ("", "M17", "HCN"));
        assert_eq!(rows[1].minutes(), 5.0);
        assert_eq!(rows[2].minutes(), 1.5);
        assert!(rows.iter().all(|r| r.status.is_none()));
    }

    #[test]
    fn test_status_source_line_splits_by_status() {
        let records = vec![
            make_record("OK", "M17", "CO", 120),
            make_record("ABORTED", "M17", "CO", 30),
            make_record("OK", "M17", "CO", 60),
        ];
        let rows = aggregate(&records, GroupKey::StatusSourceLine, SortOrder::ByKey).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key(), ("ABORTED", "M17", "CO"));
        assert_eq!(rows[0].minutes(), 0.5);
        assert_eq!(rows[1].key(), ("OK", "M17", "CO"));
        assert_eq!(rows[1].minutes(), 3.0);
    }

    #[test]
    fn test_duration_desc_with_key_tie_break() {
        let records = vec![
            make_record("OK", "B", "CO", 60),
            make_record("OK", "C", "CO", 600),
            make_record("OK", "A", "CO", 60),
        ];
        let rows = aggregate(&records, GroupKey::SourceLine, SortOrder::DurationDesc).unwrap();

        let sources: Vec<&str> = rows.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_group_sum_overflow_is_data_quality() {
        // Each scan is in range on its own; the sum is not.
        let mut a = make_record("OK", "M17", "CO", 0);
        a.scan_duration = Duration::milliseconds(i64::MAX / 2 + 1);
        let b = a.clone();
        let err = aggregate(&[a, b], GroupKey::SourceLine, SortOrder::ByKey).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DataQuality);
        assert!(err.to_string().contains("M17 / CO"));
    }

    #[test]
    fn test_empty_input_has_no_groups() {
        let rows = aggregate(&[], GroupKey::SourceLine, SortOrder::ByKey).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_regrouping_exploded_summary_is_idempotent() {
        let records = vec![
            make_record("OK", "M17", "CO", 120),
            make_record("OK", "M17", "CO", 45),
            make_record("OK", "M17", "HCN", 300),
            make_record("FAILED", "NGC6334", "CO", 0),
        ];
        let first = aggregate(&records, GroupKey::SourceLine, SortOrder::ByKey).unwrap();

        // One synthetic row per group carrying the group total.
        let exploded: Vec<ScanRecord> = first
            .iter()
            .map(|row| make_record("OK", &row.source, &row.line, row.total.num_seconds()))
            .collect();
        let second = aggregate(&exploded, GroupKey::SourceLine, SortOrder::ByKey).unwrap();

        let totals_a: Vec<(String, Duration)> = first.iter().map(|r| (r.label(), r.total)).collect();
        let totals_b: Vec<(String, Duration)> =
            second.iter().map(|r| (r.label(), r.total)).collect();
        assert_eq!(totals_a, totals_b);
    }

    // ── totals ────────────────────────────────────────────────────────────────

    #[test]
    fn test_totals_sum_all_groups() {
        let records = vec![
            make_record("OK", "M17", "CO", 120),
            make_record("OK", "M17", "HCN", 300),
        ];
        let rows = aggregate(&records, GroupKey::SourceLine, SortOrder::ByKey).unwrap();
        let t = totals(&rows).unwrap();

        assert_eq!(t.total, Duration::seconds(420));
        assert_eq!(t.minutes(), 7.0);
        assert_eq!(t.scans, 2);
        assert_eq!(t.groups, 2);
    }

    #[test]
    fn test_totals_empty() {
        let t = totals(&[]).unwrap();
        assert_eq!(t, SummaryTotals::default());
        assert_eq!(t.minutes(), 0.0);
    }

    #[test]
    fn test_totals_overflow_is_error() {
        let big = SummaryRow {
            status: None,
            source: "M17".to_string(),
            line: "CO".to_string(),
            total: Duration::MAX,
            scans: 1,
        };
        let err = totals(&[big.clone(), big]).unwrap_err();
        assert!(matches!(err, ObslogError::DurationOverflow { .. }));
    }

    // ── labels ────────────────────────────────────────────────────────────────

    #[test]
    fn test_label() {
        let rows = aggregate(
            &[make_record("OK", "M17", "CO", 60)],
            GroupKey::StatusSourceLine,
            SortOrder::ByKey,
        )
        .unwrap();
        assert_eq!(rows[0].label(), "OK / M17 / CO");
    }
}
