//! Turns a [`RawRecordSet`] into typed [`ScanRecord`]s.
//!
//! Column names are canonicalised once here; nothing downstream looks a
//! column up by its printed name again.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::Duration;

use obslog_core::error::{ObslogError, Result};
use obslog_core::models::{
    duration_from_seconds, Pwv, ScanRecord, CANCELLED_DURATION_SECONDS, SHUTTER_CLOSED,
};
use obslog_core::time_utils::{parse_obslog_utc, OBSLOG_UTC_FORMAT};
use tracing::debug;

use crate::reader::RawRecordSet;

// ── Column canonicalisation ───────────────────────────────────────────────────

/// Canonical column name: `(`, `)` and `.` removed, runs of spaces and
/// hyphens collapsed to one `_`, lower case.
///
/// `"Mol. line"` → `"mol_line"`, `"Scan duration"` → `"scan_duration"`,
/// `"mm PWV"` → `"mm_pwv"`. Applying it twice changes nothing.
pub fn canonicalize_column(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        match c {
            '(' | ')' | '.' => {}
            ' ' | '-' | '_' => pending_sep = true,
            other => {
                if pending_sep && !out.is_empty() {
                    out.push('_');
                }
                pending_sep = false;
                out.extend(other.to_lowercase());
            }
        }
    }
    out
}

/// Canonical columns every obslog must provide, with accepted aliases.
const REQUIRED: [(Field, &[&str]); 8] = [
    (Field::Utc, &["utc"]),
    (Field::ScanId, &["scan", "scan_id"]),
    (Field::Source, &["source"]),
    (Field::MolLine, &["mol_line"]),
    (Field::ScanType, &["scan_type"]),
    (Field::ScanStatus, &["scan_status"]),
    (Field::ScanDuration, &["scan_duration"]),
    (Field::Pwv, &["mm_pwv", "pwv"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Utc,
    ScanId,
    Source,
    MolLine,
    ScanType,
    ScanStatus,
    ScanDuration,
    Pwv,
}

// ── NormalizedRecordSet ───────────────────────────────────────────────────────

/// Counters collected while normalising one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub rows: usize,
    /// Rows whose `-999` duration was replaced by zero.
    pub cancelled_scans: usize,
    /// Rows flagged as logged with the shutter closed.
    pub shutter_closed: usize,
}

/// Typed rows of one log file.
#[derive(Debug, Clone)]
pub struct NormalizedRecordSet {
    pub origin: PathBuf,
    /// Canonical column names in file order.
    pub columns: Vec<String>,
    pub records: Vec<ScanRecord>,
    pub stats: NormalizeStats,
}

impl NormalizedRecordSet {
    /// Column names sorted, for order-insensitive schema comparison.
    pub fn column_set(&self) -> Vec<String> {
        let mut cols = self.columns.clone();
        cols.sort();
        cols
    }
}

// ── normalize ─────────────────────────────────────────────────────────────────

/// Clean and retype one raw record set.
///
/// Fails on the first row that cannot be converted; no partial set is
/// returned.
pub fn normalize(raw: &RawRecordSet) -> Result<NormalizedRecordSet> {
    let origin = raw.origin.as_path();
    let columns: Vec<String> = raw.headers.iter().map(|h| canonicalize_column(h)).collect();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (idx, col) in columns.iter().enumerate() {
        if seen.insert(col.as_str(), idx).is_some() {
            return Err(ObslogError::Parse {
                path: origin.to_path_buf(),
                row: 0,
                message: format!("duplicate column \"{}\"", col),
            });
        }
    }

    let mut index: HashMap<Field, usize> = HashMap::new();
    for (field, aliases) in REQUIRED {
        let idx = aliases
            .iter()
            .find_map(|alias| seen.get(alias).copied())
            .ok_or_else(|| ObslogError::MissingColumn {
                path: origin.to_path_buf(),
                column: aliases[0].to_string(),
            })?;
        index.insert(field, idx);
    }

    let extra_cols: Vec<(usize, &String)> = columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| !index.values().any(|i| i == idx))
        .collect();

    let mut stats = NormalizeStats::default();
    let mut records = Vec::with_capacity(raw.rows.len());

    for (row_idx, row) in raw.rows.iter().enumerate() {
        let row_no = row_idx + 1;
        let cell = |field: Field| row.get(index[&field]).map(|s| s.trim()).unwrap_or_default();

        let utc = parse_obslog_utc(cell(Field::Utc)).ok_or_else(|| ObslogError::Parse {
            path: origin.to_path_buf(),
            row: row_no,
            message: format!(
                "unparsable UTC \"{}\" (expected {})",
                cell(Field::Utc),
                OBSLOG_UTC_FORMAT
            ),
        })?;

        let scan_id = cell(Field::ScanId)
            .parse::<i64>()
            .map_err(|_| ObslogError::Parse {
                path: origin.to_path_buf(),
                row: row_no,
                message: format!("unparsable scan number \"{}\"", cell(Field::ScanId)),
            })?;

        let (scan_duration, cancelled) = parse_duration(origin, row_no, cell(Field::ScanDuration))?;
        if cancelled {
            stats.cancelled_scans += 1;
        }

        let pwv = parse_pwv(origin, row_no, cell(Field::Pwv))?;
        if pwv.is_shutter_closed() {
            stats.shutter_closed += 1;
        }

        let mol_line = cell(Field::MolLine).to_string();
        let line = line_label(&mol_line)
            .ok_or_else(|| ObslogError::DataQuality {
                path: origin.to_path_buf(),
                row: row_no,
                message: "empty molecular line field".to_string(),
            })?
            .to_string();

        let extra: BTreeMap<String, String> = extra_cols
            .iter()
            .map(|(idx, name)| {
                let value = row.get(*idx).map(|s| s.trim().to_string()).unwrap_or_default();
                ((*name).clone(), value)
            })
            .collect();

        records.push(ScanRecord {
            utc,
            scan_id,
            source: cell(Field::Source).to_string(),
            mol_line,
            line,
            scan_type: cell(Field::ScanType).to_string(),
            scan_status: cell(Field::ScanStatus).to_string(),
            scan_duration,
            pwv,
            origin: origin.to_path_buf(),
            extra,
        });
    }

    stats.rows = records.len();
    debug!(
        "Normalised {}: {} rows, {} cancelled scans, {} shutter-closed",
        origin.display(),
        stats.rows,
        stats.cancelled_scans,
        stats.shutter_closed,
    );

    Ok(NormalizedRecordSet {
        origin: origin.to_path_buf(),
        columns,
        records,
        stats,
    })
}

/// First whitespace-delimited token of a molecular-line field.
pub fn line_label(mol_line: &str) -> Option<&str> {
    mol_line.split_whitespace().next()
}

/// Scan duration given in seconds; `-999` becomes `0` and is reported as
/// cancelled.
fn parse_duration(origin: &Path, row: usize, text: &str) -> Result<(Duration, bool)> {
    let seconds: f64 = text.parse().map_err(|_| ObslogError::Parse {
        path: origin.to_path_buf(),
        row,
        message: format!("unparsable scan duration \"{}\"", text),
    })?;

    if seconds == CANCELLED_DURATION_SECONDS {
        return Ok((Duration::zero(), true));
    }
    let invalid = || ObslogError::DataQuality {
        path: origin.to_path_buf(),
        row,
        message: format!("invalid scan duration {}", text),
    };
    if seconds < 0.0 {
        return Err(invalid());
    }
    let duration = duration_from_seconds(seconds).ok_or_else(invalid)?;
    Ok((duration, false))
}

fn parse_pwv(origin: &Path, row: usize, text: &str) -> Result<Pwv> {
    if text == SHUTTER_CLOSED {
        return Ok(Pwv::ShutterClosed);
    }
    match text.parse::<f64>() {
        Ok(mm) if mm.is_finite() => Ok(Pwv::Reading(mm)),
        _ => Err(ObslogError::DataQuality {
            path: origin.to_path_buf(),
            row,
            message: format!("unparsable PWV \"{}\"", text),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
