//! Per-night CSV listings of the selected science scans.
//!
//! Writes one `<YYYY-MM-DD>.csv` per UTC date so the scan numbers of a
//! night can be handed to the reduction scripts.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use obslog_core::error::{ObslogError, Result};
use obslog_core::models::ScanRecord;
use obslog_core::time_utils::{format_obslog_utc, utc_date};
use tracing::debug;

pub const EXPORT_COLUMNS: [&str; 7] = [
    "scan_id",
    "utc",
    "source",
    "line",
    "scan_type",
    "scan_status",
    "duration_min",
];

/// Group `records` by UTC calendar date and write one CSV per date into
/// `dir`, creating it if necessary. Returns the written paths in date order.
///
/// Rows keep the order they have in `records`.
pub fn export_by_date(records: &[ScanRecord], dir: &Path) -> Result<Vec<PathBuf>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&ScanRecord>> = BTreeMap::new();
    for record in records {
        by_date.entry(utc_date(record.utc)).or_default().push(record);
    }
    if by_date.is_empty() {
        return Ok(Vec::new());
    }

    fs::create_dir_all(dir).map_err(|source| ObslogError::FileRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(by_date.len());
    for (date, rows) in by_date {
        let path = dir.join(format!("{}.csv", date.format("%Y-%m-%d")));
        write_night(&path, &rows)?;
        debug!("Exported {} scans to {}", rows.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

fn write_night(path: &Path, rows: &[&ScanRecord]) -> Result<()> {
    let file = File::create(path).map_err(|source| ObslogError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::Writer::from_writer(file);
    let csv_err = |e: csv::Error| ObslogError::Render(format!("{}: {}", path.display(), e));

    writer.write_record(EXPORT_COLUMNS).map_err(csv_err)?;
    for r in rows {
        writer
            .write_record([
                r.scan_id.to_string(),
                format_obslog_utc(r.utc),
                r.source.clone(),
                r.line.clone(),
                r.scan_type.clone(),
                r.scan_status.clone(),
                format!("{:.1}", r.duration_minutes()),
            ])
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
