//! Summary output for stdout: aligned text table, JSON and CSV.
//!
//! The text table has one row per group plus a `TOTAL` row at the bottom.
//! Column widths are measured in terminal cells, so source names with
//! non-ASCII characters still line up.

use obslog_core::error::{ObslogError, Result};
use obslog_core::formatting::{format_duration, format_minutes};
use obslog_core::models::GroupKey;
use obslog_data::aggregator::{SummaryRow, SummaryTotals};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

/// Printed instead of a table when no group survived selection.
pub const NO_DATA: &str = "No science scans matched";

const SEPARATOR: &str = " | ";

// ── Text table ────────────────────────────────────────────────────────────────

fn headers(key: GroupKey) -> Vec<&'static str> {
    match key {
        GroupKey::SourceLine => vec!["Source", "Line", "Duration [min]"],
        GroupKey::StatusSourceLine => vec!["Scan status", "Source", "Line", "Duration [min]"],
    }
}

fn cells(row: &SummaryRow, key: GroupKey) -> Vec<String> {
    let mut out = Vec::with_capacity(4);
    if key == GroupKey::StatusSourceLine {
        out.push(row.status.clone().unwrap_or_default());
    }
    out.push(row.source.clone());
    out.push(row.line.clone());
    out.push(format_minutes(row.minutes()));
    out
}

fn pad_right(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn pad_left(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", " ".repeat(fill), text)
}

/// Render the summary as a fixed-width text table.
///
/// The last column (minutes) is right-aligned, all others left-aligned.
/// An empty summary renders as the single line [`NO_DATA`].
pub fn render_table(rows: &[SummaryRow], key: GroupKey, totals: &SummaryTotals) -> String {
    if rows.is_empty() {
        return format!("{}\n", NO_DATA);
    }

    let header = headers(key);
    let body: Vec<Vec<String>> = rows.iter().map(|r| cells(r, key)).collect();

    let mut total_row = vec![String::new(); header.len()];
    total_row[0] = "TOTAL".to_string();
    total_row[1] = format!(
        "{} groups, {} scans ({})",
        totals.groups,
        totals.scans,
        format_duration(totals.total)
    );
    total_row[header.len() - 1] = format_minutes(totals.minutes());

    let mut widths: Vec<usize> = header.iter().map(|h| h.width()).collect();
    for row in body.iter().chain(std::iter::once(&total_row)) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let last = header.len() - 1;
    let format_row = |row: &[String]| -> String {
        let parts: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if i == last {
                    pad_left(cell, widths[i])
                } else {
                    pad_right(cell, widths[i])
                }
            })
            .collect();
        parts.join(SEPARATOR).trim_end().to_string()
    };

    let header_row: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut out = String::new();
    out.push_str(&format_row(&header_row));
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    for row in &body {
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format_row(&total_row));
    out.push('\n');
    out
}

// ── Machine-readable ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonRow<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    scan_status: Option<&'a str>,
    source: &'a str,
    line: &'a str,
    duration_min: f64,
    scans: u32,
}

/// Pretty-printed JSON array, one object per group.
pub fn render_json(rows: &[SummaryRow]) -> Result<String> {
    let out: Vec<JsonRow<'_>> = rows
        .iter()
        .map(|r| JsonRow {
            scan_status: r.status.as_deref(),
            source: &r.source,
            line: &r.line,
            duration_min: r.minutes(),
            scans: r.scans,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&out)?)
}

/// CSV with a header row. The `scan_status` column is present only when
/// the rows were grouped by status.
pub fn render_csv(rows: &[SummaryRow]) -> Result<String> {
    let with_status = rows.iter().any(|r| r.status.is_some());
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = Vec::with_capacity(5);
    if with_status {
        header.push("scan_status");
    }
    header.extend(["source", "line", "duration_min", "scans"]);
    writer.write_record(&header).map_err(csv_error)?;

    for row in rows {
        let mut record = Vec::with_capacity(5);
        if with_status {
            record.push(row.status.clone().unwrap_or_default());
        }
        record.push(row.source.clone());
        record.push(row.line.clone());
        record.push(format!("{:.1}", row.minutes()));
        record.push(row.scans.to_string());
        writer.write_record(&record).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ObslogError::Render(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ObslogError::Render(e.to_string()))
}

fn csv_error(err: csv::Error) -> ObslogError {
    ObslogError::Render(format!("CSV: {}", err))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
