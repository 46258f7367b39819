//! Removal of non-science rows and catalogue/scan-type restriction.

use std::collections::HashSet;

use obslog_core::models::ScanRecord;
use tracing::debug;

/// Which rows count as science time. `None` in a field means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub sources: Option<HashSet<String>>,
    pub lines: Option<HashSet<String>>,
    /// Upper-case scan types.
    pub scan_types: Option<HashSet<String>>,
}

impl Selection {
    /// Only the always-on rules apply.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Restrict to one target name.
    pub fn for_source(name: impl Into<String>) -> Self {
        Self::default().with_sources([name.into()])
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_scan_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scan_types = Some(
            types
                .into_iter()
                .map(|t| t.into().to_uppercase())
                .collect(),
        );
        self
    }

    /// Narrow the source restriction to its intersection with `name`.
    pub fn and_source(mut self, name: &str) -> Self {
        let keep = self
            .sources
            .as_ref()
            .map(|set| set.contains(name))
            .unwrap_or(true);
        let mut narrowed = HashSet::new();
        if keep {
            narrowed.insert(name.to_string());
        }
        self.sources = Some(narrowed);
        self
    }
}

/// Rows removed by each rule, in evaluation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectStats {
    pub non_science: usize,
    pub shutter_closed: usize,
    pub source: usize,
    pub line: usize,
    pub scan_type: usize,
    pub kept: usize,
}

/// Outcome of testing one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    NonScience,
    ShutterClosed,
    Source,
    Line,
    ScanType,
}

fn judge(record: &ScanRecord, selection: &Selection) -> Verdict {
    if !record.is_science_pointing() {
        return Verdict::NonScience;
    }
    if record.pwv.is_shutter_closed() {
        return Verdict::ShutterClosed;
    }
    if let Some(sources) = &selection.sources {
        if !sources.contains(&record.source) {
            return Verdict::Source;
        }
    }
    if let Some(lines) = &selection.lines {
        if !lines.contains(&record.line) {
            return Verdict::Line;
        }
    }
    if let Some(types) = &selection.scan_types {
        if !types.contains(&record.scan_type.to_uppercase()) {
            return Verdict::ScanType;
        }
    }
    Verdict::Keep
}

/// Return the rows of `records` that pass `selection`, in input order.
///
/// Parking/maintenance pseudo-sources and shutter-closed rows are always
/// dropped, whatever the selection says.
pub fn select(records: &[ScanRecord], selection: &Selection) -> (Vec<ScanRecord>, SelectStats) {
    let mut stats = SelectStats::default();
    let mut kept = Vec::new();

    for record in records {
        match judge(record, selection) {
            Verdict::Keep => kept.push(record.clone()),
            Verdict::NonScience => stats.non_science += 1,
            Verdict::ShutterClosed => stats.shutter_closed += 1,
            Verdict::Source => stats.source += 1,
            Verdict::Line => stats.line += 1,
            Verdict::ScanType => stats.scan_type += 1,
        }
    }
    stats.kept = kept.len();

    debug!(
        "Selected {} of {} rows (dropped: {} non-science, {} shutter closed, {} source, {} line, {} scan type)",
        stats.kept,
        records.len(),
        stats.non_science,
        stats.shutter_closed,
        stats.source,
        stats.line,
        stats.scan_type,
    );

    (kept, stats)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
