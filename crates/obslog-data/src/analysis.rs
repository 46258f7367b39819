//! Main pipeline for apexlog.
//!
//! Orchestrates catalogue loading, log discovery, parallel reading and
//! normalisation, merging, selection and aggregation, returning a
//! [`PipelineOutput`] ready for the report layer.

use std::time::Instant;

use obslog_core::error::{ObslogError, Result};
use obslog_core::models::ScanRecord;
use obslog_core::settings::RunConfig;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::aggregator::{aggregate, SummaryRow};
use crate::catalogue::{read_line_catalogue, read_source_catalogue};
use crate::merger::{merge, MergedTable};
use crate::normalizer::{normalize, NormalizedRecordSet};
use crate::reader::{find_log_files, source_for_extension};
use crate::selector::{select, Selection};

// ── Public types ──────────────────────────────────────────────────────────────

/// Counters produced alongside the pipeline output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineMetadata {
    /// Number of log files read.
    pub files_read: usize,
    /// Rows across all files before selection.
    pub rows_read: usize,
    /// Rows that survived selection.
    pub rows_selected: usize,
    /// Number of summary groups.
    pub groups: usize,
    /// Rows whose `-999` duration was replaced by zero.
    pub cancelled_scans: usize,
    /// Rows logged with the shutter closed.
    pub shutter_closed_rows: usize,
    /// Wall-clock seconds spent reading and normalising the logs.
    pub load_time_seconds: f64,
}

/// The complete output of [`run`].
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Every scan read, ascending by UTC.
    pub merged: MergedTable,
    /// Science scans that passed the selection, ascending by UTC.
    pub selected: Vec<ScanRecord>,
    /// One row per group.
    pub summary: Vec<SummaryRow>,
    pub metadata: PipelineMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Build the row selection for `config`.
///
/// Catalogues are read only when the configuration restricts on them; a
/// `--source` target is intersected with the source catalogue.
pub fn build_selection(config: &RunConfig) -> Result<Selection> {
    let mut selection = Selection::unrestricted();

    if let Some(path) = &config.source_catalogue {
        let catalogue = read_source_catalogue(path)?;
        selection = selection.with_sources(catalogue.to_set());
    }
    if let Some(path) = &config.line_catalogue {
        let catalogue = read_line_catalogue(path)?;
        selection = selection.with_lines(catalogue.to_set());
    }
    if let Some(target) = &config.target {
        selection = selection.and_source(target);
    }
    if let Some(types) = &config.scan_types {
        selection = selection.with_scan_types(types.iter().cloned());
    }
    Ok(selection)
}

/// Run the full pipeline.
///
/// 1. Resolve the selection (reading catalogues as configured).
/// 2. Discover log files in `config.obslog_dir`.
/// 3. Read and normalise every file in parallel.
/// 4. Merge into one chronological table.
/// 5. Select science rows and aggregate them.
///
/// Any failure aborts the run; no partial output is returned.
pub fn run(config: &RunConfig) -> Result<PipelineOutput> {
    // ── Step 1: Selection ─────────────────────────────────────────────────────
    let selection = build_selection(config)?;

    // ── Step 2: Discover ──────────────────────────────────────────────────────
    let source = source_for_extension(&config.extension)?;
    let files = find_log_files(&config.obslog_dir, &config.extension);
    if files.is_empty() {
        return Err(ObslogError::NoLogFiles {
            dir: config.obslog_dir.clone(),
            extension: config.extension.clone(),
        });
    }
    info!(
        "Reading {} obslogs from {}",
        files.len(),
        config.obslog_dir.display()
    );

    // ── Step 3: Read + normalise ──────────────────────────────────────────────
    let load_start = Instant::now();
    let sets: Vec<NormalizedRecordSet> = files
        .par_iter()
        .map(|path| source.read(path).and_then(|raw| normalize(&raw)))
        .collect::<Result<Vec<_>>>()?;
    let load_time = load_start.elapsed().as_secs_f64();

    let cancelled_scans = sets.iter().map(|s| s.stats.cancelled_scans).sum();
    let shutter_closed_rows = sets.iter().map(|s| s.stats.shutter_closed).sum();

    // ── Step 4: Merge ─────────────────────────────────────────────────────────
    let merged = merge(sets)?;

    // ── Step 5: Select + aggregate ────────────────────────────────────────────
    let (selected, _) = select(&merged.records, &selection);
    let summary = aggregate(&selected, config.group_by, config.sort)?;

    let metadata = PipelineMetadata {
        files_read: merged.origins.len(),
        rows_read: merged.len(),
        rows_selected: selected.len(),
        groups: summary.len(),
        cancelled_scans,
        shutter_closed_rows,
        load_time_seconds: load_time,
    };
    debug!("Pipeline finished: {:?}", metadata);

    Ok(PipelineOutput {
        merged,
        selected,
        summary,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
