//! Concatenation of per-night record sets into one chronological table.

use std::collections::BTreeMap;
use std::path::PathBuf;

use obslog_core::error::{ObslogError, Result};
use obslog_core::models::ScanRecord;
use tracing::debug;

use crate::normalizer::NormalizedRecordSet;

/// All scans of a run, ascending by `utc`.
#[derive(Debug, Clone)]
pub struct MergedTable {
    /// Canonical column names shared by every input file.
    pub columns: Vec<String>,
    pub records: Vec<ScanRecord>,
    /// Input files in the order they were merged.
    pub origins: Vec<PathBuf>,
}

impl MergedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Regroup rows by the file they were read from.
    pub fn split_by_origin(&self) -> BTreeMap<PathBuf, Vec<ScanRecord>> {
        let mut out: BTreeMap<PathBuf, Vec<ScanRecord>> = BTreeMap::new();
        for record in &self.records {
            out.entry(record.origin.clone())
                .or_default()
                .push(record.clone());
        }
        out
    }
}

/// Concatenate `sets` and sort by scan start time.
///
/// The sort is stable, so scans with identical timestamps keep the order in
/// which their files were supplied. Every file must carry the same canonical
/// column set as the first one.
pub fn merge(sets: Vec<NormalizedRecordSet>) -> Result<MergedTable> {
    let Some(first) = sets.first() else {
        return Err(ObslogError::EmptyInput(
            "no record sets were supplied".to_string(),
        ));
    };

    let columns = first.columns.clone();
    let expected = first.column_set();

    for set in &sets[1..] {
        let found = set.column_set();
        if found != expected {
            return Err(ObslogError::SchemaMismatch {
                path: set.origin.clone(),
                expected,
                found,
            });
        }
    }

    let total: usize = sets.iter().map(|s| s.records.len()).sum();
    let mut records = Vec::with_capacity(total);
    let mut origins = Vec::with_capacity(sets.len());
    for set in sets {
        origins.push(set.origin);
        records.extend(set.records);
    }

    records.sort_by_key(|r| r.utc);

    debug!("Merged {} rows from {} files", records.len(), origins.len());

    Ok(MergedTable {
        columns,
        records,
        origins,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
