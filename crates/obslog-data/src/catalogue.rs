//! APEX source (`.cat`) and line (`.lin`) catalogue files.
//!
//! Both are plain text with one entry per line. Lines starting with `!` are
//! comments; blank lines are skipped. The first whitespace token is the
//! name, the line catalogue adds the rest frequency as second token.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use obslog_core::error::{ObslogError, Result};
use tracing::debug;

// ── SourceCatalogue ───────────────────────────────────────────────────────────

/// Science targets in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCatalogue {
    names: Vec<String>,
}

impl SourceCatalogue {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Names in file order, duplicates included.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Distinct names, for use as a selection.
    pub fn to_set(&self) -> HashSet<String> {
        self.names.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ── LineCatalogue ─────────────────────────────────────────────────────────────

/// Science line labels and their rest frequencies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineCatalogue {
    lines: BTreeMap<String, f64>,
}

impl LineCatalogue {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            lines: entries.into_iter().map(|(l, f)| (l.into(), f)).collect(),
        }
    }

    /// Rest frequency as written in the catalogue; units pass through.
    pub fn frequency(&self, label: &str) -> Option<f64> {
        self.lines.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.lines.contains_key(label)
    }

    /// Labels in ascending order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.lines.keys().map(String::as_str)
    }

    pub fn to_set(&self) -> HashSet<String> {
        self.lines.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ── Readers ───────────────────────────────────────────────────────────────────

/// Read a source catalogue.
pub fn read_source_catalogue(path: &Path) -> Result<SourceCatalogue> {
    let entries = read_entries(path)?;
    let catalogue = SourceCatalogue::new(entries.into_iter().map(|(_, tokens)| tokens[0].clone()));
    debug!("Read {} science sources from {}", catalogue.len(), path.display());
    Ok(catalogue)
}

/// Read a line catalogue. Every entry needs a numeric second field.
pub fn read_line_catalogue(path: &Path) -> Result<LineCatalogue> {
    let entries = read_entries(path)?;
    let mut lines = Vec::with_capacity(entries.len());
    for (line_no, tokens) in entries {
        let freq = tokens
            .get(1)
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or_else(|| ObslogError::Parse {
                path: path.to_path_buf(),
                row: line_no,
                message: format!("line \"{}\" has no rest frequency", tokens[0]),
            })?;
        lines.push((tokens[0].clone(), freq));
    }
    let catalogue = LineCatalogue::new(lines);
    debug!("Read {} science lines from {}", catalogue.len(), path.display());
    Ok(catalogue)
}

/// Non-comment lines as `(line number, tokens)`; never empty on success.
fn read_entries(path: &Path) -> Result<Vec<(usize, Vec<String>)>> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ObslogError::CatalogueNotFound(path.to_path_buf())
        } else {
            ObslogError::FileRead {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| ObslogError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        if line.starts_with('!') {
            continue;
        }
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            continue;
        }
        entries.push((idx + 1, tokens));
    }

    if entries.is_empty() {
        return Err(ObslogError::EmptyCatalogue(path.to_path_buf()));
    }
    Ok(entries)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
