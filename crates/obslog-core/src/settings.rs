use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::error::{ObslogError, Result};
use crate::models::{GroupKey, SortOrder, DEFAULT_ON_TYPES};

/// Extension appended to a catalogue basename for the source list.
pub const SOURCE_CATALOGUE_EXT: &str = "cat";
/// Extension appended to a catalogue basename for the line list.
pub const LINE_CATALOGUE_EXT: &str = "lin";
/// Directory under `$HOME` holding the nightly obslogs on an APEX account.
pub const DEFAULT_OBSLOG_DIR: &str = "obslogs";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Summarises APEX observing logs, defaults to the APEX account layout
#[derive(Parser, Debug, Clone)]
#[command(
    name = "apexlog",
    about = "Summarises APEX observing logs, defaults to the APEX account layout",
    version
)]
pub struct Settings {
    /// Summarise a single source name
    #[arg(short = 's', long)]
    pub source: Option<String>,

    /// Location/basename of source (.cat) and line (.lin) catalogues
    #[arg(short = 'c', long)]
    pub catalogs: Option<PathBuf>,

    /// Directory holding the obslogs
    #[arg(short = 'o', long)]
    pub obslogs: Option<PathBuf>,

    /// File extension of the obslogs
    #[arg(long, default_value = "html")]
    pub extension: String,

    /// Grouping key of the summary
    #[arg(long, value_enum, default_value_t = GroupKey::SourceLine)]
    pub group_by: GroupKey,

    /// Comma-separated scan types to count, or "all" [default: ONOFF,OTF]
    #[arg(long)]
    pub scan_types: Option<String>,

    /// Ignore the source catalogue
    #[arg(long)]
    pub all_sources: bool,

    /// Ignore the line catalogue
    #[arg(long)]
    pub all_lines: bool,

    /// Sort groups by total duration, longest first
    #[arg(long)]
    pub sort: bool,

    /// Output format of the summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write a bar chart of the summary to this SVG file
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Write one CSV of selected scans per UTC date into this directory
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// How the summary is printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

// ── RunConfig ──────────────────────────────────────────────────────────────────

/// Fully resolved parameters of one run. Nothing downstream consults the
/// environment; every default has been applied here.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub obslog_dir: PathBuf,
    pub extension: String,
    /// `None` when sources are not restricted by catalogue.
    pub source_catalogue: Option<PathBuf>,
    /// `None` when lines are not restricted by catalogue.
    pub line_catalogue: Option<PathBuf>,
    /// Single target requested with `--source`.
    pub target: Option<String>,
    /// `None` when every scan type counts.
    pub scan_types: Option<Vec<String>>,
    pub group_by: GroupKey,
    pub sort: SortOrder,
    pub format: OutputFormat,
    pub plot: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
    /// `true` when neither catalogues nor obslog directory were given.
    pub account_defaults: bool,
}

impl Settings {
    /// Level actually used for logging; `--debug` wins over `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Resolve against the current user's home directory and login name.
    pub fn resolve(&self) -> Result<RunConfig> {
        let home = dirs::home_dir()
            .ok_or_else(|| ObslogError::Config("cannot determine home directory".to_string()))?;
        let user = current_user(&home);
        Ok(self.resolve_with(&home, &user))
    }

    /// Resolve with an explicit home directory and user name.
    pub fn resolve_with(&self, home: &Path, user: &str) -> RunConfig {
        let obslog_dir = match &self.obslogs {
            Some(dir) => expand_home(dir, home),
            None => home.join(DEFAULT_OBSLOG_DIR),
        };

        let base = match &self.catalogs {
            Some(base) => expand_home(base, home),
            None => home.join(user),
        };
        let (cat, lin) = catalogue_paths(&base);

        // A single target without explicit catalogues summarises everything
        // logged for that target.
        let target_only = self.source.is_some() && self.catalogs.is_none();

        let source_catalogue = if self.all_sources || target_only {
            None
        } else {
            Some(cat)
        };
        let line_catalogue = if self.all_lines || target_only {
            None
        } else {
            Some(lin)
        };

        let scan_types = match self.scan_types.as_deref() {
            Some(list) => parse_scan_types(list),
            None if target_only => None,
            None => Some(DEFAULT_ON_TYPES.iter().map(|t| t.to_string()).collect()),
        };

        RunConfig {
            obslog_dir,
            extension: self.extension.trim_start_matches('.').to_string(),
            source_catalogue,
            line_catalogue,
            target: self.source.clone(),
            scan_types,
            group_by: self.group_by,
            sort: if self.sort {
                SortOrder::DurationDesc
            } else {
                SortOrder::ByKey
            },
            format: self.format,
            plot: self.plot.clone(),
            export_dir: self.export_dir.clone(),
            account_defaults: self.catalogs.is_none() && self.obslogs.is_none(),
        }
    }
}

// ── Path helpers ───────────────────────────────────────────────────────────────

/// Source and line catalogue paths for a basename.
///
/// The `.cat` / `.lin` extension is appended unless the basename already
/// carries it, so `~/apex`, `~/apex.cat` and `~/apex.lin` all resolve to the
/// same pair.
pub fn catalogue_paths(base: &Path) -> (PathBuf, PathBuf) {
    let stem = match base.extension().and_then(|e| e.to_str()) {
        Some(SOURCE_CATALOGUE_EXT) | Some(LINE_CATALOGUE_EXT) => base.with_extension(""),
        _ => base.to_path_buf(),
    };
    (
        append_extension(&stem, SOURCE_CATALOGUE_EXT),
        append_extension(&stem, LINE_CATALOGUE_EXT),
    )
}

/// Login name of the current user.
///
/// Checks `USER`, `LOGNAME` and `USERNAME`, then falls back to the last
/// component of the home directory.
pub fn current_user(home: &Path) -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
        .or_else(|| {
            home.file_name()
                .and_then(|n| n.to_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "apex".to_string())
}

/// Replace a leading `~` with `home`.
fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

fn append_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut os = stem.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

/// Split a `--scan-types` value; `all` (any case) lifts the restriction.
fn parse_scan_types(list: &str) -> Option<Vec<String>> {
    if list.trim().eq_ignore_ascii_case("all") {
        return None;
    }
    let types: Vec<String> = list
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if types.is_empty() {
        None
    } else {
        Some(types)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
