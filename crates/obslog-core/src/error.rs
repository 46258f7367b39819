use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while summarising observing logs.
#[derive(Error, Debug)]
pub enum ObslogError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A timestamp or other required field could not be parsed.
    #[error("Parse error in {path} (row {row}): {message}")]
    Parse {
        path: PathBuf,
        row: usize,
        message: String,
    },

    /// A column every log must carry is absent from the header row.
    #[error("Missing column \"{column}\" in {path}")]
    MissingColumn { path: PathBuf, column: String },

    /// A field parsed but holds a value that would corrupt the sums.
    #[error("Data quality error in {path} (row {row}): {message}")]
    DataQuality {
        path: PathBuf,
        row: usize,
        message: String,
    },

    /// No log files with the expected extension exist in the directory.
    #[error("No .{extension} obslogs found in {dir}")]
    NoLogFiles { dir: PathBuf, extension: String },

    /// The merger was handed zero record sets.
    #[error("Nothing to merge: {0}")]
    EmptyInput(String),

    /// A catalogue file exists but holds no entries.
    #[error("Catalogue has no entries: {0}")]
    EmptyCatalogue(PathBuf),

    /// A catalogue file does not exist at the resolved path.
    #[error("Catalogue not found: {0}")]
    CatalogueNotFound(PathBuf),

    /// Log files disagree on their canonical column set.
    #[error("Column mismatch in {path}: expected [{}], found [{}]", .expected.join(", "), .found.join(", "))]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Summing the scan durations of a group ran past the duration range.
    #[error("Summed scan duration of {group} overflows")]
    DurationOverflow { group: String },

    /// No record source knows how to read this file extension.
    #[error("Unsupported log format: .{0}")]
    UnsupportedFormat(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chart or export output could not be produced.
    #[error("Render error: {0}")]
    Render(String),

    /// A JSON document could not be produced.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`ObslogError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    DataQuality,
    EmptyInput,
    SchemaMismatch,
    CatalogueNotFound,
    Io,
    Other,
}

impl ObslogError {
    /// Map the error onto the failure category it belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ObslogError::Parse { .. } | ObslogError::MissingColumn { .. } => ErrorKind::Parse,
            ObslogError::DataQuality { .. } | ObslogError::DurationOverflow { .. } => {
                ErrorKind::DataQuality
            }
            ObslogError::NoLogFiles { .. }
            | ObslogError::EmptyInput(_)
            | ObslogError::EmptyCatalogue(_) => ErrorKind::EmptyInput,
            ObslogError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            ObslogError::CatalogueNotFound(_) => ErrorKind::CatalogueNotFound,
            ObslogError::FileRead { .. } | ObslogError::Io(_) => ErrorKind::Io,
            ObslogError::UnsupportedFormat(_)
            | ObslogError::Config(_)
            | ObslogError::Render(_)
            | ObslogError::Json(_) => ErrorKind::Other,
        }
    }
}

/// Convenience alias used throughout the obslog crates.
pub type Result<T> = std::result::Result<T, ObslogError>;
