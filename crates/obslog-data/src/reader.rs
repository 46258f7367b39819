//! Obslog discovery and tabular record sources.
//!
//! APEX writes one HTML table per night; exported copies of the same logs
//! are sometimes kept as CSV or TSV. Every format is turned into the same
//! [`RawRecordSet`]: a header row plus string cells, no interpretation.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use obslog_core::error::{ObslogError, Result};
use regex::Regex;
use tracing::{debug, warn};

// ── RawRecordSet ──────────────────────────────────────────────────────────────

/// One log file's table exactly as written: header names and text cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecordSet {
    /// File the table was read from.
    pub origin: PathBuf,
    /// Header row, verbatim.
    pub headers: Vec<String>,
    /// Data rows; every row has `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl RawRecordSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── RecordSource ──────────────────────────────────────────────────────────────

/// Reads one log file into a [`RawRecordSet`].
///
/// Implementations open, read and close the file inside `read`; no handle
/// outlives the call, whether it succeeds or fails.
pub trait RecordSource: Send + Sync {
    fn read(&self, path: &Path) -> Result<RawRecordSet>;
}

/// Pick the record source for a log file extension.
///
/// `html`/`htm` → [`HtmlTableSource`], `csv` → comma-separated,
/// `tsv`/`txt` → tab-separated.
pub fn source_for_extension(extension: &str) -> Result<Box<dyn RecordSource>> {
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => Ok(Box::new(HtmlTableSource)),
        "csv" => Ok(Box::new(DelimitedSource::comma())),
        "tsv" | "txt" => Ok(Box::new(DelimitedSource::tab())),
        other => Err(ObslogError::UnsupportedFormat(other.to_string())),
    }
}

/// Find all files with `extension` directly inside `dir`, sorted by path.
///
/// The match on the extension ignores case. A missing directory yields an
/// empty list; callers decide whether that is fatal.
pub fn find_log_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Obslog directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    debug!("Found {} .{} files in {}", files.len(), extension, dir.display());
    files
}

fn read_to_string(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|source| ObslogError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|source| ObslogError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(content)
}

// ── HtmlTableSource ───────────────────────────────────────────────────────────

/// Reads the first `<table>` of an HTML obslog.
///
/// The first row supplies the header (`<th>` or `<td>` cells), every later
/// row is data. Markup inside cells is stripped and whitespace collapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTableSource;

fn table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>").expect("regex is valid"))
}

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").expect("regex is valid"))
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<t[hd]\b[^>]*>(.*?)</t[hd]\s*>").expect("regex is valid")
    })
}

fn cell_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<t[hd]\b").expect("regex is valid"))
}

fn numeric_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").expect("regex is valid")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("regex is valid"))
}

impl HtmlTableSource {
    /// Parse already-loaded HTML. `origin` is only used for error messages.
    pub fn parse(origin: &Path, html: &str) -> Result<RawRecordSet> {
        let table = table_re()
            .captures(html)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| ObslogError::Parse {
                path: origin.to_path_buf(),
                row: 0,
                message: "no <table> found".to_string(),
            })?
            .as_str();

        // Every opened cell must also be closed, or the row lost a value.
        let mut rows = row_re().captures_iter(table).map(|caps| {
            let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let opened = cell_start_re().find_iter(body).count();
            let cells = cell_re()
                .captures_iter(body)
                .map(|cell| clean_cell(cell.get(1).map(|m| m.as_str()).unwrap_or_default()))
                .collect::<Vec<String>>();
            (opened, cells)
        });

        let (opened, headers) = rows.next().ok_or_else(|| ObslogError::Parse {
            path: origin.to_path_buf(),
            row: 0,
            message: "table has no header row".to_string(),
        })?;
        if opened != headers.len() {
            return Err(unclosed_cells(origin, 0, opened, headers.len()));
        }

        let mut data = Vec::new();
        for (idx, (opened, row)) in rows.enumerate() {
            // Spacer rows without cells carry no scan.
            if opened == 0 {
                continue;
            }
            if opened != row.len() {
                return Err(unclosed_cells(origin, idx + 1, opened, row.len()));
            }
            if row.len() != headers.len() {
                return Err(ObslogError::Parse {
                    path: origin.to_path_buf(),
                    row: idx + 1,
                    message: format!(
                        "expected {} cells, found {}",
                        headers.len(),
                        row.len()
                    ),
                });
            }
            data.push(row);
        }

        Ok(RawRecordSet {
            origin: origin.to_path_buf(),
            headers,
            rows: data,
        })
    }
}

fn unclosed_cells(origin: &Path, row: usize, opened: usize, closed: usize) -> ObslogError {
    ObslogError::Parse {
        path: origin.to_path_buf(),
        row,
        message: format!("{} cells opened but only {} closed", opened, closed),
    }
}

impl RecordSource for HtmlTableSource {
    fn read(&self, path: &Path) -> Result<RawRecordSet> {
        let html = read_to_string(path)?;
        Self::parse(path, &html)
    }
}

/// Strip markup, decode entities and collapse whitespace.
fn clean_cell(raw: &str) -> String {
    let text = tag_re().replace_all(raw, " ");
    let text = decode_numeric_entities(&text);
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode `&#NNN;` and `&#xHH;` references. Invalid code points stay as
/// written.
fn decode_numeric_entities(text: &str) -> String {
    numeric_entity_re()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
                (None, None) => None,
            };
            match code.and_then(char::from_u32) {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ── DelimitedSource ───────────────────────────────────────────────────────────

/// Reads CSV/TSV exports of the obslog table.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedSource {
    delimiter: u8,
}

impl DelimitedSource {
    pub fn comma() -> Self {
        Self { delimiter: b',' }
    }

    pub fn tab() -> Self {
        Self { delimiter: b'\t' }
    }

    /// Parse from any reader. `origin` is only used for error messages.
    pub fn parse_reader<R: Read>(&self, origin: &Path, reader: R) -> Result<RawRecordSet> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| csv_error(origin, 0, e))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| csv_error(origin, idx + 1, e))?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(RawRecordSet {
            origin: origin.to_path_buf(),
            headers,
            rows,
        })
    }
}

impl RecordSource for DelimitedSource {
    fn read(&self, path: &Path) -> Result<RawRecordSet> {
        let file = File::open(path).map_err(|source| ObslogError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_reader(path, file)
    }
}

fn csv_error(origin: &Path, row: usize, err: csv::Error) -> ObslogError {
    ObslogError::Parse {
        path: origin.to_path_buf(),
        row,
        message: err.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use obslog_core::error::ErrorKind;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const NIGHT: &str = r#"<html><body>
<h1>APEX obslog</h1>
<table border="1">
<tr><th>Scan</th><th>Source</th><th>Mol. line</th><th>UTC</th></tr>
<tr><td>1001</td><td>M17</td><td>CO(2-1) &amp; 13CO</td><td>2019-06-01U03:14:15</td></tr>
<tr>
  <td>1002</td>
  <td><b>PARK</b></td>
  <td>CO(2-1)</td>
  <td>2019-06-01U03:20:00</td>
</tr>
</table>
<table><tr><td>ignored</td></tr></table>
</body></html>"#;

    // ── find_log_files ────────────────────────────────────────────────────────

    #[test]
    fn test_find_log_files_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "b.html", "x");
        write_file(dir.path(), "a.HTML", "x");
        write_file(dir.path(), "notes.txt", "x");

        let files = find_log_files(dir.path(), "html");
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.HTML", "b.html"]);
    }

    #[test]
    fn test_find_log_files_not_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("archive");
        std::fs::create_dir_all(&sub).unwrap();
        write_file(dir.path(), "tonight.html", "x");
        write_file(&sub, "old.html", "x");

        assert_eq!(find_log_files(dir.path(), "html").len(), 1);
    }

    #[test]
    fn test_find_log_files_nonexistent_path() {
        let files = find_log_files(Path::new("/tmp/does-not-exist-obslog-test-xyz"), "html");
        assert!(files.is_empty());
    }

    // ── source_for_extension ──────────────────────────────────────────────────

    #[test]
    fn test_source_for_extension_unknown() {
        let err = source_for_extension("xlsx").err().unwrap();
        assert!(matches!(err, ObslogError::UnsupportedFormat(ref e) if e == "xlsx"));
    }

    #[test]
    fn test_source_for_extension_known() {
        for ext in ["html", "HTM", "csv", "tsv", "txt"] {
            assert!(source_for_extension(ext).is_ok(), "{ext} must be readable");
        }
    }

    // ── HtmlTableSource ───────────────────────────────────────────────────────

    #[test]
    fn test_html_first_table_only() {
        let set = HtmlTableSource::parse(Path::new("n.html"), NIGHT).unwrap();
        assert_eq!(set.headers, vec!["Scan", "Source", "Mol. line", "UTC"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_html_strips_tags_and_decodes_entities() {
        let set = HtmlTableSource::parse(Path::new("n.html"), NIGHT).unwrap();
        assert_eq!(set.rows[0][2], "CO(2-1) & 13CO");
        assert_eq!(set.rows[1][1], "PARK");
        assert_eq!(set.rows[1][3], "2019-06-01U03:20:00");
    }

    #[test]
    fn test_html_without_table_is_parse_error() {
        let err = HtmlTableSource::parse(Path::new("n.html"), "<p>empty night</p>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_html_ragged_row_is_parse_error() {
        let html = "<table><tr><th>A</th><th>B</th></tr><tr><td>1</td></tr></table>";
        let err = HtmlTableSource::parse(Path::new("n.html"), html).unwrap_err();
        match err {
            ObslogError::Parse { row, .. } => assert_eq!(row, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_html_unclosed_cell_is_parse_error() {
        let html = "<table><tr><th>scan</th><th>source</th></tr>\
                    <tr><td>1</td><td>M17</td></tr>\
                    <tr><td>2<td>M17</tr></table>";
        let err = HtmlTableSource::parse(Path::new("n.html"), html).unwrap_err();
        match err {
            ObslogError::Parse { row, .. } => assert_eq!(row, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_html_unclosed_header_cell_is_parse_error() {
        let html = "<table><tr><th>scan<th>source</th></tr><tr><td>1</td></tr></table>";
        let err = HtmlTableSource::parse(Path::new("n.html"), html).unwrap_err();
        assert!(matches!(err, ObslogError::Parse { row: 0, .. }));
    }

    #[test]
    fn test_html_spacer_rows_skipped() {
        let html = "<table><tr><th>scan</th></tr><tr></tr><tr> </tr><tr><td>7</td></tr></table>";
        let set = HtmlTableSource::parse(Path::new("n.html"), html).unwrap();
        assert_eq!(set.rows, vec![vec!["7".to_string()]]);
    }

    #[test]
    fn test_html_decodes_numeric_entities() {
        let html = "<table><tr><th>PWV</th><th>Source</th><th>Note</th></tr>\
                    <tr><td>&#160;1.2&#x20;</td><td>Sgr&#x27;B2</td><td>&#xD800;&amp;#39;</td></tr>\
                    </table>";
        let set = HtmlTableSource::parse(Path::new("n.html"), html).unwrap();
        assert_eq!(set.rows[0][0], "1.2");
        assert_eq!(set.rows[0][1], "Sgr'B2");
        assert_eq!(set.rows[0][2], "&#xD800;&#39;");
    }

    #[test]
    fn test_html_read_missing_file() {
        let err = HtmlTableSource
            .read(Path::new("/tmp/does-not-exist-obslog-test-xyz.html"))
            .unwrap_err();
        assert!(matches!(err, ObslogError::FileRead { .. }));
    }

    // ── DelimitedSource ───────────────────────────────────────────────────────

    #[test]
    fn test_csv_reads_headers_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "night.csv",
            "Scan,Source,Mol. line\n1001,M17,CO(2-1) 230.538\n1002, NGC6334 ,13CO(2-1)\n",
        );
        let set = DelimitedSource::comma().read(&path).unwrap();
        assert_eq!(set.headers, vec!["Scan", "Source", "Mol. line"]);
        assert_eq!(set.rows[1][1], "NGC6334");
        assert_eq!(set.origin, path);
    }

    #[test]
    fn test_tsv_reads_tabs() {
        let data = "Scan\tSource\n1\tM17\n";
        let set = DelimitedSource::tab()
            .parse_reader(Path::new("night.tsv"), data.as_bytes())
            .unwrap();
        assert_eq!(set.rows, vec![vec!["1".to_string(), "M17".to_string()]]);
    }

    #[test]
    fn test_csv_ragged_row_is_parse_error() {
        let data = "Scan,Source\n1,M17\n2\n";
        let err = DelimitedSource::comma()
            .parse_reader(Path::new("night.csv"), data.as_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
