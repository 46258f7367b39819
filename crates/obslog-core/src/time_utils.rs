use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Timestamp layout of the obslog `UTC` column, e.g. `2019-06-01U03:14:15`.
pub const OBSLOG_UTC_FORMAT: &str = "%Y-%m-%dU%H:%M:%S";

/// Parse an obslog `UTC` cell.
///
/// Only the literal-`U` layout is accepted; surrounding whitespace is
/// ignored. Returns `None` for anything else, including ISO 8601 with `T`.
pub fn parse_obslog_utc(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(trimmed, OBSLOG_UTC_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format a timestamp back into the obslog layout.
pub fn format_obslog_utc(dt: DateTime<Utc>) -> String {
    dt.format(OBSLOG_UTC_FORMAT).to_string()
}

/// UTC calendar date of a scan, used to bucket per-night exports.
pub fn utc_date(dt: DateTime<Utc>) -> NaiveDate {
    dt.date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_obslog_utc() {
        let dt = parse_obslog_utc("2019-06-01U03:14:15").unwrap();
        assert_eq!(dt.year(), 2019);
        assert_eq!(dt.month(), 6);
        assert_eq!(dt.day(), 1);
        assert_eq!(dt.hour(), 3);
        assert_eq!(dt.minute(), 14);
        assert_eq!(dt.second(), 15);
    }

    #[test]
    fn test_parse_obslog_utc_trims_whitespace() {
        assert!(parse_obslog_utc("  2019-06-01U03:14:15 ").is_some());
    }

    #[test]
    fn test_parse_obslog_utc_rejects_iso_t_separator() {
        assert!(parse_obslog_utc("2019-06-01T03:14:15").is_none());
    }

    #[test]
    fn test_parse_obslog_utc_rejects_garbage() {
        assert!(parse_obslog_utc("").is_none());
        assert!(parse_obslog_utc("yesterday").is_none());
        assert!(parse_obslog_utc("2019-13-01U03:14:15").is_none());
    }

    #[test]
    fn test_format_round_trips_layout() {
        let dt = parse_obslog_utc("2021-11-30U23:59:01").unwrap();
        assert_eq!(format_obslog_utc(dt), "2021-11-30U23:59:01");
    }

    #[test]
    fn test_utc_date() {
        let dt = parse_obslog_utc("2021-11-30U23:59:01").unwrap();
        assert_eq!(utc_date(dt), NaiveDate::from_ymd_opt(2021, 11, 30).unwrap());
    }
}
