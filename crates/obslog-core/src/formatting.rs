//! Number and duration formatting for the summary output.

use chrono::Duration;

/// Format on-sky minutes the way the summary table shows them: one decimal,
/// thousands separators.
///
/// ```
/// use obslog_core::formatting::format_minutes;
///
/// assert_eq!(format_minutes(2.0), "2.0");
/// assert_eq!(format_minutes(1523.25), "1,523.3");
/// assert_eq!(format_minutes(-0.01), "0.0");
/// ```
pub fn format_minutes(minutes: f64) -> String {
    let tenths = (minutes * 10.0).round() as i64;
    let sign = if tenths < 0 { "-" } else { "" };
    let tenths = tenths.unsigned_abs();
    format!("{}{}.{}", sign, group_thousands(tenths / 10), tenths % 10)
}

/// Format a duration as hours and whole minutes.
///
/// ```
/// use chrono::Duration;
/// use obslog_core::formatting::format_duration;
///
/// assert_eq!(format_duration(Duration::minutes(45)), "45m");
/// assert_eq!(format_duration(Duration::minutes(180)), "3h");
/// assert_eq!(format_duration(Duration::minutes(225)), "3h 45m");
/// ```
pub fn format_duration(duration: Duration) -> String {
    // Round to the nearest minute.
    let mins = (duration.num_seconds() + 30).div_euclid(60);
    match (mins / 60, mins % 60) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_minutes_one_decimal() {
        assert_eq!(format_minutes(0.0), "0.0");
        assert_eq!(format_minutes(2.0), "2.0");
        assert_eq!(format_minutes(17.25), "17.3");
        assert_eq!(format_minutes(999.94), "999.9");
    }

    #[test]
    fn test_format_minutes_thousands() {
        assert_eq!(format_minutes(1_000.0), "1,000.0");
        assert_eq!(format_minutes(1_234_567.8), "1,234,567.8");
    }

    #[test]
    fn test_format_minutes_negative() {
        assert_eq!(format_minutes(-9_876.5), "-9,876.5");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::zero()), "0m");
        assert_eq!(format_duration(Duration::seconds(59 * 60)), "59m");
        assert_eq!(format_duration(Duration::seconds(90 * 60)), "1h 30m");
        assert_eq!(format_duration(Duration::seconds(3_630)), "1h 1m");
        assert_eq!(format_duration(Duration::seconds(29)), "0m");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(12_345_678), "12,345,678");
    }
}
