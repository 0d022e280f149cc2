use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::errors::ParseError;

/// Converts a timestamp to the microsecond count all internal arithmetic
/// runs on.
pub(crate) fn to_micros<Tz: TimeZone>(t: &DateTime<Tz>) -> i64 {
    t.timestamp_micros()
}

pub(crate) fn from_micros(us: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(us).expect("timestamp out of range")
}

/// Formats a timestamp the way temporal values print it:
/// `2000-01-01 00:00:00+00`.
pub(crate) fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S%:::z").to_string()
}

/// Parses the timestamp formats accepted in temporal literals: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS` with optional offset, and a bare date (midnight
/// UTC).
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ParseError> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%#z", "%Y-%m-%d %H:%M%#z"] {
        if let Ok(t) = DateTime::parse_from_str(s, fmt) {
            return Ok(t.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&t));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let t = d.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        return Ok(Utc.from_utc_datetime(&t));
    }
    Err(ParseError::new("timestamp", s.to_string()))
}

/// Splits `s` at the top-level occurrences of `sep`, honoring one level of
/// quoting so that text base values containing the separator survive.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '[' | '(' | '{' if !in_quotes => depth += 1,
            ']' | ')' | '}' if !in_quotes => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trip() {
        let t = parse_timestamp("2000-01-01 08:30:00+00").unwrap();
        assert_eq!(format_timestamp(&t), "2000-01-01 08:30:00+00");
        assert_eq!(parse_timestamp(&format_timestamp(&t)).unwrap(), t);
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let t = parse_timestamp("2000-01-01").unwrap();
        assert_eq!(to_micros(&t), 946_684_800_000_000);
    }

    #[test]
    fn split_honors_nesting_and_quotes() {
        assert_eq!(split_top_level("a, [b, c], \"d, e\"", ','), vec!["a", " [b, c]", " \"d, e\""]);
    }
}
