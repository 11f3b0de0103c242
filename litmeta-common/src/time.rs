//! Timestamp utilities

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Timestamp `hours` after `from`
pub fn hours_after(from: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    from + Duration::hours(i64::from(hours))
}

/// Format a timestamp for the row contract (RFC 3339, second precision, `Z` suffix)
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a timestamp written by [`format_timestamp`] (or any RFC 3339 value)
///
/// Naive ISO values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_hours_after_adds_backoff() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let later = hours_after(base, 6);
        assert_eq!(later, Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_format_timestamp_uses_z_suffix() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01T12:30:05Z");
    }

    #[test]
    fn test_parse_timestamp_accepts_rfc3339_and_naive() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:05Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:05"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T15:30:05+03:00"), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
