//! Time related utils.

use crate::{Error, Result};
use chrono::Utc;

/// The timestamp type used across signing.
pub type DateTime = chrono::DateTime<Utc>;

/// Get the current time in UTC.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a timestamp as `YYYYMMDD`, the date component of a credential
/// scope.
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format a timestamp as `YYYYMMDDTHHMMSSZ`, the compact ISO 8601 form used
/// in `x-amz-date` and string-to-sign.
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Parse an RFC 3339 timestamp like `2023-01-01T12:00:00Z`.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::unexpected(format!("failed to parse timestamp {s}")).with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format() {
        let t = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        assert_eq!(format_date(t), "20150830");
        assert_eq!(format_iso8601(t), "20150830T123600Z");
    }

    #[test]
    fn test_parse_rfc3339() {
        let t = parse_rfc3339("2015-08-30T12:36:00Z").unwrap();
        assert_eq!(format_iso8601(t), "20150830T123600Z");
        assert!(parse_rfc3339("not a time").is_err());
    }
}
