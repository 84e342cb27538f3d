//! Time related utils.

use crate::{Error, Result};
use chrono::{NaiveDateTime, Utc};

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: `20220301`
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format time into ISO8601: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Parse time from ISO8601: `20220313T072004Z`
pub fn parse_iso8601(s: &str) -> Result<DateTime> {
    let t = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%SZ").map_err(|e| {
        Error::unexpected(format!("failed to parse {s} as ISO8601 time")).with_source(e)
    })?;
    Ok(t.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format() {
        let t = Utc
            .with_ymd_and_hms(2022, 3, 13, 7, 20, 4)
            .single()
            .expect("time must be valid");

        assert_eq!(format_date(t), "20220313");
        assert_eq!(format_iso8601(t), "20220313T072004Z");
    }

    #[test]
    fn test_parse_iso8601() {
        let t = parse_iso8601("20220101T000000Z").expect("time must be valid");

        assert_eq!(format_iso8601(t), "20220101T000000Z");
        assert_eq!(format_date(t), "20220101");
        assert!(parse_iso8601("2022-01-01").is_err());
    }
}
