use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Format of the timestamp portion of a line header, e.g.
/// `2018-08-08 11:16:31.950 +1000`.
pub const HEADER_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %z";

/// Plain ISO-like flow timestamp, e.g. `2019-10-01 12:00:00.123`.
const FLOW_ISO_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// `java.util.Date#toString` output with the zone name removed, e.g.
/// `Tue Oct 01 12:00:00 2019`.
const FLOW_JAVA_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

static JAVA_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<head>\w{3} \w{3} \d{1,2} \d{2}:\d{2}:\d{2}) (?P<zone>\S+) (?P<year>\d{4})$")
        .expect("java date regex is valid")
});

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("failed to parse timestamp '{value}' with format '{format}': {source}")]
    ParseError {
        value: String,
        format: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Parse the header timestamp and its zone offset, converting to UTC.
pub fn parse_header_timestamp(ts: &str, offset: &str) -> Result<DateTime<Utc>, TimestampError> {
    let value = format!("{} {}", ts, offset);
    DateTime::<FixedOffset>::parse_from_str(&value, HEADER_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TimestampError::ParseError {
            value,
            format: HEADER_FORMAT.to_string(),
            source: e,
        })
}

/// Parse a timestamp embedded in a flow-run payload.
///
/// Two textual formats have been written over time; both are tried. The
/// literal `NA`, empty values and anything unparseable resolve to `None`.
/// Values carry no zone information and are taken as UTC.
pub fn parse_flow_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("NA") {
        return None;
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(value, FLOW_ISO_FORMAT) {
        return Some(Utc.from_utc_datetime(&ndt));
    }

    let captures = JAVA_DATE.captures(value)?;
    let without_zone = format!("{} {}", &captures["head"], &captures["year"]);
    NaiveDateTime::parse_from_str(&without_zone, FLOW_JAVA_FORMAT)
        .ok()
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_timestamp_with_offset() {
        let result = parse_header_timestamp("2018-08-08 11:16:31.950", "+1000").unwrap();
        assert_eq!(result.to_rfc3339(), "2018-08-08T01:16:31.950+00:00");
    }

    #[test]
    fn test_header_timestamp_negative_offset() {
        let result = parse_header_timestamp("2019-01-02 23:30:00.000", "-0500").unwrap();
        assert_eq!(result.to_rfc3339(), "2019-01-03T04:30:00+00:00");
    }

    #[test]
    fn test_header_timestamp_garbage() {
        let result = parse_header_timestamp("2019-13-45 99:99:99.000", "+0000");
        assert!(matches!(result, Err(TimestampError::ParseError { .. })));
    }

    #[test]
    fn test_flow_iso_format() {
        let result = parse_flow_timestamp("2019-10-01 12:00:00.123").unwrap();
        assert_eq!(result.to_rfc3339(), "2019-10-01T12:00:00.123+00:00");
    }

    #[test]
    fn test_flow_java_format() {
        let result = parse_flow_timestamp("Tue Oct 01 12:00:00 UTC 2019").unwrap();
        assert_eq!(result.to_rfc3339(), "2019-10-01T12:00:00+00:00");
    }

    #[test]
    fn test_flow_na_is_absent() {
        assert!(parse_flow_timestamp("NA").is_none());
        assert!(parse_flow_timestamp("").is_none());
        assert!(parse_flow_timestamp("yesterday-ish").is_none());
    }
}
