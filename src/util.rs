//! Identifier, timestamp and text helpers.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};

/// Generate a random version 4 UUID, lowercase and hyphenated.
pub fn uuid_v4() -> String {
    uuid::Uuid::new_v4().hyphenated().to_string()
}

/// Current UTC time as an RFC 3339 timestamp with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO 8601 timestamp or a bare `YYYY-MM-DD` date.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Truncate an ISO date/timestamp to just the date portion (YYYY-MM-DD).
pub fn truncate_to_date(s: &str) -> String {
    match s.find('T') {
        Some(t_pos) => s[..t_pos].to_string(),
        None => s.to_string(),
    }
}

/// `dcterms:modified` value: the timestamp in UTC, second precision, or now when unparseable.
pub fn modified_timestamp(s: &str) -> String {
    parse_timestamp(s)
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

/// Calendar year of the timestamp, or of today when unparseable.
pub fn year_of(s: &str) -> i32 {
    parse_timestamp(s).unwrap_or_else(Utc::now).year()
}

/// Escape text for XML content and attribute values.
///
/// Characters outside the XML 1.0 `Char` production are dropped.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if is_xml_char(c) => out.push(c),
            _ => {}
        }
    }
    out
}

/// Whether `c` matches the XML 1.0 `Char` production.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
