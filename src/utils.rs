//! Small shared helpers: lenient numeric coercion, end-date parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Coerce an optional numeric-looking string to a non-negative Decimal.
/// Parse failures and negative values map to zero.
pub fn coerce_volume(raw: Option<&str>) -> Decimal {
    raw.and_then(|s| s.parse::<Decimal>().ok())
        .filter(|v| *v >= Decimal::ZERO)
        .unwrap_or(Decimal::ZERO)
}

/// Parse a market end date. The API is inconsistent about formats, so try
/// RFC 3339 first, then the bare variants seen in the wild.
pub fn parse_end_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Hours remaining until `end` as seen from `now`. Negative once expired.
pub fn hours_until(end: DateTime<Utc>, now: DateTime<Utc>) -> Decimal {
    Decimal::from((end - now).num_seconds()) / dec!(3600)
}

/// Truncate display text, appending an ellipsis when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}

/// Format a probability as a percentage for log lines and evidence.
pub fn fmt_pct(value: Decimal) -> String {
    format!("{:.1}%", value * dec!(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_coerce_volume() {
        assert_eq!(coerce_volume(Some("1234.5")), dec!(1234.5));
        assert_eq!(coerce_volume(Some("not-a-number")), Decimal::ZERO);
        assert_eq!(coerce_volume(Some("-10")), Decimal::ZERO);
        assert_eq!(coerce_volume(None), Decimal::ZERO);
    }

    #[test]
    fn test_parse_end_date_formats() {
        assert!(parse_end_date("2026-03-01T12:00:00Z").is_some());
        assert!(parse_end_date("2026-03-01T12:00:00.123Z").is_some());
        assert!(parse_end_date("2026-03-01 12:00:00").is_some());
        assert!(parse_end_date("2026-03-01").is_some());
        assert!(parse_end_date("next tuesday").is_none());
    }

    #[test]
    fn test_hours_until() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(hours_until(end, now), dec!(12));
        assert_eq!(hours_until(now, end), dec!(-12));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer question text", 10), "a much ...");
    }

    #[test]
    fn test_fmt_pct() {
        assert_eq!(fmt_pct(dec!(0.345)), "34.5%");
    }
}
