// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::models::ValidationError;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `YYYY-MM-DD` for a calendar day.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parse an optional query-string bound. Absent or empty means unbounded.
///
/// `which` names the bound in the error (`start` or `end`).
pub fn parse_bound(
    value: Option<&str>,
    which: &str,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| {
            ValidationError::new(format!(
                "invalid {which} date format, expected ISO 8601 (e.g., 2025-08-23T17:00:00.000Z)"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_utc_rfc3339() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        assert_eq!(format_utc_rfc3339(dt), "2024-05-01T08:30:00Z");
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound(None, "start").unwrap(), None);
        assert_eq!(parse_bound(Some(""), "start").unwrap(), None);

        let parsed = parse_bound(Some("2024-05-01T02:00:00+02:00"), "start")
            .unwrap()
            .unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());

        let err = parse_bound(Some("2024-05-01"), "end").unwrap_err();
        assert!(err.0.starts_with("invalid end date format"));
    }
}
