// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Normalize a Strava timestamp to RFC3339 with a `Z` suffix.
///
/// Unparseable input is returned unchanged rather than dropped.
pub fn normalize_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| format_utc_rfc3339(dt.with_timezone(&Utc)))
        .unwrap_or_else(|_| raw.to_string())
}

/// Current time as Unix seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp("2024-01-15T10:30:00Z"),
            "2024-01-15T10:30:00Z"
        );
        assert_eq!(
            normalize_timestamp("2024-01-15T10:30:00+02:00"),
            "2024-01-15T08:30:00Z"
        );
        assert_eq!(normalize_timestamp("yesterday"), "yesterday");
    }
}
