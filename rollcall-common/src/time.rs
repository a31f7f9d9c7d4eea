//! Timestamp and calendar-day utilities

use chrono::{DateTime, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Calendar-day key for a timestamp: the UTC date portion.
///
/// Duplicate suppression compares day keys, so two records belong to the
/// same attendance day exactly when their UTC dates match.
pub fn day_key(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_day_key_uses_utc_date_portion() {
        // 23:59 UTC and 00:01 UTC the next day are different attendance days
        let late = Utc.with_ymd_and_hms(2025, 3, 14, 23, 59, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2025, 3, 15, 0, 1, 0).unwrap();
        assert_ne!(day_key(late), day_key(early));

        let same_day = Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap();
        assert_eq!(day_key(late), day_key(same_day));
    }

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(0), Duration::from_millis(0));
        assert_eq!(millis_to_duration(1000), Duration::from_secs(1));
        assert_eq!(millis_to_duration(2500).as_millis(), 2500);
    }
}
