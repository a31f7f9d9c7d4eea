//! Attendance record wire and ledger types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single attendance mark
///
/// The timestamp is client-assigned at submission time for optimistic
/// entries and superseded by the store-assigned value once the authoritative
/// subscription delivers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// When the mark was made
    #[serde(with = "flex_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Keypad roll number (3 characters: digits, `*`, `#`)
    pub roll: String,
    /// Display name from verification or roster lookup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Presence-sensor flag; always true for kiosk-produced entries
    pub proximity: bool,
    /// Whether identity verification succeeded (false for fallback commits)
    #[serde(default)]
    pub verified: bool,
}

impl AttendanceRecord {
    /// Attendance day this record belongs to (UTC date portion)
    pub fn day(&self) -> NaiveDate {
        rollcall_common::time::day_key(self.timestamp)
    }

    /// Whether this record marks `roll` present on `day`
    pub fn marks(&self, roll: &str, day: NaiveDate) -> bool {
        self.roll == roll && self.day() == day
    }
}

/// Confirmation state of a locally created entry
///
/// Optimistic entries start Pending, become Confirmed when the remote append
/// is acknowledged, and are replaced by Authoritative copies once the store
/// subscription delivers them. A failed append removes the entry instead of
/// leaving it indistinguishable from a confirmed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Created locally, remote append not yet acknowledged
    Pending,
    /// Remote append acknowledged, authoritative copy not yet delivered
    Confirmed,
    /// Delivered by the store subscription
    Authoritative,
}

/// Store-tolerant timestamp encoding
///
/// The store's server-timestamp sentinel materializes as epoch milliseconds,
/// while locally written entries carry ISO-8601 strings; both must parse.
mod flex_timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Millis(i64),
        Text(String),
    }

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Wire::deserialize(deserializer)? {
            Wire::Millis(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| serde::de::Error::custom("timestamp out of range")),
            Wire::Text(text) => text
                .parse::<DateTime<Utc>>()
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(timestamp: DateTime<Utc>, roll: &str) -> AttendanceRecord {
        AttendanceRecord {
            timestamp,
            roll: roll.to_string(),
            name: None,
            proximity: true,
            verified: true,
        }
    }

    #[test]
    fn test_deserializes_epoch_millis_timestamp() {
        let json = r#"{"timestamp": 1735737000000, "roll": "101", "proximity": true}"#;
        let parsed: AttendanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.timestamp.timestamp_millis(), 1_735_737_000_000);
        assert!(!parsed.verified);
    }

    #[test]
    fn test_deserializes_iso_timestamp() {
        let json =
            r#"{"timestamp": "2025-01-01T12:30:00Z", "roll": "101", "proximity": true, "verified": true}"#;
        let parsed: AttendanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.timestamp,
            Utc.with_ymd_and_hms(2025, 1, 1, 12, 30, 0).unwrap()
        );
        assert!(parsed.verified);
    }

    #[test]
    fn test_serializes_timestamp_as_iso() {
        let rec = record(Utc.with_ymd_and_hms(2025, 1, 1, 12, 30, 0).unwrap(), "042");
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json["timestamp"].as_str().unwrap().starts_with("2025-01-01T12:30:00"));
        // Absent name stays off the wire
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_marks_compares_roll_and_day() {
        let rec = record(Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap(), "101");
        let same_day = rollcall_common::time::day_key(
            Utc.with_ymd_and_hms(2025, 1, 1, 17, 0, 0).unwrap(),
        );
        let next_day = rollcall_common::time::day_key(
            Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap(),
        );

        assert!(rec.marks("101", same_day));
        assert!(!rec.marks("101", next_day));
        assert!(!rec.marks("102", same_day));
    }
}
