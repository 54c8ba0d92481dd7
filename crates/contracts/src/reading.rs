//! Reading - the unit flowing through the whole pipeline
//!
//! Produced by a sensor unit, serialized for transport, persisted by the consumer.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Geographic position of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            lat: 10.0,
            lng: 10.0,
        }
    }
}

/// Fixed descriptive data attached to every reading of a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingMetadata {
    pub location: Location,

    /// Measurement unit (e.g. "C")
    pub unit: String,

    /// Sensor kind (e.g. "temperature")
    #[serde(rename = "type")]
    pub sensor_type: String,

    pub description: String,
}

/// One timestamped measurement
///
/// Immutable once built; it is serialized and transported as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sensor identifier, stable for the sensor's lifetime
    pub sensor_id: i64,

    /// Emission time (UTC)
    #[serde(deserialize_with = "deserialize_utc")]
    pub timestamp: DateTime<Utc>,

    /// Measured value, integral for generated readings
    pub value: f64,

    pub metadata: ReadingMetadata,
}

/// Accepts RFC 3339 timestamps and offset-less ISO-8601 ones (read as UTC).
fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid ISO-8601 timestamp: {raw:?}"))
    })
}

/// Parse an ISO-8601 timestamp, treating a missing offset as UTC
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_utc_rfc3339() {
        let ts = parse_utc("2024-05-01T12:30:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_utc_naive_is_utc() {
        let ts = parse_utc("2024-05-01T12:30:00.250000").unwrap();
        assert_eq!(
            ts.timestamp_millis(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
                .unwrap()
                .timestamp_millis()
                + 250
        );
    }

    #[test]
    fn test_parse_utc_rejects_garbage() {
        assert!(parse_utc("yesterday").is_none());
        assert!(parse_utc("2024-05-01").is_none());
    }

    #[test]
    fn test_default_location() {
        let loc = Location::default();
        assert_eq!(loc.lat, 10.0);
        assert_eq!(loc.lng, 10.0);
    }
}
