//! Row types

use chrono::{DateTime, Utc};
use contracts::{
    Location, Reading, ReadingMetadata, StoreError, MAX_DESCRIPTION_LEN, MAX_TYPE_LEN,
    MAX_UNIT_LEN,
};
use serde::{Deserialize, Serialize};

/// A persisted reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub id: i64,
    pub sensor_id: i64,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub lat: f64,
    pub lng: f64,
    pub unit: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub description: String,
}

impl StoredReading {
    /// Back to the wire shape, dropping the row id
    pub fn to_reading(&self) -> Reading {
        Reading {
            sensor_id: self.sensor_id,
            timestamp: self.timestamp,
            value: self.value,
            metadata: ReadingMetadata {
                location: Location {
                    lat: self.lat,
                    lng: self.lng,
                },
                unit: self.unit.clone(),
                sensor_type: self.sensor_type.clone(),
                description: self.description.clone(),
            },
        }
    }
}

/// Column values for insert/update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    pub sensor_id: i64,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub lat: f64,
    pub lng: f64,
    pub unit: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub description: String,
}

impl NewReading {
    /// Check the row against the column constraints
    pub fn validate(&self) -> Result<(), StoreError> {
        check_len("unit", &self.unit, MAX_UNIT_LEN)?;
        check_len("type", &self.sensor_type, MAX_TYPE_LEN)?;
        check_len("description", &self.description, MAX_DESCRIPTION_LEN)?;
        if !self.value.is_finite() {
            return Err(StoreError::constraint("value", "must be a finite number"));
        }
        Ok(())
    }
}

fn check_len(column: &str, value: &str, max: usize) -> Result<(), StoreError> {
    let len = value.chars().count();
    if len > max {
        return Err(StoreError::constraint(
            column,
            format!("length {len} exceeds {max}"),
        ));
    }
    Ok(())
}

impl From<&Reading> for NewReading {
    fn from(reading: &Reading) -> Self {
        Self {
            sensor_id: reading.sensor_id,
            timestamp: reading.timestamp,
            value: reading.value,
            lat: reading.metadata.location.lat,
            lng: reading.metadata.location.lng,
            unit: reading.metadata.unit.clone(),
            sensor_type: reading.metadata.sensor_type.clone(),
            description: reading.metadata.description.clone(),
        }
    }
}
