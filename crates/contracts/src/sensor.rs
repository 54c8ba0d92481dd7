//! Sensor definitions - Config Loader output
//!
//! `SensorEntry` mirrors one entry of the sensor file; `SensorSpec` is the
//! validated form a sensor unit is built from.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Location, ReadingMetadata};

pub const DEFAULT_RANGE: [i64; 2] = [0, 100];
pub const DEFAULT_UNIT: &str = "C";
pub const DEFAULT_SENSOR_TYPE: &str = "temperature";
pub const DEFAULT_DESCRIPTION: &str = "sensor description";

/// Column width of `unit`, in characters
pub const MAX_UNIT_LEN: usize = 10;
/// Column width of `type`, in characters
pub const MAX_TYPE_LEN: usize = 50;
/// Column width of `description`, in characters
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Raw sensor file: sensor id (string) -> entry
pub type SensorFile = BTreeMap<String, SensorEntry>;

/// One sensor as written in the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorEntry {
    /// `[min, max]`, inclusive
    #[serde(default)]
    pub range: Option<[i64; 2]>,

    /// Overrides the global emission interval
    #[serde(default)]
    pub interval_ms: Option<u64>,

    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default, rename = "type")]
    pub sensor_type: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub location: Option<Location>,
}

/// Inclusive integer value range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
}

impl ValueRange {
    /// Returns `None` when `min > max`
    pub fn new(min: i64, max: i64) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min as f64 && value <= self.max as f64
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_RANGE[0],
            max: DEFAULT_RANGE[1],
        }
    }
}

/// Validated sensor definition
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSpec {
    pub id: i64,
    pub range: ValueRange,
    pub interval: Duration,
    pub metadata: ReadingMetadata,
}

impl SensorSpec {
    /// Sensor with default metadata
    pub fn new(id: i64, range: ValueRange, interval: Duration) -> Self {
        Self {
            id,
            range,
            interval,
            metadata: ReadingMetadata {
                location: Location::default(),
                unit: DEFAULT_UNIT.to_string(),
                sensor_type: DEFAULT_SENSOR_TYPE.to_string(),
                description: DEFAULT_DESCRIPTION.to_string(),
            },
        }
    }
}

/// All sensors loaded at startup, ordered by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorFleet {
    pub sensors: Vec<SensorSpec>,
}

impl SensorFleet {
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&SensorSpec> {
        self.sensors.iter().find(|s| s.id == id)
    }
}
