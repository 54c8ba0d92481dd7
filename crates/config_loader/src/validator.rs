//! Sensor file validation
//!
//! Rules:
//! - at least one sensor
//! - sensor ids parse as integers and are unique once parsed ("01" == "1")
//! - range min <= max
//! - interval > 0
//! - text fields fit the store columns

use std::collections::HashSet;
use std::time::Duration;

use contracts::{
    ContractError, ReadingMetadata, SensorEntry, SensorFile, SensorFleet, SensorSpec, ValueRange,
    DEFAULT_DESCRIPTION, DEFAULT_RANGE, DEFAULT_SENSOR_TYPE, DEFAULT_UNIT, MAX_DESCRIPTION_LEN,
    MAX_TYPE_LEN, MAX_UNIT_LEN,
};

/// Validate the raw file and build the fleet
///
/// Returns the first error encountered.
pub fn validate(
    file: &SensorFile,
    default_interval: Duration,
) -> Result<SensorFleet, ContractError> {
    if file.is_empty() {
        return Err(ContractError::config_validation(
            "sensors",
            "at least one sensor must be configured",
        ));
    }

    let mut seen = HashSet::new();
    let mut sensors = Vec::with_capacity(file.len());

    for (key, entry) in file {
        let spec = build_spec(key, entry, default_interval)?;
        if !seen.insert(spec.id) {
            return Err(ContractError::config_validation(
                format!("sensors[{key}]"),
                format!("duplicate sensor_id {}", spec.id),
            ));
        }
        sensors.push(spec);
    }

    sensors.sort_by_key(|s| s.id);
    Ok(SensorFleet { sensors })
}

fn build_spec(
    key: &str,
    entry: &SensorEntry,
    default_interval: Duration,
) -> Result<SensorSpec, ContractError> {
    let id = parse_id(key)?;
    let range = validate_range(key, entry.range.unwrap_or(DEFAULT_RANGE))?;
    let interval = validate_interval(key, entry.interval_ms, default_interval)?;

    let metadata = ReadingMetadata {
        location: entry.location.unwrap_or_default(),
        unit: text_field(key, "unit", entry.unit.as_deref(), DEFAULT_UNIT, MAX_UNIT_LEN)?,
        sensor_type: text_field(
            key,
            "type",
            entry.sensor_type.as_deref(),
            DEFAULT_SENSOR_TYPE,
            MAX_TYPE_LEN,
        )?,
        description: text_field(
            key,
            "description",
            entry.description.as_deref(),
            DEFAULT_DESCRIPTION,
            MAX_DESCRIPTION_LEN,
        )?,
    };

    Ok(SensorSpec {
        id,
        range,
        interval,
        metadata,
    })
}

fn parse_id(key: &str) -> Result<i64, ContractError> {
    key.trim().parse::<i64>().map_err(|_| {
        ContractError::config_validation(
            format!("sensors[{key}]"),
            "sensor id must be an integer",
        )
    })
}

fn validate_range(key: &str, [min, max]: [i64; 2]) -> Result<ValueRange, ContractError> {
    ValueRange::new(min, max).ok_or_else(|| {
        ContractError::config_validation(
            format!("sensors[{key}].range"),
            format!("min ({min}) must be <= max ({max})"),
        )
    })
}

fn validate_interval(
    key: &str,
    interval_ms: Option<u64>,
    default_interval: Duration,
) -> Result<Duration, ContractError> {
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or(default_interval);
    if interval.is_zero() {
        return Err(ContractError::config_validation(
            format!("sensors[{key}].interval_ms"),
            "interval must be > 0",
        ));
    }
    Ok(interval)
}

fn text_field(
    key: &str,
    field: &str,
    value: Option<&str>,
    default: &str,
    max_len: usize,
) -> Result<String, ContractError> {
    let value = value.unwrap_or(default);
    if value.is_empty() || value.chars().count() > max_len {
        return Err(ContractError::config_validation(
            format!("sensors[{key}].{field}"),
            format!("must be 1..={max_len} characters"),
        ));
    }
    Ok(value.to_string())
}
