//! Filters and pagination for reads

use chrono::{DateTime, Utc};
use contracts::StoreError;
use rusqlite::types::Value;

/// Rows returned when no limit is given
pub const DEFAULT_LIMIT: u64 = 100;
/// Largest accepted limit
pub const MAX_LIMIT: u64 = 1000;

/// Skip/limit window, ordered by row id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    skip: u64,
    limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    /// # Errors
    /// `StoreError::InvalidQuery` when `limit` exceeds [`MAX_LIMIT`] or
    /// `skip` does not fit the store's integer type
    pub fn new(skip: u64, limit: u64) -> Result<Self, StoreError> {
        if limit > MAX_LIMIT {
            return Err(StoreError::invalid_query(format!(
                "limit {limit} exceeds maximum {MAX_LIMIT}"
            )));
        }
        if i64::try_from(skip).is_err() {
            return Err(StoreError::invalid_query(format!("skip {skip} out of range")));
        }
        Ok(Self { skip, limit })
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Optional row filters, combined with AND
///
/// Time bounds are inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingFilter {
    pub sensor_id: Option<i64>,
    pub sensor_type: Option<String>,
    pub unit: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ReadingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sensor(mut self, sensor_id: i64) -> Self {
        self.sensor_id = Some(sensor_id);
        self
    }

    pub fn sensor_type(mut self, sensor_type: impl Into<String>) -> Self {
        self.sensor_type = Some(sensor_type.into());
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// `WHERE` clause (empty when unfiltered) and its positional parameters
    pub(crate) fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(sensor_id) = self.sensor_id {
            clauses.push("sensor_id = ?");
            params.push(Value::Integer(sensor_id));
        }
        if let Some(sensor_type) = &self.sensor_type {
            clauses.push("type = ?");
            params.push(Value::Text(sensor_type.clone()));
        }
        if let Some(unit) = &self.unit {
            clauses.push("unit = ?");
            params.push(Value::Text(unit.clone()));
        }
        if let Some(start) = self.start_time {
            clauses.push("timestamp >= ?");
            params.push(Value::Text(crate::sqlite::format_timestamp(&start)));
        }
        if let Some(end) = self.end_time {
            clauses.push("timestamp <= ?");
            params.push(Value::Text(crate::sqlite::format_timestamp(&end)));
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }
}
