//! Pipeline metrics
//!
//! Thin helpers over the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use metrics::{counter, gauge, histogram};

/// Outcome label for a consumed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcomeLabel {
    Inserted,
    DecodeFailed,
    InsertFailed,
}

impl MessageOutcomeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::DecodeFailed => "decode_failed",
            Self::InsertFailed => "insert_failed",
        }
    }
}

/// Record a reading handed to the transport
pub fn record_reading_published(sensor_id: i64) {
    counter!(
        "sensor_pipeline_readings_published_total",
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
}

/// Record a failed publish
pub fn record_publish_failure(sensor_id: i64) {
    counter!(
        "sensor_pipeline_publish_failures_total",
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
}

/// Record the terminal state of one consumed message
pub fn record_message_outcome(outcome: MessageOutcomeLabel) {
    counter!(
        "sensor_pipeline_messages_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record a redelivered message (attempt > 1)
pub fn record_redelivery() {
    counter!("sensor_pipeline_redeliveries_total").increment(1);
}

/// Record store insert latency
pub fn record_insert_latency_ms(latency_ms: f64) {
    histogram!("sensor_pipeline_insert_latency_ms").record(latency_ms);
}

/// Record messages currently being processed by the consumer
pub fn record_in_flight(count: usize) {
    gauge!("sensor_pipeline_consumer_in_flight").set(count as f64);
}

/// Record number of running sensor units
pub fn record_active_units(count: usize) {
    gauge!("sensor_pipeline_active_sensor_units").set(count as f64);
}
