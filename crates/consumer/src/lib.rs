//! # Consumer
//!
//! Turns transport deliveries into stored rows.
//!
//! Every message is handled on its own: a payload that fails to decode or a
//! row the store rejects is logged and dropped without touching any other
//! message. There is no retry and no deduplication at this layer.

mod consumer;
mod metrics;

pub use consumer::{ConsumerConfig, IngestConsumer, MessageOutcome};
pub use metrics::{ConsumerMetrics, MetricsSnapshot};
