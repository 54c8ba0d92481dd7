//! # Transport
//!
//! In-process stand-in for the managed event stream.
//!
//! `MemoryTransport` is the publish half handed to the emission scheduler,
//! `MemorySubscription` the consume half handed to the ingest consumer. Both
//! sit on one bounded `async-channel`; a full buffer fails the publish rather
//! than stalling the sensor.

mod config;
mod memory;

pub use config::{MemoryTransportConfig, RedeliveryPolicy, DEFAULT_TRANSPORT_NAME};
pub use memory::{MemorySubscription, MemoryTransport, TransportStats};
