//! # Generator
//!
//! Simulated sensors.
//!
//! - `SensorUnit` draws one reading per interval and publishes it
//! - `EmissionScheduler` runs every unit concurrently and owns shutdown:
//!   cancel, bounded grace period, then a single transport close

pub mod error;
pub mod scheduler;
pub mod unit;

#[cfg(test)]
mod testing;

pub use error::SchedulerError;
pub use scheduler::{EmissionScheduler, SchedulerReport, DEFAULT_GRACE_PERIOD};
pub use unit::{SensorUnit, UnitStats};
