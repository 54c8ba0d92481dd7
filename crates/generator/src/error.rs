//! Generator error types

use thiserror::Error;

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Nothing to schedule
    #[error("no sensor units configured")]
    NoUnits,

    /// A unit task still holds the transport after shutdown
    #[error("transport still shared after all sensor units stopped")]
    TransportShared,
}
