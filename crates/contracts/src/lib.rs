//! # Contracts
//!
//! Frozen interface contracts shared by every pipeline crate: the `Reading`
//! data model, its wire codec, the transport and store seams, and the layered
//! error types. Business crates depend on this crate only, never on each other.
//!
//! ## Time Model
//! - `Reading::timestamp` is wall-clock UTC taken at emission time
//! - Per-sensor timestamps are non-decreasing; no cross-sensor ordering exists

pub mod codec;
mod error;
mod reading;
mod sensor;
mod store;
mod transport;

pub use error::*;
pub use reading::*;
pub use sensor::*;
pub use store::{LocalReadingStore, ReadingStore};
pub use transport::{Delivery, LocalSubscription, LocalTransport, Subscription, Transport};
