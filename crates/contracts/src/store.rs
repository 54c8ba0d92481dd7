//! ReadingStore trait - persistence seam used by the consumer

use crate::{Reading, StoreError};

/// Insert contract of the persistent store
///
/// Each call is an independent, additive transaction.
#[trait_variant::make(ReadingStore: Send)]
pub trait LocalReadingStore {
    /// Persist one reading, returning the assigned row id
    async fn insert(&self, reading: &Reading) -> Result<i64, StoreError>;
}
