//! Consumer counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared by all message tasks
#[derive(Debug, Default)]
pub struct ConsumerMetrics {
    received: AtomicU64,
    inserted: AtomicU64,
    decode_failures: AtomicU64,
    insert_failures: AtomicU64,
    /// Deliveries with attempt > 1
    redeliveries: AtomicU64,
    in_flight: AtomicUsize,
}

impl ConsumerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inserted(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_inserted(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_decode_failures(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn insert_failures(&self) -> u64 {
        self.insert_failures.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_insert_failures(&self) {
        self.insert_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn redeliveries(&self) -> u64 {
        self.redeliveries.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_redeliveries(&self) {
        self.redeliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns the new in-flight count
    pub(crate) fn enter(&self) -> usize {
        self.in_flight.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the new in-flight count
    pub(crate) fn leave(&self) -> usize {
        self.in_flight.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received(),
            inserted: self.inserted(),
            decode_failures: self.decode_failures(),
            insert_failures: self.insert_failures(),
            redeliveries: self.redeliveries(),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub inserted: u64,
    pub decode_failures: u64,
    pub insert_failures: u64,
    pub redeliveries: u64,
}

impl MetricsSnapshot {
    /// Messages that ended in a drop
    pub fn dropped(&self) -> u64 {
        self.decode_failures + self.insert_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = ConsumerMetrics::new();
        metrics.inc_received();
        metrics.inc_received();
        metrics.inc_inserted();
        metrics.inc_decode_failures();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.inserted, 1);
        assert_eq!(snapshot.dropped(), 1);
    }

    #[test]
    fn test_in_flight_tracking() {
        let metrics = ConsumerMetrics::new();
        assert_eq!(metrics.enter(), 1);
        assert_eq!(metrics.enter(), 2);
        assert_eq!(metrics.leave(), 1);
        assert_eq!(metrics.in_flight(), 1);
    }
}
