//! Bounded in-memory transport

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::{bounded, Receiver, Sender, TrySendError};
use bytes::Bytes;
use contracts::{Delivery, Subscription, Transport, TransportError};
use tracing::{debug, trace, warn};

use crate::config::{MemoryTransportConfig, RedeliveryPolicy};

/// Counters shared by both halves
#[derive(Debug, Default)]
pub struct TransportStats {
    /// Messages accepted by `publish`
    pub published: AtomicU64,
    /// Publishes rejected because the buffer was full
    pub rejected: AtomicU64,
    /// Duplicate deliveries enqueued
    pub redelivered: AtomicU64,
}

impl TransportStats {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn redelivered(&self) -> u64 {
        self.redelivered.load(Ordering::Relaxed)
    }
}

/// Publish half
pub struct MemoryTransport {
    name: String,
    tx: Sender<Delivery>,
    /// Last sequence handed out; held across `try_send` so numbers stay
    /// contiguous and follow channel order
    sequence: Mutex<u64>,
    redelivery: RedeliveryPolicy,
    stats: Arc<TransportStats>,
}

/// Consume half
pub struct MemorySubscription {
    name: String,
    rx: Receiver<Delivery>,
}

impl MemoryTransport {
    /// Create a connected transport/subscription pair
    pub fn channel(config: MemoryTransportConfig) -> (MemoryTransport, MemorySubscription) {
        let (tx, rx) = bounded(config.capacity.max(1));
        debug!(
            transport = %config.name,
            capacity = config.capacity,
            redelivery = ?config.redelivery,
            "memory transport created"
        );

        let transport = MemoryTransport {
            name: config.name.clone(),
            tx,
            sequence: Mutex::new(0),
            redelivery: config.redelivery,
            stats: Arc::new(TransportStats::default()),
        };
        let subscription = MemorySubscription {
            name: config.name,
            rx,
        };
        (transport, subscription)
    }

    /// Shared counters, still readable after `close`
    pub fn stats(&self) -> Arc<TransportStats> {
        Arc::clone(&self.stats)
    }

    /// Messages waiting to be consumed
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Non-blocking; never waits for buffer space
    fn enqueue(&self, message: Bytes) -> Result<(), TransportError> {
        let mut last = self.sequence.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = *last + 1;
        let delivery = Delivery {
            sequence,
            attempt: 1,
            payload: message,
        };
        let duplicate = self.redelivery.redeliver(sequence).then(|| Delivery {
            attempt: 2,
            ..delivery.clone()
        });

        match self.tx.try_send(delivery) {
            Ok(()) => {
                *last = sequence;
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                trace!(transport = %self.name, sequence, "message enqueued");
            }
            Err(TrySendError::Full(_)) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(TransportError::publish(&self.name, "buffer full"));
            }
            Err(TrySendError::Closed(_)) => {
                return Err(TransportError::closed(&self.name));
            }
        }

        if let Some(duplicate) = duplicate {
            match self.tx.try_send(duplicate) {
                Ok(()) => {
                    self.stats.redelivered.fetch_add(1, Ordering::Relaxed);
                    trace!(transport = %self.name, sequence, "message redelivered");
                }
                // First copy is queued; a lost duplicate is fine.
                Err(e) => {
                    trace!(transport = %self.name, sequence, error = %e, "redelivery skipped");
                }
            }
        }
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, message: Bytes) -> Result<(), TransportError> {
        self.enqueue(message)
    }

    async fn close(self) -> Result<(), TransportError> {
        if !self.tx.close() {
            warn!(transport = %self.name, "channel was already closed by the consumer side");
            return Err(TransportError::shutdown(
                &self.name,
                "channel already closed",
            ));
        }
        debug!(
            transport = %self.name,
            published = self.stats.published(),
            pending = self.tx.len(),
            "memory transport closed"
        );
        Ok(())
    }
}

impl MemorySubscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Messages buffered and not yet consumed
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Remove every buffered message without waiting
    pub fn take_pending(&mut self) -> Vec<Delivery> {
        let mut pending = Vec::with_capacity(self.rx.len());
        while let Ok(delivery) = self.rx.try_recv() {
            pending.push(delivery);
        }
        pending
    }
}

impl Subscription for MemorySubscription {
    /// Buffered deliveries are still handed out after the publisher closed.
    async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(capacity: usize) -> (MemoryTransport, MemorySubscription) {
        MemoryTransport::channel(MemoryTransportConfig::new("test", capacity))
    }

    #[tokio::test]
    async fn test_publish_then_consume_in_order() {
        let (transport, mut subscription) = pair(8);

        for payload in ["a", "b", "c"] {
            transport.publish(Bytes::from(payload)).await.unwrap();
        }
        transport.close().await.unwrap();

        let mut received = Vec::new();
        while let Some(delivery) = subscription.next().await {
            assert_eq!(delivery.attempt, 1);
            received.push((delivery.sequence, delivery.payload));
        }
        assert_eq!(
            received,
            vec![
                (1, Bytes::from("a")),
                (2, Bytes::from("b")),
                (3, Bytes::from("c")),
            ]
        );
    }

    #[tokio::test]
    async fn test_full_buffer_rejects_publish() {
        let (transport, _subscription) = pair(1);
        let stats = transport.stats();

        transport.publish(Bytes::from("first")).await.unwrap();
        let err = transport.publish(Bytes::from("second")).await.unwrap_err();

        assert!(matches!(err, TransportError::Publish { .. }));
        assert_eq!(stats.published(), 1);
        assert_eq!(stats.rejected(), 1);
    }

    #[tokio::test]
    async fn test_rejected_publish_keeps_sequence_contiguous() {
        let (transport, mut subscription) = pair(1);

        transport.publish(Bytes::from("a")).await.unwrap();
        assert!(transport.publish(Bytes::from("dropped")).await.is_err());
        assert_eq!(subscription.next().await.unwrap().sequence, 1);

        transport.publish(Bytes::from("b")).await.unwrap();
        let delivery = subscription.next().await.unwrap();
        assert_eq!(delivery.sequence, 2);
        assert_eq!(delivery.payload, Bytes::from("b"));
    }

    #[tokio::test]
    async fn test_take_pending_after_close() {
        let (transport, mut subscription) = pair(8);
        for payload in ["a", "b", "c"] {
            transport.publish(Bytes::from(payload)).await.unwrap();
        }
        transport.close().await.unwrap();

        assert_eq!(subscription.next().await.unwrap().sequence, 1);
        assert_eq!(subscription.pending(), 2);

        let rest: Vec<u64> = subscription
            .take_pending()
            .iter()
            .map(|d| d.sequence)
            .collect();
        assert_eq!(rest, vec![2, 3]);
        assert_eq!(subscription.pending(), 0);
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn test_publish_after_subscriber_dropped() {
        let (transport, subscription) = pair(4);
        drop(subscription);

        let err = transport.publish(Bytes::from("x")).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed { .. }));

        let err = transport.close().await.unwrap_err();
        assert!(matches!(err, TransportError::Shutdown { .. }));
    }

    #[tokio::test]
    async fn test_redelivery_duplicates_every_nth() {
        let config = MemoryTransportConfig::new("test", 16)
            .with_redelivery(RedeliveryPolicy::EveryNth(2));
        let (transport, mut subscription) = MemoryTransport::channel(config);
        let stats = transport.stats();

        for i in 0..4 {
            transport.publish(Bytes::from(format!("m{i}"))).await.unwrap();
        }
        transport.close().await.unwrap();

        let mut deliveries = Vec::new();
        while let Some(delivery) = subscription.next().await {
            deliveries.push(delivery);
        }

        assert_eq!(deliveries.len(), 6);
        assert_eq!(stats.redelivered(), 2);
        let redelivered: Vec<u64> = deliveries
            .iter()
            .filter(|d| d.attempt == 2)
            .map(|d| d.sequence)
            .collect();
        assert_eq!(redelivered, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_shared_publish_from_tasks() {
        let (transport, mut subscription) = pair(64);
        let transport = Arc::new(transport);

        let mut handles = Vec::new();
        for task in 0..4 {
            let transport = Arc::clone(&transport);
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    let payload = Bytes::from(format!("{task}-{i}"));
                    transport.publish(payload).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let transport = Arc::try_unwrap(transport).ok().unwrap();
        transport.close().await.unwrap();

        let mut sequences = Vec::new();
        while let Some(delivery) = subscription.next().await {
            sequences.push(delivery.sequence);
        }
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=40).collect::<Vec<u64>>());
    }
}
