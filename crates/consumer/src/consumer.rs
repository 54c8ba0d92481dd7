//! IngestConsumer - decode and persist one message at a time
//!
//! Per-message states:
//!
//! ```text
//! Received -> Decoded -> Inserted
//! Received -> DecodeFailed
//! Received -> Decoded -> InsertFailed
//! ```

use std::sync::Arc;
use std::time::Instant;

use contracts::{codec, Delivery, ReadingStore, Subscription};
use observability::MessageOutcomeLabel;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};

use crate::metrics::{ConsumerMetrics, MetricsSnapshot};

/// Consumer configuration
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Messages processed concurrently
    pub max_in_flight: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self { max_in_flight: 16 }
    }
}

/// Terminal state of one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Inserted { row_id: i64 },
    DecodeFailed,
    InsertFailed,
}

impl MessageOutcome {
    pub fn label(&self) -> MessageOutcomeLabel {
        match self {
            Self::Inserted { .. } => MessageOutcomeLabel::Inserted,
            Self::DecodeFailed => MessageOutcomeLabel::DecodeFailed,
            Self::InsertFailed => MessageOutcomeLabel::InsertFailed,
        }
    }
}

/// Ingest consumer
pub struct IngestConsumer<S> {
    store: Arc<S>,
    config: ConsumerConfig,
    metrics: Arc<ConsumerMetrics>,
}

impl<S> IngestConsumer<S>
where
    S: ReadingStore + Sync + 'static,
{
    pub fn new(store: S, config: ConsumerConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    pub fn with_shared_store(store: Arc<S>, config: ConsumerConfig) -> Self {
        Self {
            store,
            config,
            metrics: Arc::new(ConsumerMetrics::new()),
        }
    }

    /// Live counters, valid while and after `run`
    pub fn metrics(&self) -> Arc<ConsumerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Handle a single delivery
    pub async fn handle(&self, delivery: Delivery) -> MessageOutcome {
        process(self.store.as_ref(), &self.metrics, delivery).await
    }

    /// Consume until the subscription ends or `cancel` fires
    ///
    /// At most `max_in_flight` messages are processed at once. Messages
    /// already started are always finished before returning; messages still
    /// in the subscription when `cancel` fires are left there.
    #[instrument(
        name = "ingest_consumer_run",
        skip_all,
        fields(max_in_flight = self.config.max_in_flight)
    )]
    pub async fn run<Sub: Subscription>(
        &self,
        mut subscription: Sub,
        cancel: CancellationToken,
    ) -> MetricsSnapshot {
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let mut tasks = JoinSet::new();

        info!("Ingest consumer started");

        loop {
            // Permit before dequeue: a delivery leaves the subscription only
            // when a slot is free to process it.
            let permit = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Ingest consumer cancelled while at capacity");
                    break;
                }
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let delivery = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Ingest consumer cancelled");
                    break;
                }
                next = subscription.next() => match next {
                    Some(delivery) => delivery,
                    None => {
                        debug!("Subscription ended");
                        break;
                    }
                },
            };

            let store = Arc::clone(&self.store);
            let metrics = Arc::clone(&self.metrics);
            tasks.spawn(async move {
                let _permit = permit;
                observability::record_in_flight(metrics.enter());
                let outcome = process(store.as_ref(), &metrics, delivery).await;
                observability::record_in_flight(metrics.leave());
                outcome
            });

            while let Some(result) = tasks.try_join_next() {
                reap(result);
            }
        }

        while let Some(result) = tasks.join_next().await {
            reap(result);
        }

        let snapshot = self.metrics.snapshot();
        info!(
            received = snapshot.received,
            inserted = snapshot.inserted,
            decode_failures = snapshot.decode_failures,
            insert_failures = snapshot.insert_failures,
            redeliveries = snapshot.redeliveries,
            "Ingest consumer stopped"
        );
        snapshot
    }
}

async fn process<S: ReadingStore + Sync>(
    store: &S,
    metrics: &ConsumerMetrics,
    delivery: Delivery,
) -> MessageOutcome {
    metrics.inc_received();
    if delivery.attempt > 1 {
        metrics.inc_redeliveries();
        observability::record_redelivery();
        debug!(
            sequence = delivery.sequence,
            attempt = delivery.attempt,
            "Redelivered message"
        );
    }

    let reading = match codec::decode(&delivery.payload) {
        Ok(reading) => reading,
        Err(e) => {
            metrics.inc_decode_failures();
            let outcome = MessageOutcome::DecodeFailed;
            observability::record_message_outcome(outcome.label());
            error!(
                sequence = delivery.sequence,
                attempt = delivery.attempt,
                error = %e,
                payload = %e.payload(),
                "Dropping undecodable message"
            );
            return outcome;
        }
    };

    let started = Instant::now();
    let outcome = match store.insert(&reading).await {
        Ok(row_id) => {
            metrics.inc_inserted();
            observability::record_insert_latency_ms(started.elapsed().as_secs_f64() * 1000.0);
            trace!(sensor_id = reading.sensor_id, row_id, "Reading stored");
            MessageOutcome::Inserted { row_id }
        }
        Err(e) => {
            metrics.inc_insert_failures();
            error!(
                sequence = delivery.sequence,
                sensor_id = reading.sensor_id,
                timestamp = %reading.timestamp,
                value = reading.value,
                error = %e,
                "Dropping message after store failure"
            );
            MessageOutcome::InsertFailed
        }
    };
    observability::record_message_outcome(outcome.label());
    outcome
}

fn reap(result: Result<MessageOutcome, JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Message task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Utc;
    use contracts::{Location, Reading, ReadingMetadata, StoreError};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Store double: records rows, optionally fails one sensor, optionally slow
    #[derive(Default)]
    struct MockStore {
        rows: Mutex<Vec<Reading>>,
        fail_sensor: Option<i64>,
        delay: Option<Duration>,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl MockStore {
        fn rows(&self) -> Vec<Reading> {
            self.rows.lock().unwrap().clone()
        }
    }

    impl ReadingStore for MockStore {
        async fn insert(&self, reading: &Reading) -> Result<i64, StoreError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.current.fetch_sub(1, Ordering::SeqCst);

            if self.fail_sensor == Some(reading.sensor_id) {
                return Err(StoreError::Connection {
                    message: "database unreachable".into(),
                    source: None,
                });
            }
            let mut rows = self.rows.lock().unwrap();
            rows.push(reading.clone());
            Ok(rows.len() as i64)
        }
    }

    struct VecSubscription(VecDeque<Delivery>);

    impl Subscription for VecSubscription {
        async fn next(&mut self) -> Option<Delivery> {
            self.0.pop_front()
        }
    }

    /// Never yields a message
    struct IdleSubscription;

    impl Subscription for IdleSubscription {
        async fn next(&mut self) -> Option<Delivery> {
            std::future::pending().await
        }
    }

    fn reading(sensor_id: i64, value: f64) -> Reading {
        Reading {
            sensor_id,
            timestamp: Utc::now(),
            value,
            metadata: ReadingMetadata {
                location: Location::default(),
                unit: "C".into(),
                sensor_type: "temperature".into(),
                description: "sensor description".into(),
            },
        }
    }

    fn delivery(sequence: u64, payload: Bytes) -> Delivery {
        Delivery {
            sequence,
            attempt: 1,
            payload,
        }
    }

    fn encoded(sequence: u64, sensor_id: i64, value: f64) -> Delivery {
        delivery(sequence, codec::encode(&reading(sensor_id, value)).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_then_valid() {
        let consumer = IngestConsumer::new(MockStore::default(), ConsumerConfig::default());

        let outcome = consumer
            .handle(delivery(1, Bytes::from_static(b"{\"sensor_id\": \"oops\"")))
            .await;
        assert_eq!(outcome, MessageOutcome::DecodeFailed);
        assert!(consumer.store.rows().is_empty());
        assert_eq!(consumer.metrics().decode_failures(), 1);

        let outcome = consumer.handle(encoded(2, 1, 21.0)).await;
        assert_eq!(outcome, MessageOutcome::Inserted { row_id: 1 });
        assert_eq!(consumer.store.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_isolated() {
        let store = MockStore {
            fail_sensor: Some(7),
            ..Default::default()
        };
        let consumer = IngestConsumer::new(store, ConsumerConfig::default());

        assert_eq!(
            consumer.handle(encoded(1, 7, 1.0)).await,
            MessageOutcome::InsertFailed
        );
        assert!(matches!(
            consumer.handle(encoded(2, 8, 2.0)).await,
            MessageOutcome::Inserted { .. }
        ));

        let snapshot = consumer.metrics().snapshot();
        assert_eq!(snapshot.insert_failures, 1);
        assert_eq!(snapshot.inserted, 1);
        assert_eq!(consumer.store.rows()[0].sensor_id, 8);
    }

    #[tokio::test]
    async fn test_redelivery_is_persisted_again() {
        let consumer = IngestConsumer::new(MockStore::default(), ConsumerConfig::default());
        let first = encoded(1, 3, 4.0);
        let again = Delivery {
            attempt: 2,
            ..first.clone()
        };

        consumer.handle(first).await;
        consumer.handle(again).await;

        let rows = consumer.store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], rows[1]);
        assert_eq!(consumer.metrics().redeliveries(), 1);
    }

    #[tokio::test]
    async fn test_run_drains_subscription() {
        let store = Arc::new(MockStore {
            fail_sensor: Some(9),
            ..Default::default()
        });
        let consumer =
            IngestConsumer::with_shared_store(Arc::clone(&store), ConsumerConfig::default());

        let deliveries = VecDeque::from(vec![
            encoded(1, 1, 1.0),
            delivery(2, Bytes::from_static(b"not json")),
            encoded(3, 9, 3.0),
            encoded(4, 2, 4.0),
            delivery(5, Bytes::from_static(&[0xff, 0xfe])),
            encoded(6, 1, 6.0),
        ]);

        let snapshot = consumer
            .run(VecSubscription(deliveries), CancellationToken::new())
            .await;

        assert_eq!(snapshot.received, 6);
        assert_eq!(snapshot.inserted, 3);
        assert_eq!(snapshot.decode_failures, 2);
        assert_eq!(snapshot.insert_failures, 1);
        assert_eq!(store.rows().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_bounded() {
        let store = Arc::new(MockStore {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let consumer = IngestConsumer::with_shared_store(
            Arc::clone(&store),
            ConsumerConfig { max_in_flight: 2 },
        );

        let deliveries = (1..=10).map(|i| encoded(i, 1, i as f64)).collect();
        let snapshot = consumer
            .run(VecSubscription(deliveries), CancellationToken::new())
            .await;

        assert_eq!(snapshot.inserted, 10);
        assert!(store.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(consumer.metrics().in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_at_capacity_leaves_messages_queued() {
        let store = Arc::new(MockStore {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let consumer = IngestConsumer::with_shared_store(
            Arc::clone(&store),
            ConsumerConfig { max_in_flight: 1 },
        );
        let mut subscription =
            VecSubscription((1..=3).map(|i| encoded(i, 1, i as f64)).collect());

        let cancel = CancellationToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let snapshot = consumer.run(&mut subscription, cancel).await;
        canceller.await.unwrap();

        // The in-flight message finishes; the rest were never dequeued
        assert_eq!(snapshot.received, 1);
        assert_eq!(snapshot.inserted, 1);
        assert_eq!(store.rows().len(), 1);
        let queued: Vec<u64> = subscription.0.iter().map(|d| d.sequence).collect();
        assert_eq!(queued, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_cancel_stops_idle_consumer() {
        let consumer = IngestConsumer::new(MockStore::default(), ConsumerConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let snapshot = consumer.run(IdleSubscription, cancel).await;
        assert_eq!(snapshot, MetricsSnapshot::default());
    }
}
