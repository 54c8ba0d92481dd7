//! # Integration Tests
//!
//! End-to-end tests across crate boundaries:
//! - wire shape agreed by producer and consumer
//! - sensor file -> generator -> memory transport -> consumer -> SQLite
//! - failure isolation and redelivery on the consumer path

#[cfg(test)]
mod contract_tests {
    use chrono::{TimeZone, Utc};
    use contracts::{codec, Location, Reading, ReadingMetadata};

    #[test]
    fn test_wire_payload_shape() {
        let reading = Reading {
            sensor_id: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            value: 22.0,
            metadata: ReadingMetadata {
                location: Location::default(),
                unit: "C".into(),
                sensor_type: "temperature".into(),
                description: "sensor description".into(),
            },
        };

        let payload = codec::encode(&reading).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        assert_eq!(json["sensor_id"], 1);
        assert_eq!(json["value"], 22.0);
        assert_eq!(json["metadata"]["type"], "temperature");
        assert_eq!(json["metadata"]["location"]["lat"], 10.0);
        assert_eq!(codec::decode(&payload).unwrap(), reading);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use consumer::{ConsumerConfig, IngestConsumer};
    use contracts::{codec, Subscription, Transport};
    use generator::EmissionScheduler;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use store::{Page, ReadingFilter, SqliteStore};
    use tokio_util::sync::CancellationToken;
    use transport::{MemoryTransport, MemoryTransportConfig, RedeliveryPolicy};

    fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
        SqliteStore::open(dir.path().join("sensor_data.db")).unwrap()
    }

    /// End-to-end: sensor file -> EmissionScheduler -> MemoryTransport
    /// -> IngestConsumer -> SqliteStore
    #[tokio::test]
    async fn test_e2e_fleet_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let fleet = ConfigLoader::load_from_str(
            r#"
            [1]
            range = [20, 25]
            interval_ms = 40

            [2]
            range = [0, 5]
            interval_ms = 60
            type = "humidity"
            unit = "%"
            "#,
            ConfigFormat::Toml,
            Duration::from_secs(1),
        )
        .unwrap();

        let (transport, subscription) = MemoryTransport::channel(MemoryTransportConfig::default());
        let consumer = IngestConsumer::new(store.clone(), ConsumerConfig::default());
        let consumer_task = tokio::spawn(async move {
            consumer
                .run(subscription, CancellationToken::new())
                .await
        });

        let scheduler = EmissionScheduler::from_fleet(&fleet, Duration::from_secs(1)).unwrap();
        let report = scheduler
            .run(transport, tokio::time::sleep(Duration::from_millis(300)))
            .await
            .unwrap();
        assert!(report.transport_closed);

        // Transport closed: the consumer ends once the buffer is empty
        let consumed = consumer_task.await.unwrap();
        assert_eq!(consumed.inserted, report.published());
        assert_eq!(consumed.dropped(), 0);

        let total = store.count(ReadingFilter::new()).await.unwrap();
        assert_eq!(total, report.published());

        let sensor_1 = store
            .list(ReadingFilter::new().sensor(1), Page::default())
            .await
            .unwrap();
        assert!(sensor_1.len() >= 2);
        assert!(sensor_1.iter().all(|r| (20.0..=25.0).contains(&r.value)));

        let humidity = store
            .list(
                ReadingFilter::new().sensor_type("humidity").unit("%"),
                Page::default(),
            )
            .await
            .unwrap();
        assert!(!humidity.is_empty());
        assert!(humidity.iter().all(|r| r.sensor_id == 2));
    }

    /// Malformed message between valid ones: zero rows for it, the rest stored
    #[tokio::test]
    async fn test_malformed_message_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let (transport, subscription) = MemoryTransport::channel(MemoryTransportConfig::default());

        let fleet = ConfigLoader::load_from_str(
            r#"{"1": {"range": [1, 1]}}"#,
            ConfigFormat::Json,
            Duration::from_secs(1),
        )
        .unwrap();
        let unit = generator::SensorUnit::new(fleet.sensors[0].clone());
        let mut source = payloads(&unit);

        transport.publish(source.next_payload()).await.unwrap();
        transport
            .publish(Bytes::from_static(b"{\"sensor_id\": 1, \"value\": \"hot\"}"))
            .await
            .unwrap();
        transport.publish(source.next_payload()).await.unwrap();
        transport.close().await.unwrap();

        let consumer = IngestConsumer::new(store.clone(), ConsumerConfig::default());
        let snapshot = consumer.run(subscription, CancellationToken::new()).await;

        assert_eq!(snapshot.received, 3);
        assert_eq!(snapshot.decode_failures, 1);
        assert_eq!(snapshot.inserted, 2);
        assert_eq!(store.count(ReadingFilter::new()).await.unwrap(), 2);
    }

    /// Store rejects one row; a later message is still inserted
    #[tokio::test]
    async fn test_store_rejection_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let (transport, subscription) = MemoryTransport::channel(MemoryTransportConfig::default());

        let unit = generator::SensorUnit::new(contracts::SensorSpec::new(
            5,
            contracts::ValueRange::default(),
            Duration::from_secs(1),
        ));
        let mut too_long = unit.spec().clone();
        too_long.metadata.unit = "degrees-celsius".into();
        let rejected = generator::SensorUnit::new(too_long);

        let mut good = payloads(&unit);
        let mut bad = payloads(&rejected);
        transport.publish(bad.next_payload()).await.unwrap();
        transport.publish(good.next_payload()).await.unwrap();
        transport.close().await.unwrap();

        let consumer = IngestConsumer::new(store.clone(), ConsumerConfig::default());
        let snapshot = consumer.run(subscription, CancellationToken::new()).await;

        assert_eq!(snapshot.insert_failures, 1);
        assert_eq!(snapshot.inserted, 1);
        let rows = store.list(ReadingFilter::new(), Page::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].unit, "C");
    }

    /// At-least-once: a redelivered message becomes a second row
    #[tokio::test]
    async fn test_redelivery_creates_duplicate_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let config =
            MemoryTransportConfig::default().with_redelivery(RedeliveryPolicy::EveryNth(2));
        let (transport, subscription) = MemoryTransport::channel(config);

        let unit = generator::SensorUnit::new(contracts::SensorSpec::new(
            9,
            contracts::ValueRange::default(),
            Duration::from_secs(1),
        ));
        let mut source = payloads(&unit);
        for _ in 0..4 {
            transport.publish(source.next_payload()).await.unwrap();
        }
        transport.close().await.unwrap();

        let consumer = IngestConsumer::new(store.clone(), ConsumerConfig::default());
        let snapshot = consumer.run(subscription, CancellationToken::new()).await;

        assert_eq!(snapshot.redeliveries, 2);
        assert_eq!(snapshot.inserted, 6);
        assert_eq!(
            store.count(ReadingFilter::new().sensor(9)).await.unwrap(),
            6
        );
    }

    /// Consumer drains what was buffered before close, then stops
    #[tokio::test]
    async fn test_subscription_ends_after_close() {
        let (transport, mut subscription) =
            MemoryTransport::channel(MemoryTransportConfig::new("drain", 4));
        transport.publish(Bytes::from_static(b"x")).await.unwrap();
        transport.close().await.unwrap();

        assert!(subscription.next().await.is_some());
        assert!(subscription.next().await.is_none());
    }

    /// Encoded readings from one unit, timestamps one second apart
    struct PayloadSource<'a> {
        unit: &'a generator::SensorUnit,
        rng: StdRng,
        tick: i64,
    }

    impl PayloadSource<'_> {
        fn next_payload(&mut self) -> Bytes {
            let timestamp = chrono::Utc::now() + chrono::Duration::seconds(self.tick);
            self.tick += 1;
            codec::encode(&self.unit.sample(&mut self.rng, timestamp)).unwrap()
        }
    }

    fn payloads(unit: &generator::SensorUnit) -> PayloadSource<'_> {
        PayloadSource {
            unit,
            rng: StdRng::seed_from_u64(unit.id() as u64),
            tick: 0,
        }
    }
}
