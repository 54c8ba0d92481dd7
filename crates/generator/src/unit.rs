//! SensorUnit - one simulated sensor
//!
//! Produces one reading per tick and hands it to the transport. The loop
//! polls its cancellation token every iteration and only suspends at the
//! publish call and the interval sleep.

use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{codec, Reading, SensorSpec, Transport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace, warn};

/// Per-unit counters returned when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitStats {
    pub sensor_id: i64,
    /// Readings accepted by the transport
    pub published: u64,
    /// Readings the transport rejected (or that failed to encode)
    pub failed: u64,
}

/// Simulated sensor
#[derive(Debug, Clone)]
pub struct SensorUnit {
    spec: SensorSpec,
}

impl SensorUnit {
    pub fn new(spec: SensorSpec) -> Self {
        Self { spec }
    }

    pub fn id(&self) -> i64 {
        self.spec.id
    }

    pub fn interval(&self) -> Duration {
        self.spec.interval
    }

    pub fn spec(&self) -> &SensorSpec {
        &self.spec
    }

    /// Build one reading
    ///
    /// The value is drawn uniformly from the inclusive range, independent of
    /// earlier ticks.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, timestamp: DateTime<Utc>) -> Reading {
        let value = rng.random_range(self.spec.range.min..=self.spec.range.max);
        Reading {
            sensor_id: self.spec.id,
            timestamp,
            value: value as f64,
            metadata: self.spec.metadata.clone(),
        }
    }

    /// Emit readings until `cancel` fires
    ///
    /// Publish failures are logged and counted; the cadence continues.
    #[instrument(
        name = "sensor_unit_run",
        skip_all,
        fields(sensor_id = self.spec.id, transport = %transport.name())
    )]
    pub async fn run<T: Transport + Sync>(
        &self,
        transport: &T,
        cancel: &CancellationToken,
    ) -> UnitStats {
        let mut rng = StdRng::from_os_rng();
        let mut last_timestamp: Option<DateTime<Utc>> = None;
        let mut stats = UnitStats {
            sensor_id: self.spec.id,
            ..Default::default()
        };

        debug!(
            sensor_id = self.spec.id,
            interval_ms = self.spec.interval.as_millis() as u64,
            min = self.spec.range.min,
            max = self.spec.range.max,
            "sensor unit started"
        );

        while !cancel.is_cancelled() {
            // Wall clock may step backwards; keep per-sensor order.
            let now = Utc::now();
            let timestamp = match last_timestamp {
                Some(prev) if prev > now => prev,
                _ => now,
            };
            last_timestamp = Some(timestamp);

            let reading = self.sample(&mut rng, timestamp);
            self.emit(transport, &reading, &mut stats).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.spec.interval) => {}
            }
        }

        debug!(
            sensor_id = self.spec.id,
            published = stats.published,
            failed = stats.failed,
            "sensor unit stopped"
        );
        stats
    }

    async fn emit<T: Transport + Sync>(
        &self,
        transport: &T,
        reading: &Reading,
        stats: &mut UnitStats,
    ) {
        let message = match codec::encode(reading) {
            Ok(message) => message,
            Err(e) => {
                stats.failed += 1;
                error!(sensor_id = self.spec.id, error = %e, "failed to encode reading");
                return;
            }
        };

        match transport.publish(message).await {
            Ok(()) => {
                stats.published += 1;
                observability::record_reading_published(self.spec.id);
                trace!(
                    sensor_id = self.spec.id,
                    value = reading.value,
                    timestamp = %reading.timestamp,
                    "reading published"
                );
            }
            Err(e) => {
                stats.failed += 1;
                observability::record_publish_failure(self.spec.id);
                warn!(
                    sensor_id = self.spec.id,
                    error = %e,
                    "publish failed, keeping cadence"
                );
            }
        }
    }
}
