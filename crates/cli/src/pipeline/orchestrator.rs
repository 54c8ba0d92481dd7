//! Pipeline orchestrator - wires sensors, transport, consumer and store.
//!
//! Startup failures (sensor file, database, scheduler construction) are
//! fatal. Once running, every failure is contained in the component that
//! hit it.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use consumer::{ConsumerConfig, IngestConsumer, MetricsSnapshot};
use contracts::Delivery;
use generator::EmissionScheduler;
use store::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use transport::{MemoryTransport, MemoryTransportConfig};

use super::PipelineStats;

/// Pipeline configuration, built once at startup
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sensor file
    pub sensors_path: PathBuf,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Emission interval for sensors without their own
    pub default_interval: Duration,

    pub transport: MemoryTransportConfig,

    /// Time granted to in-flight publishes on shutdown
    pub grace_period: Duration,

    pub consumer: ConsumerConfig,

    /// Time granted to the consumer to empty the transport buffer
    pub drain_timeout: Duration,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, then stop sensors, close the
    /// transport once and let the consumer drain
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let config = self.config;

        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let fleet = ConfigLoader::load_from_path(&config.sensors_path, config.default_interval)
            .with_context(|| {
                format!(
                    "Failed to load sensors from {}",
                    config.sensors_path.display()
                )
            })?;
        info!(sensors = fleet.len(), "Sensor configuration loaded");

        let store = SqliteStore::open(&config.database_path).with_context(|| {
            format!(
                "Failed to open database {}",
                config.database_path.display()
            )
        })?;

        let scheduler = EmissionScheduler::from_fleet(&fleet, config.grace_period)
            .context("Failed to build emission scheduler")?;

        let (transport, subscription) = MemoryTransport::channel(config.transport.clone());
        let transport_stats = transport.stats();
        info!(
            transport = %config.transport.name,
            capacity = config.transport.capacity,
            "Transport ready"
        );

        // Consumer
        let consumer = IngestConsumer::new(store, config.consumer.clone());
        let consumer_metrics = consumer.metrics();
        let cancel = CancellationToken::new();
        let mut consumer_task = tokio::spawn({
            let cancel = cancel.clone();
            let mut subscription = subscription;
            async move {
                let snapshot = consumer.run(&mut subscription, cancel).await;
                (snapshot, subscription.take_pending())
            }
        });

        // Sensors; returns after the transport is closed
        info!(
            transport = %config.transport.name,
            "Pipeline running"
        );
        let report = scheduler
            .run(transport, shutdown)
            .await
            .context("Emission scheduler failed")?;

        if let Some(ref e) = report.close_error {
            warn!(error = %e, "Transport did not close cleanly");
        }

        // The closed transport still hands out buffered messages.
        let (consumed, unconsumed) =
            match tokio::time::timeout(config.drain_timeout, &mut consumer_task).await {
                Ok(Ok(finished)) => finished,
                Ok(Err(e)) => {
                    error!(error = %e, "Consumer task failed");
                    (consumer_metrics.snapshot(), Vec::new())
                }
                Err(_) => {
                    warn!(
                        drain_ms = config.drain_timeout.as_millis() as u64,
                        "Consumer drain timed out, cancelling"
                    );
                    cancel.cancel();
                    join_consumer(consumer_task, &consumer_metrics).await
                }
            };

        for delivery in &unconsumed {
            error!(
                transport = %config.transport.name,
                sequence = delivery.sequence,
                attempt = delivery.attempt,
                payload = %String::from_utf8_lossy(&delivery.payload),
                "Dropping message left in the transport buffer"
            );
        }
        if !unconsumed.is_empty() {
            warn!(
                abandoned = unconsumed.len(),
                "Messages were not persisted before the drain deadline"
            );
        }

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            sensors: fleet.len(),
            published: report.published(),
            publish_failures: report.failed(),
            aborted_units: report.aborted,
            transport_closed: report.transport_closed,
            buffer_rejections: transport_stats.rejected(),
            redelivered: transport_stats.redelivered(),
            abandoned: unconsumed.len() as u64,
            consumer: consumed,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            published = stats.published,
            inserted = stats.consumer.inserted,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

async fn join_consumer(
    task: tokio::task::JoinHandle<(MetricsSnapshot, Vec<Delivery>)>,
    metrics: &consumer::ConsumerMetrics,
) -> (MetricsSnapshot, Vec<Delivery>) {
    match task.await {
        Ok(finished) => finished,
        Err(e) => {
            error!(error = %e, "Consumer task failed");
            (metrics.snapshot(), Vec::new())
        }
    }
}
