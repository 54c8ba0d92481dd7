//! `run` command implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use actix_web::dev::Server;
use anyhow::{Context, Result};
use consumer::ConsumerConfig;
use contracts::SensorFleet;
use store::SqliteStore;
use tracing::{info, warn};
use transport::{MemoryTransportConfig, RedeliveryPolicy};

use crate::api;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig, PipelineStats};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let config = pipeline_config(args)?;

    if args.dry_run {
        let path = &config.sensors_path;
        let fleet = config_loader::ConfigLoader::load_from_path(path, config.default_interval)
            .with_context(|| format!("Failed to load sensors from {}", path.display()))?;
        info!("Dry run mode - configuration is valid, exiting");
        print_fleet_summary(&fleet);
        return Ok(());
    }

    info!(
        config = %config.sensors_path.display(),
        database = %config.database_path.display(),
        transport = %config.transport.name,
        "Starting pipeline..."
    );

    let server = match args.api_port {
        0 => None,
        port => {
            let store = SqliteStore::open(&config.database_path).with_context(|| {
                format!("Failed to open database {}", config.database_path.display())
            })?;
            let addr = SocketAddr::new(args.api_host, port);
            Some(api::start(store, addr).with_context(|| format!("Failed to bind {addr}"))?)
        }
    };

    let duration = (args.duration_secs > 0).then(|| Duration::from_secs(args.duration_secs));
    let pipeline = Pipeline::new(config).run(shutdown_signal(duration));
    let stats = match server {
        Some(server) => serve_while(server, pipeline).await,
        None => pipeline.await,
    }
    .context("Pipeline execution failed")?;

    info!(
        published = stats.published,
        inserted = stats.consumer.inserted,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Sensor pipeline finished");
    Ok(())
}

fn pipeline_config(args: &RunArgs) -> Result<PipelineConfig> {
    if args.interval_ms == 0 {
        anyhow::bail!("--interval-ms must be greater than 0");
    }

    let redelivery = match args.redeliver_every {
        0 => RedeliveryPolicy::Never,
        n => RedeliveryPolicy::EveryNth(n),
    };

    Ok(PipelineConfig {
        sensors_path: args.config.clone(),
        database_path: args.database.clone(),
        default_interval: Duration::from_millis(args.interval_ms),
        transport: MemoryTransportConfig::new(&args.transport_name, args.buffer_size)
            .with_redelivery(redelivery),
        grace_period: Duration::from_millis(args.grace_ms),
        consumer: ConsumerConfig {
            max_in_flight: args.max_in_flight,
        },
        drain_timeout: Duration::from_millis(args.drain_ms),
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    })
}

/// Keep the query API up until the pipeline returns
async fn serve_while<F>(server: Server, pipeline: F) -> Result<PipelineStats>
where
    F: Future<Output = Result<PipelineStats>>,
{
    let handle = server.handle();
    let pipeline = async move {
        let result = pipeline.await;
        handle.stop(true).await;
        result
    };

    let (result, served) = tokio::join!(pipeline, server);
    if let Err(e) = served {
        warn!(error = %e, "Query API stopped with an error");
    }
    result
}

/// Resolves on Ctrl+C, SIGTERM or after `duration`
pub(crate) async fn shutdown_signal(duration: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, shutting down..."),
        _ = terminate => warn!("Received SIGTERM, shutting down..."),
        _ = deadline => info!("Run duration reached, shutting down..."),
    }
}

/// Print sensor summary for dry-run mode
fn print_fleet_summary(fleet: &SensorFleet) {
    println!("\n=== Sensor Summary ===\n");
    println!("Sensors ({}):", fleet.len());
    for sensor in &fleet.sensors {
        println!(
            "  - {} [{}, {}] every {}ms ({} {}, {})",
            sensor.id,
            sensor.range.min,
            sensor.range.max,
            sensor.interval.as_millis(),
            sensor.metadata.sensor_type,
            sensor.metadata.unit,
            sensor.metadata.description
        );
    }
    println!();
}
