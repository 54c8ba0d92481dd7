//! EmissionScheduler - runs every sensor unit concurrently
//!
//! Each unit gets its own task and its own cadence. On shutdown the units are
//! cancelled, given a bounded grace period to finish an in-flight publish,
//! aborted if still running, and only then is the transport closed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use contracts::{SensorFleet, Transport};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::SchedulerError;
use crate::unit::{SensorUnit, UnitStats};

/// Default time allowed for in-flight publishes after shutdown
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Summary of one scheduler run
#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    /// Stats of units that stopped on their own
    pub units: Vec<UnitStats>,
    /// Units aborted after the grace period
    pub aborted: usize,
    /// Transport closed without error
    pub transport_closed: bool,
    /// Close failure, if any (logged, not fatal)
    pub close_error: Option<String>,
}

impl SchedulerReport {
    pub fn published(&self) -> u64 {
        self.units.iter().map(|u| u.published).sum()
    }

    pub fn failed(&self) -> u64 {
        self.units.iter().map(|u| u.failed).sum()
    }
}

/// Drives N sensor units until shutdown
pub struct EmissionScheduler {
    units: Vec<SensorUnit>,
    grace_period: Duration,
}

impl EmissionScheduler {
    /// # Errors
    /// `SchedulerError::NoUnits` when `units` is empty
    pub fn new(units: Vec<SensorUnit>, grace_period: Duration) -> Result<Self, SchedulerError> {
        if units.is_empty() {
            return Err(SchedulerError::NoUnits);
        }
        Ok(Self {
            units,
            grace_period,
        })
    }

    /// One unit per configured sensor
    pub fn from_fleet(fleet: &SensorFleet, grace_period: Duration) -> Result<Self, SchedulerError> {
        let units = fleet.sensors.iter().cloned().map(SensorUnit::new).collect();
        Self::new(units, grace_period)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Run all units until `shutdown` resolves, then close `transport` once
    ///
    /// The transport is moved in and shared between units; it is closed only
    /// after every unit task has finished or been aborted.
    #[instrument(
        name = "emission_scheduler_run",
        skip_all,
        fields(units = self.units.len(), transport = %transport.name())
    )]
    pub async fn run<T, F>(
        self,
        transport: T,
        shutdown: F,
    ) -> Result<SchedulerReport, SchedulerError>
    where
        T: Transport + Sync + 'static,
        F: Future<Output = ()>,
    {
        let transport = Arc::new(transport);
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        let unit_count = self.units.len();

        for unit in self.units {
            let transport = Arc::clone(&transport);
            let cancel = cancel.child_token();
            tasks.spawn(async move { unit.run(transport.as_ref(), &cancel).await });
        }

        observability::record_active_units(unit_count);
        info!(units = unit_count, "Emission scheduler started");

        shutdown.await;

        info!("Shutdown signal received, stopping sensor units");
        cancel.cancel();

        let mut report = SchedulerReport::default();
        let drained =
            tokio::time::timeout(self.grace_period, Self::drain(&mut tasks, &mut report)).await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                grace_ms = self.grace_period.as_millis() as u64,
                "Grace period elapsed, abandoning in-flight publishes"
            );
            tasks.abort_all();
            Self::drain(&mut tasks, &mut report).await;
        }
        observability::record_active_units(0);

        // Every clone lived inside a unit task, all of which are gone now.
        let transport = Arc::try_unwrap(transport).map_err(|_| SchedulerError::TransportShared)?;
        let name = transport.name().to_string();

        match transport.close().await {
            Ok(()) => {
                report.transport_closed = true;
                info!(transport = %name, "Transport closed");
            }
            Err(e) => {
                error!(transport = %name, error = %e, "Transport close failed");
                report.close_error = Some(e.to_string());
            }
        }

        info!(
            published = report.published(),
            failed = report.failed(),
            aborted = report.aborted,
            "Emission scheduler stopped"
        );
        Ok(report)
    }

    async fn drain(tasks: &mut JoinSet<UnitStats>, report: &mut SchedulerReport) {
        while let Some(result) = tasks.join_next().await {
            Self::collect(result, report);
        }
    }

    fn collect(result: Result<UnitStats, JoinError>, report: &mut SchedulerReport) {
        match result {
            Ok(stats) => report.units.push(stats),
            Err(e) if e.is_cancelled() => report.aborted += 1,
            Err(e) => error!(error = %e, "Sensor unit task panicked"),
        }
    }
}
