//! `validate` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use contracts::SensorFleet;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Below this interval a sensor floods the store
const FAST_INTERVAL: Duration = Duration::from_millis(100);

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<FleetSummary>,
}

#[derive(Serialize)]
struct FleetSummary {
    sensor_count: usize,
    sensor_ids: Vec<i64>,
    types: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating sensor configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Sensor configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    let interval = Duration::from_millis(args.interval_ms);
    match config_loader::ConfigLoader::load_from_path(&args.config, interval) {
        Ok(fleet) => {
            let warnings = collect_warnings(&fleet);
            let mut types: Vec<String> = fleet
                .sensors
                .iter()
                .map(|s| s.metadata.sensor_type.clone())
                .collect();
            types.sort();
            types.dedup();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(FleetSummary {
                    sensor_count: fleet.len(),
                    sensor_ids: fleet.sensors.iter().map(|s| s.id).collect(),
                    types,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(fleet: &SensorFleet) -> Vec<String> {
    let mut warnings = Vec::new();

    for sensor in &fleet.sensors {
        if sensor.range.min == sensor.range.max {
            warnings.push(format!(
                "Sensor {} has a single-value range [{}, {}]",
                sensor.id, sensor.range.min, sensor.range.max
            ));
        }
        if sensor.interval < FAST_INTERVAL {
            warnings.push(format!(
                "Sensor {} emits every {}ms",
                sensor.id,
                sensor.interval.as_millis()
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Sensor configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Sensors: {}", summary.sensor_count);
            println!("  Ids: {:?}", summary.sensor_ids);
            println!("  Types: {}", summary.types.join(", "));
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Sensor configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
