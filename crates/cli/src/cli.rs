//! CLI argument definitions using clap.

use std::net::IpAddr;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Sensor Pipeline - simulated sensor fleet with SQLite ingestion
#[derive(Parser, Debug)]
#[command(
    name = "sensor-pipeline",
    author,
    version,
    about = "Simulated sensor fleet, event transport and SQLite ingestion",
    long_about = "Runs a fleet of simulated sensors that publish readings on an event stream.\n\n\
                  A consumer decodes every message and stores it in SQLite; the stored \n\
                  readings can be listed, filtered and edited with `query`, or over \n\
                  HTTP with `serve`."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSOR_PIPELINE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log filter directive used when RUST_LOG is unset (e.g. "info", "store=debug")
    #[arg(long, global = true, env = "LOGGING_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SENSOR_PIPELINE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run sensors, transport and consumer until shutdown
    Run(RunArgs),

    /// Validate a sensor file without running
    Validate(ValidateArgs),

    /// Read or edit stored readings
    Query(QueryArgs),

    /// Serve stored readings over HTTP
    Serve(ServeArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Sensor file (JSON or TOML)
    #[arg(short, long, default_value = "sensors.json", env = "SENSORS_CONFIG")]
    pub config: PathBuf,

    /// SQLite database file
    #[arg(long, default_value = "sensor_data.db", env = "DATABASE_PATH")]
    pub database: PathBuf,

    /// Emission interval for sensors without their own `interval_ms`
    #[arg(long, default_value = "1000", env = "INTERVAL_MS")]
    pub interval_ms: u64,

    /// Transport topic name
    #[arg(long, default_value = "sensors", env = "TRANSPORT_NAME")]
    pub transport_name: String,

    /// Messages buffered between sensors and consumer
    #[arg(long, default_value = "1024", env = "SENSOR_PIPELINE_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Time granted to in-flight publishes on shutdown, in milliseconds
    #[arg(long, default_value = "5000", env = "SENSOR_PIPELINE_GRACE_MS")]
    pub grace_ms: u64,

    /// Time granted to the consumer to drain buffered messages, in milliseconds
    #[arg(long, default_value = "10000", env = "SENSOR_PIPELINE_DRAIN_MS")]
    pub drain_ms: u64,

    /// Messages stored concurrently
    #[arg(long, default_value = "16", env = "SENSOR_PIPELINE_MAX_IN_FLIGHT")]
    pub max_in_flight: usize,

    /// Deliver every n-th message twice (0 = never)
    #[arg(long, default_value = "0", env = "SENSOR_PIPELINE_REDELIVER_EVERY")]
    pub redeliver_every: u64,

    /// Stop after this many seconds (0 = run until Ctrl+C / SIGTERM)
    #[arg(long, default_value = "0", env = "SENSOR_PIPELINE_DURATION")]
    pub duration_secs: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SENSOR_PIPELINE_METRICS_PORT")]
    pub metrics_port: u16,

    /// Serve the query API while ingesting (0 = disabled)
    #[arg(long, default_value = "0", env = "API_PORT")]
    pub api_port: u16,

    /// Query API bind address
    #[arg(long, default_value = "127.0.0.1", env = "API_HOST")]
    pub api_host: IpAddr,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Sensor file to validate
    #[arg(short, long, default_value = "sensors.json", env = "SENSORS_CONFIG")]
    pub config: PathBuf,

    /// Default emission interval applied during validation
    #[arg(long, default_value = "1000", env = "INTERVAL_MS")]
    pub interval_ms: u64,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `query` command
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// SQLite database file
    #[arg(long, default_value = "sensor_data.db", env = "DATABASE_PATH", global = true)]
    pub database: PathBuf,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub action: QueryAction,
}

/// Arguments for the `serve` command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// SQLite database file
    #[arg(long, default_value = "sensor_data.db", env = "DATABASE_PATH")]
    pub database: PathBuf,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1", env = "API_HOST")]
    pub host: IpAddr,

    /// Listen port
    #[arg(short, long, default_value = "8000", env = "API_PORT")]
    pub port: u16,
}

/// Query operations
#[derive(Subcommand, Debug)]
pub enum QueryAction {
    /// List readings, optionally for one sensor
    List {
        #[arg(long)]
        sensor_id: Option<i64>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List readings filtered by type, unit and time window
    Summary {
        #[command(flatten)]
        filter: SummaryArgs,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Count readings matching the summary filters
    Count {
        #[arg(long)]
        sensor_id: Option<i64>,

        #[command(flatten)]
        filter: SummaryArgs,
    },

    /// Show one reading
    Get { id: i64 },

    /// Insert a reading
    Create {
        #[command(flatten)]
        row: RowArgs,
    },

    /// Replace every column of a reading
    Update {
        id: i64,

        #[command(flatten)]
        row: RowArgs,
    },

    /// Delete a reading
    Delete { id: i64 },
}

/// Pagination
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Number of records to skip
    #[arg(long, default_value = "0")]
    pub skip: u64,

    /// Maximum number of records to return (at most 1000)
    #[arg(long, default_value = "100")]
    pub limit: u64,
}

/// Summary filters
#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Sensor type (e.g. temperature)
    #[arg(long = "type")]
    pub sensor_type: Option<String>,

    /// Unit of measurement
    #[arg(long)]
    pub unit: Option<String>,

    /// Earliest timestamp, inclusive
    #[arg(long, value_parser = parse_timestamp)]
    pub start_time: Option<DateTime<Utc>>,

    /// Latest timestamp, inclusive
    #[arg(long, value_parser = parse_timestamp)]
    pub end_time: Option<DateTime<Utc>>,
}

/// Column values for create/update
#[derive(Args, Debug, Clone)]
pub struct RowArgs {
    #[arg(long)]
    pub sensor_id: i64,

    #[arg(long, allow_negative_numbers = true)]
    pub value: f64,

    /// Defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub timestamp: Option<DateTime<Utc>>,

    #[arg(long, default_value = "10", allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, default_value = "10", allow_negative_numbers = true)]
    pub lng: f64,

    #[arg(long, default_value = "C")]
    pub unit: String,

    #[arg(long = "type", default_value = "temperature")]
    pub sensor_type: String,

    #[arg(long, default_value = "sensor description")]
    pub description: String,
}

/// RFC 3339, or ISO-8601 without offset (read as UTC)
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    contracts::parse_utc(raw).ok_or_else(|| format!("invalid timestamp: {raw}"))
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
