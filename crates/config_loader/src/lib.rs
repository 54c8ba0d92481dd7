//! # Config Loader
//!
//! Sensor configuration loading.
//!
//! Responsibilities:
//! - Parse the sensor file (JSON or TOML)
//! - Validate sensor definitions
//! - Generate the `SensorFleet`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let fleet =
//!     ConfigLoader::load_from_path(Path::new("sensors.json"), Duration::from_secs(1)).unwrap();
//! println!("sensors: {}", fleet.len());
//! ```

mod parser;
mod validator;

pub use contracts::SensorFleet;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use std::time::Duration;

/// Configuration loader
///
/// Loaded once at startup; `default_interval` applies to every sensor
/// without its own `interval_ms`.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load sensors from file path
    ///
    /// Automatically detects format from file extension (.json / .toml).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(
        path: &Path,
        default_interval: Duration,
    ) -> Result<SensorFleet, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format, default_interval)
    }

    /// Load sensors from string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
        default_interval: Duration,
    ) -> Result<SensorFleet, ContractError> {
        let file = parser::parse(content, format)?;
        validator::validate(&file, default_interval)
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}
