//! Sensor file parsing
//!
//! Supports JSON (primary, `sensors.json`) and TOML.

use contracts::{ContractError, SensorFile};

/// Sensor file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Parse TOML sensor file
pub fn parse_toml(content: &str) -> Result<SensorFile, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON sensor file
pub fn parse_json(content: &str) -> Result<SensorFile, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<SensorFile, ContractError> {
    match format {
        ConfigFormat::Json => parse_json(content),
        ConfigFormat::Toml => parse_toml(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "1": { "range": [20, 25] },
            "2": {}
        }"#;
        let file = parse_json(content).unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file["1"].range, Some([20, 25]));
        assert!(file["2"].range.is_none());
    }

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
["1"]
range = [20, 25]
interval_ms = 500

["2"]
type = "humidity"
unit = "%"
location = { lat = 52.5, lng = 13.4 }
"#;
        let file = parse_toml(content).unwrap();
        assert_eq!(file["1"].interval_ms, Some(500));
        assert_eq!(file["2"].unit.as_deref(), Some("%"));
        assert_eq!(file["2"].location.unwrap().lat, 52.5);
    }

    #[test]
    fn test_parse_json_syntax_error() {
        let result = parse_json("{ \"1\": ");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_mistyped_range() {
        let result = parse_json(r#"{ "1": { "range": "20-25" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
