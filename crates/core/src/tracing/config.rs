//! Configuration for the tracing subscriber

use serde::{Deserialize, Serialize};

/// Instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name attached to startup logs
    pub service_name: String,
    /// Log level filter (e.g., "info", "debug", "phulong_frontend_common=trace")
    pub log_level: String,
    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "phulong".to_string(),
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl InstrumentationConfig {
    /// Create configuration from environment variables
    ///
    /// Supports the following environment variables:
    /// - `SERVICE_NAME`: Service name
    /// - `RUST_LOG`: Log level filter
    /// - `PHULONG_LOG_JSON`: `1` or `true` to enable JSON output
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let service_name = std::env::var("SERVICE_NAME").unwrap_or(defaults.service_name);
        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);
        let json = std::env::var("PHULONG_LOG_JSON")
            .map(|v| matches!(v.as_str(), "1" | "true"))
            .unwrap_or(false);

        Self {
            service_name,
            log_level,
            json,
        }
    }

    /// Create a development configuration with sensible defaults
    pub fn dev() -> Self {
        Self {
            service_name: "phulong-dev".to_string(),
            log_level: "debug".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstrumentationConfig::default();
        assert_eq!(config.service_name, "phulong");
        assert_eq!(config.log_level, "info");
        assert!(!config.json);
    }

    #[test]
    fn test_dev_config() {
        let config = InstrumentationConfig::dev();
        assert_eq!(config.service_name, "phulong-dev");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_json_flag_defaults_to_false_when_missing() {
        let config: InstrumentationConfig =
            serde_json::from_str(r#"{"service_name":"admin","log_level":"warn"}"#).unwrap();
        assert_eq!(config.service_name, "admin");
        assert!(!config.json);
    }
}
