//! Frontend configuration

use phulong_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Authentication defaults
pub struct AuthConfig;

impl AuthConfig {
    /// Storage key holding the raw access token
    pub const TOKEN_KEY: &'static str = "admin_token";

    /// Public entry point of the admin console
    pub const LOGIN_PATH: &'static str = "/admin/login";

    /// Every path below this prefix requires a session
    pub const PROTECTED_PREFIX: &'static str = "/admin";

    /// Dashboard auto refresh interval in seconds
    pub const AUTO_REFRESH_SECS: u64 = 5 * 60; // 5 minutes

    /// Number of rows requested for dashboard lists
    pub const DASHBOARD_LIMIT: u32 = 5;
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST API, including the `/api` prefix
    pub api_base_url: String,

    /// Storage key holding the access token
    pub token_key: String,

    /// Login screen path
    pub login_path: String,

    /// Path prefix guarded by the route guard
    pub protected_prefix: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Dashboard auto refresh interval in seconds
    pub auto_refresh_secs: u64,

    /// Number of rows requested for dashboard lists
    pub dashboard_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            token_key: AuthConfig::TOKEN_KEY.to_string(),
            login_path: AuthConfig::LOGIN_PATH.to_string(),
            protected_prefix: AuthConfig::PROTECTED_PREFIX.to_string(),
            request_timeout_secs: 30,
            auto_refresh_secs: AuthConfig::AUTO_REFRESH_SECS,
            dashboard_limit: AuthConfig::DASHBOARD_LIMIT,
        }
    }
}

impl ClientConfig {
    /// Load configuration from file, with `PHULONG_*` environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> CoreResult<Self> {
        let settings = Self::defaults_builder()?
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("PHULONG"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> CoreResult<Self> {
        let settings = Self::defaults_builder()?
            .add_source(config::Environment::with_prefix("PHULONG"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults_builder() -> CoreResult<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = Self::default();

        Ok(config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("token_key", defaults.token_key)?
            .set_default("login_path", defaults.login_path)?
            .set_default("protected_prefix", defaults.protected_prefix)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("auto_refresh_secs", defaults.auto_refresh_secs)?
            .set_default("dashboard_limit", defaults.dashboard_limit)?)
    }

    /// Reject values the client cannot run with
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh interval or request timeout is zero
    pub fn validate(&self) -> CoreResult<()> {
        if self.auto_refresh_secs == 0 {
            return Err(CoreError::invalid_config("auto_refresh_secs must be greater than 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::invalid_config("request_timeout_secs must be greater than 0"));
        }
        Ok(())
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Dashboard refresh interval as a duration
    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_secs)
    }
}
