//! Initialization functions for tracing

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::tracing::config::InstrumentationConfig;

fn env_filter(config: &InstrumentationConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing with the given configuration
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed
pub fn try_init_tracing(config: &InstrumentationConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    ::tracing::debug!(service = %config.service_name, "Tracing initialized");
    Ok(())
}

/// Initialize tracing, ignoring an already installed subscriber
///
/// Test harnesses call this from every test, so a second installation is not
/// an error.
pub fn init_tracing(config: &InstrumentationConfig) {
    if let Err(e) = try_init_tracing(config) {
        ::tracing::trace!("Tracing already initialized: {e}");
    }
}

/// Initialize with default configuration from environment
pub fn init_default() {
    init_tracing(&InstrumentationConfig::from_env());
}
