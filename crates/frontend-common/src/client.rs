//! HTTP client construction from configuration

use crate::config::ClientConfig;
use phulong_core::{CoreError, CoreResult};
use phulong_http::{PublicApiClient, TypedClientBuilder};

/// Build the unauthenticated API client described by `config`
///
/// # Errors
///
/// Returns an error if the base URL is empty or the HTTP client cannot be built
pub fn public_client(config: &ClientConfig) -> CoreResult<PublicApiClient> {
    TypedClientBuilder::new()
        .base_url(config.api_base_url.as_str())
        .timeout(config.request_timeout())
        .build_public()
        .map_err(|e| CoreError::invalid_config(format!("API client: {e}")))
}
