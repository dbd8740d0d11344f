//! Type-safe API clients that enforce authentication requirements at compile time

pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod error;

use error::ClientError;
use reqwest::{Client, ClientBuilder, header};
use std::time::Duration;

const USER_AGENT: &str = concat!("phulong-client/", env!("CARGO_PKG_VERSION"));

/// Client for public endpoints that don't require authentication
#[derive(Clone)]
pub struct PublicApiClient {
    client: Client,
    base_url: String,
}

/// Client for endpoints that require a bearer token
#[derive(Clone)]
pub struct AuthenticatedApiClient {
    client: Client,
    base_url: String,
    token: String,
}

fn build_http_client(timeout: Option<Duration>) -> Result<Client, ClientError> {
    #[cfg(not(target_arch = "wasm32"))]
    let client = {
        let mut builder = ClientBuilder::new().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()?
    };

    #[cfg(target_arch = "wasm32")]
    let client = {
        let _ = timeout; // Timeouts not supported on WASM
        ClientBuilder::new().user_agent(USER_AGENT).build()?
    };

    Ok(client)
}

/// Execute a request and handle common errors
async fn execute<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ClientError> {
    let response = request.send().await?;
    let status = response.status();

    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let message = response.text().await.unwrap_or_else(|_| status.to_string());
        tracing::debug!(status = status.as_u16(), "API request rejected");
        Err(ClientError::from_status(status, message))
    }
}

impl PublicApiClient {
    /// Create a new public client
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        TypedClientBuilder::new().base_url(base_url).build_public()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder without authentication
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        execute(request).await
    }

    /// Attach a bearer token, sharing the underlying connection pool
    pub fn authenticate(&self, token: impl Into<String>) -> AuthenticatedApiClient {
        AuthenticatedApiClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: token.into(),
        }
    }
}

impl AuthenticatedApiClient {
    /// Create a new authenticated client
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        TypedClientBuilder::new()
            .base_url(base_url)
            .build_authenticated(token)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder with authentication
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        execute(request).await
    }

    /// Fetch any JSON resource below the base URL
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        let request = self.request(reqwest::Method::GET, path);
        self.execute(request).await
    }

    /// Create a public client (useful for calling public endpoints)
    pub fn to_public(&self) -> PublicApiClient {
        PublicApiClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Type-safe builder that creates the appropriate client type
#[derive(Debug, Default)]
pub struct TypedClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl TypedClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn resolved_base_url(&self) -> Result<String, ClientError> {
        let base_url = self
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        Ok(base_url.trim_end_matches('/').to_string())
    }

    /// Build a public client
    pub fn build_public(self) -> Result<PublicApiClient, ClientError> {
        let base_url = self.resolved_base_url()?;
        Ok(PublicApiClient {
            client: build_http_client(self.timeout)?,
            base_url,
        })
    }

    /// Build an authenticated client
    pub fn build_authenticated(
        self,
        token: impl Into<String>,
    ) -> Result<AuthenticatedApiClient, ClientError> {
        Ok(self.build_public()?.authenticate(token))
    }
}
