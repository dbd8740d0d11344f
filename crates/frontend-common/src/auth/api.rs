//! The two REST calls the session store depends on

use super::state::AccessToken;
use async_trait::async_trait;
use phulong_http::types::{LoginRequest, Principal};
use phulong_http::{ClientError, PublicApiClient};

/// Authentication endpoints consumed by [`SessionStore`](super::SessionStore)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token
    async fn login(&self, request: &LoginRequest) -> Result<AccessToken, ClientError>;

    /// Resolve the principal behind a token
    async fn whoami(&self, token: &AccessToken) -> Result<Principal, ClientError>;
}

#[async_trait]
impl AuthApi for PublicApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AccessToken, ClientError> {
        let response = PublicApiClient::login(self, request).await?;
        Ok(AccessToken::new(response.access_token))
    }

    async fn whoami(&self, token: &AccessToken) -> Result<Principal, ClientError> {
        self.authenticate(token.as_str()).me().await
    }
}
