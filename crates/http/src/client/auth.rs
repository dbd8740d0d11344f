//! Authentication endpoints

use super::{AuthenticatedApiClient, PublicApiClient, error::ClientError};
use crate::types::{LoginRequest, Principal, TokenResponse};
use reqwest::Method;

/// Path of the credential exchange endpoint
pub const LOGIN_PATH: &str = "/auth/login";

/// Path of the "who am I" endpoint
pub const WHOAMI_PATH: &str = "/users/me";

impl PublicApiClient {
    /// Exchange a username and password for an access token
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, ClientError> {
        let req = self.request(Method::POST, LOGIN_PATH).json(request);
        self.execute(req).await
    }
}

impl AuthenticatedApiClient {
    /// Resolve the identity behind the current token
    pub async fn me(&self) -> Result<Principal, ClientError> {
        let request = self.request(Method::GET, WHOAMI_PATH);
        self.execute(request).await
    }
}
