//! Client error types

use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status of the response, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest(_) => Some(400),
            Self::AuthenticationFailed(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::ServerError { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::Serialization(_) | Self::Configuration(_) => None,
        }
    }

    /// The token was missing, expired or revoked
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_) | Self::Forbidden(_))
    }

    /// The server answered, but the body could not be decoded
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::Serialization(_) => true,
            Self::Request(e) => e.is_decode(),
            _ => false,
        }
    }

    /// The server could not be reached at all
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Request(e) if !e.is_decode() && e.status().is_none())
    }

    /// Human readable `detail` from an error body such as `{"detail": "..."}`
    ///
    /// Validation errors carry a list in `detail`; only string details are
    /// returned.
    pub fn detail(&self) -> Option<String> {
        let body = match self {
            Self::BadRequest(m)
            | Self::AuthenticationFailed(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::ServerError { message: m, .. } => m,
            _ => return None,
        };

        serde_json::from_str::<serde_json::Value>(body)
            .ok()?
            .get("detail")?
            .as_str()
            .map(str::to_string)
    }
}
