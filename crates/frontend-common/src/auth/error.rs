//! Session failures and their user-facing messages

use phulong_http::ClientError;
use thiserror::Error;

/// Shown when a rejected login carries no usable `detail`
pub const DEFAULT_LOGIN_FAILURE: &str = "Incorrect username or password";

/// Shown when the API cannot be reached
pub const CONNECTIVITY_FAILURE: &str = "Unable to connect to the server";

/// Broad failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network unreachable or timed out
    Connectivity,
    /// The server refused the credentials or token
    Rejected,
    /// The server answered with something unparsable
    Malformed,
}

/// Why a login or validation did not produce a session
///
/// `Display` renders the message meant for the login form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Unable to connect to the server")]
    NetworkUnavailable,

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Your session has expired. Please log in again.")]
    TokenRejected,

    #[error("Unexpected response from the server")]
    MalformedResponse,
}

impl SessionError {
    /// Classify a failed call to the login endpoint
    pub fn from_login(error: &ClientError) -> Self {
        if error.is_malformed() {
            Self::MalformedResponse
        } else if error.status().is_some() {
            Self::InvalidCredentials(
                error
                    .detail()
                    .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_string()),
            )
        } else {
            Self::NetworkUnavailable
        }
    }

    /// Classify a failed call to the "who am I" endpoint
    pub fn from_validation(error: &ClientError) -> Self {
        if error.is_malformed() {
            Self::MalformedResponse
        } else if error.status().is_some() {
            Self::TokenRejected
        } else {
            Self::NetworkUnavailable
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NetworkUnavailable => ErrorKind::Connectivity,
            Self::InvalidCredentials(_) | Self::TokenRejected => ErrorKind::Rejected,
            Self::MalformedResponse => ErrorKind::Malformed,
        }
    }
}
