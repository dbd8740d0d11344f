//! Phú Long HTTP client
//!
//! Typed clients for the ordering site's REST API. Public endpoints (login,
//! service catalog) go through [`client::PublicApiClient`]; endpoints that need
//! a bearer token go through [`client::AuthenticatedApiClient`], so a missing
//! token is a compile-time error rather than a 401 at runtime.

pub mod client;
pub mod types;

pub use client::error::ClientError;
pub use client::{AuthenticatedApiClient, PublicApiClient, TypedClientBuilder};
pub use reqwest::{Method, StatusCode};
