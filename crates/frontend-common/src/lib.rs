//! Client session handling shared by the Phú Long site and admin console
//!
//! - [`auth::SessionStore`] owns the token and the logged-in principal
//! - [`auth_guard::RouteGuard`] decides what protected paths may render
//! - [`refresh::PeriodicRefresher`] drives background refreshes such as the
//!   [`dashboard::DashboardFeed`]

pub mod auth;
pub mod auth_guard;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod navigation;
pub mod refresh;

pub use auth::{SessionError, SessionState, SessionStore};
pub use auth_guard::{GuardDecision, RouteGuard};
pub use client::public_client;
pub use config::{AuthConfig, ClientConfig};
pub use dashboard::DashboardFeed;
pub use navigation::Navigator;
pub use refresh::{PeriodicRefresher, RefreshHandle, RefreshSchedule, RefreshStatus, RunOutcome};
