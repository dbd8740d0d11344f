//! Route guard for protected admin paths

use crate::auth::{SessionState, SessionStore};
use crate::config::{AuthConfig, ClientConfig};
use crate::navigation::Navigator;
use phulong_http::types::Principal;
use std::sync::Arc;
use tracing::{debug, info};

/// What the host should render for a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Public path, render without checks
    Bypass,
    /// Session still being resolved, render a loading indicator
    Pending,
    /// Render the protected content
    Allow(Principal),
    /// No session; a redirect to the login screen has been requested
    Deny,
}

/// Redirect bookkeeping, keyed by the session's unauthenticated episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectLatch {
    Idle,
    Redirecting { episode: u64 },
    Redirected { episode: u64 },
}

impl RedirectLatch {
    fn episode(self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Redirecting { episode } | Self::Redirected { episode } => Some(episode),
        }
    }
}

/// Decides, per path, whether protected content may render
///
/// One guard belongs to one mounted layout. It issues at most one redirect
/// per stretch of `Unauthenticated`, however often it is re-evaluated.
pub struct RouteGuard {
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    protected_prefix: String,
    latch: RedirectLatch,
}

impl RouteGuard {
    /// Guard using the session's navigator and login path
    pub fn new(session: SessionStore) -> Self {
        Self {
            navigator: session.navigator(),
            login_path: session.login_path().to_string(),
            session,
            protected_prefix: AuthConfig::PROTECTED_PREFIX.to_string(),
            latch: RedirectLatch::Idle,
        }
    }

    pub fn from_config(session: SessionStore, config: &ClientConfig) -> Self {
        Self::new(session)
            .with_login_path(&config.login_path)
            .with_protected_prefix(&config.protected_prefix)
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_protected_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.protected_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    /// Paths that render without a session
    pub fn is_public(&self, path: &str) -> bool {
        path == self.login_path || !self.is_protected(path)
    }

    fn is_protected(&self, path: &str) -> bool {
        match path.strip_prefix(self.protected_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Decide for `path` against the current session state
    ///
    /// On `Deny` the login redirect is requested unless this guard already
    /// requested it for the current episode.
    pub fn evaluate(&mut self, path: &str) -> GuardDecision {
        let snapshot = self.session.snapshot();
        if snapshot.state != SessionState::Unauthenticated {
            self.latch = RedirectLatch::Idle;
        }

        if self.is_public(path) {
            return GuardDecision::Bypass;
        }

        match snapshot.state {
            SessionState::Unknown | SessionState::Validating => GuardDecision::Pending,
            SessionState::Authenticated(session) => {
                GuardDecision::Allow(session.principal().clone())
            }
            SessionState::Unauthenticated => {
                self.redirect_once(path, snapshot.episode);
                GuardDecision::Deny
            }
        }
    }

    /// Evaluate until the decision is no longer `Pending`
    ///
    /// Waits on session transitions; if the store goes away while pending,
    /// `Pending` is returned.
    pub async fn settle(&mut self, path: &str) -> GuardDecision {
        let mut updates = self.session.subscribe();
        loop {
            let decision = self.evaluate(path);
            if decision != GuardDecision::Pending {
                return decision;
            }
            if updates.changed().await.is_err() {
                return decision;
            }
        }
    }

    /// The host router finished the login redirect
    pub fn navigation_completed(&mut self) {
        if let RedirectLatch::Redirecting { episode } = self.latch {
            self.latch = RedirectLatch::Redirected { episode };
        }
    }

    /// A redirect was requested and the router has not confirmed it yet
    pub fn is_redirecting(&self) -> bool {
        matches!(self.latch, RedirectLatch::Redirecting { .. })
    }

    fn redirect_once(&mut self, path: &str, episode: u64) {
        if self.latch.episode() == Some(episode) {
            debug!(path, "Login redirect already requested");
            return;
        }

        // A login may have landed since the snapshot was taken
        let current = self.session.snapshot();
        if current.state != SessionState::Unauthenticated || current.episode != episode {
            return;
        }

        self.latch = RedirectLatch::Redirecting { episode };
        if current.login_redirected {
            debug!(path, "Logout already requested the login redirect");
            return;
        }

        info!(path, to = %self.login_path, "Redirecting to login");
        self.navigator.navigate(&self.login_path);
    }
}
