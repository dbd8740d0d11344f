//! Session state types

use phulong_http::types::Principal;
use std::fmt;

/// Opaque bearer credential
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// A validated token together with the identity it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: AccessToken,
    principal: Principal,
}

impl Session {
    pub fn new(token: AccessToken, principal: Principal) -> Self {
        Self { token, principal }
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// Authentication status of the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Storage has not been read yet
    #[default]
    Unknown,
    /// A stored token is being checked against the API
    Validating,
    Authenticated(Session),
    Unauthenticated,
}

impl SessionState {
    /// Still waiting to learn whether a session exists
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Unknown | Self::Validating)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.session().map(Session::principal)
    }
}

/// Session state plus the number of times it has entered `Unauthenticated`
///
/// Consumers that act once per logged-out stretch (such as the route guard's
/// redirect) key off `episode`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub episode: u64,
    /// The login redirect for this episode was already issued by `logout`
    pub login_redirected: bool,
}

impl SessionSnapshot {
    /// Apply a transition, starting a new episode when entering `Unauthenticated`
    pub(crate) fn transition(&mut self, next: SessionState) -> bool {
        if self.state == next {
            return false;
        }
        if next == SessionState::Unauthenticated {
            self.episode += 1;
        }
        self.login_redirected = false;
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phulong_http::types::Role;

    fn principal() -> Principal {
        Principal {
            id: 1,
            username: "admin".into(),
            email: "admin@phulong.vn".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn token_is_redacted() {
        let token = AccessToken::new("secret-value");
        assert!(!format!("{token:?}").contains("secret-value"));
    }

    #[test]
    fn episodes_count_entries_into_unauthenticated() {
        let mut snapshot = SessionSnapshot::default();
        assert!(snapshot.transition(SessionState::Validating));
        assert!(snapshot.transition(SessionState::Unauthenticated));
        assert_eq!(snapshot.episode, 1);

        // Re-entering the same state is not a transition
        assert!(!snapshot.transition(SessionState::Unauthenticated));
        assert_eq!(snapshot.episode, 1);

        let session = Session::new(AccessToken::new("T"), principal());
        assert!(snapshot.transition(SessionState::Authenticated(session)));
        assert!(snapshot.transition(SessionState::Unauthenticated));
        assert_eq!(snapshot.episode, 2);
    }

    #[test]
    fn redirect_flag_cleared_by_next_transition() {
        let mut snapshot = SessionSnapshot::default();
        snapshot.transition(SessionState::Unauthenticated);
        snapshot.login_redirected = true;

        assert!(!snapshot.transition(SessionState::Unauthenticated));
        assert!(snapshot.login_redirected);

        assert!(snapshot.transition(SessionState::Validating));
        assert!(!snapshot.login_redirected);
    }

    #[test]
    fn principal_only_when_authenticated() {
        assert!(SessionState::Unknown.principal().is_none());
        assert!(SessionState::Unknown.is_pending());

        let state = SessionState::Authenticated(Session::new(AccessToken::new("T"), principal()));
        assert_eq!(state.principal().map(|p| p.username.as_str()), Some("admin"));
        assert!(!state.is_pending());
    }
}
