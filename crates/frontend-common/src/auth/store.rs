//! Session store: the single source of truth for "who is logged in"
//!
//! The store owns the persisted token and the resolved principal. Every
//! transition goes through a `watch` channel so the route guard and any
//! other consumer observe them in order.
//!
//! Concurrency rules:
//! - `initialize` runs its validation once per store, however many
//!   consumers call it.
//! - concurrent `validate` calls join the in-flight validation instead of
//!   issuing another `whoami`.
//! - every `whoami` call (validation or the second half of `login`) is
//!   serialized, so at most one is outstanding.
//! - a validation or login result only applies if the token it checked is
//!   still the stored one; a `login` or `logout` that landed meanwhile wins.

use super::api::AuthApi;
use super::error::SessionError;
use super::state::{AccessToken, Session, SessionSnapshot, SessionState};
use super::storage::TokenStorage;
use crate::client::public_client;
use crate::config::{AuthConfig, ClientConfig};
use crate::navigation::Navigator;
use futures::future::{BoxFuture, FutureExt, Shared};
use phulong_core::{CoreError, CoreResult};
use phulong_http::types::{LoginRequest, Principal};
use phulong_http::{AuthenticatedApiClient, ClientError, PublicApiClient};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, watch};
use tracing::{debug, info, instrument, warn};

type Validation = Shared<BoxFuture<'static, bool>>;

/// Whether a token checked earlier is still the persisted one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoredToken {
    Current,
    Replaced,
    Unreadable,
}

/// Cloneable handle to one client session
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn TokenStorage>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    state: watch::Sender<SessionSnapshot>,
    initialized: OnceCell<()>,
    validation: Mutex<Option<Validation>>,
    whoami_gate: Mutex<()>,
}

impl SessionStore {
    pub fn builder() -> SessionStoreBuilder {
        SessionStoreBuilder::default()
    }

    /// Store backed by the HTTP API and a token file in the platform data directory
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the data
    /// directory cannot be determined
    pub fn from_config(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> CoreResult<Self> {
        let storage = super::storage::FileTokenStorage::in_data_dir(&config.token_key)?;
        Self::builder()
            .api(Arc::new(public_client(config)?))
            .storage(Arc::new(storage))
            .navigator(navigator)
            .login_path(&config.login_path)
            .build()
    }

    /// Read the stored token and validate it, once
    ///
    /// Concurrent and repeated calls wait for the first call's outcome
    /// instead of issuing their own request.
    #[instrument(skip_all)]
    pub async fn initialize(&self) -> SessionState {
        self.inner
            .initialized
            .get_or_init(|| async {
                debug!("Restoring session from storage");
                self.validate().await;
            })
            .await;
        self.state()
    }

    /// Check the stored token against the API
    ///
    /// Returns whether a session is active afterwards. A rejected or
    /// unverifiable token is removed from storage.
    #[instrument(skip_all)]
    pub async fn validate(&self) -> bool {
        let flight = {
            let mut slot = self.inner.validation.lock().await;
            match slot.as_ref() {
                Some(flight) => {
                    debug!("Joining in-flight validation");
                    flight.clone()
                }
                None => {
                    let flight = Arc::clone(&self.inner).run_validation().boxed().shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    /// Log in and resolve the principal
    ///
    /// `Ok` is only returned once the principal is known, so the store is
    /// `Authenticated` when this returns successfully. A rejected login
    /// leaves the stored token and state untouched.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Principal, SessionError> {
        let request = LoginRequest::new(username, password);
        let token = match self.inner.api.login(&request).await {
            Ok(token) => token,
            Err(e) => {
                let error = SessionError::from_login(&e);
                warn!(kind = ?error.kind(), "Login failed: {e}");
                return Err(error);
            }
        };

        let persisted = self.inner.persist_token(&token);

        match self.inner.whoami(&token).await {
            Ok(_) if persisted && self.inner.stored_token_status(&token) == StoredToken::Replaced => {
                debug!("Session changed while resolving the new token, discarding login");
                Err(SessionError::TokenRejected)
            }
            Ok(principal) => {
                info!(role = ?principal.role, "Logged in");
                self.inner.set_state(SessionState::Authenticated(Session::new(
                    token,
                    principal.clone(),
                )));
                let _ = self.inner.initialized.set(());
                Ok(principal)
            }
            Err(e) => {
                let error = SessionError::from_validation(&e);
                warn!(kind = ?error.kind(), "Token from login could not be resolved: {e}");
                match self.inner.stored_token_status(&token) {
                    StoredToken::Current => {
                        self.inner.clear_token();
                        self.inner.set_state(SessionState::Unauthenticated);
                    }
                    StoredToken::Unreadable => self.inner.set_state(SessionState::Unauthenticated),
                    StoredToken::Replaced => {}
                }
                Err(error)
            }
        }
    }

    /// Forget the session and send the user to the login screen
    pub fn logout(&self) {
        self.inner.clear_token();
        self.inner.state.send_modify(|snapshot| {
            snapshot.transition(SessionState::Unauthenticated);
            snapshot.login_redirected = true;
        });
        let _ = self.inner.initialized.set(());
        info!("Logged out");
        self.inner.navigator.navigate(&self.inner.login_path);
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().state.clone()
    }

    /// Current state with its unauthenticated episode counter
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receive every state transition
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.inner.state.borrow().state.principal().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().state.is_authenticated()
    }

    /// Bearer client for the current session, if there is one
    pub fn authenticated_client(&self, client: &PublicApiClient) -> Option<AuthenticatedApiClient> {
        self.inner
            .state
            .borrow()
            .state
            .session()
            .map(|session| client.authenticate(session.token().as_str()))
    }

    pub(crate) fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::clone(&self.inner.navigator)
    }

    pub(crate) fn login_path(&self) -> &str {
        &self.inner.login_path
    }
}

impl Inner {
    async fn run_validation(self: Arc<Self>) -> bool {
        let valid = self.check_stored_token().await;
        self.validation.lock().await.take();
        valid
    }

    async fn check_stored_token(&self) -> bool {
        let Some(token) = self.load_token() else {
            debug!("No stored token");
            self.set_state(SessionState::Unauthenticated);
            return false;
        };

        self.state.send_if_modified(|snapshot| {
            snapshot.state == SessionState::Unknown && snapshot.transition(SessionState::Validating)
        });

        let result = self.whoami(&token).await;

        match self.stored_token_status(&token) {
            StoredToken::Current => {}
            StoredToken::Replaced => {
                debug!("Stored token changed during validation, discarding result");
                return self.state.borrow().state.is_authenticated();
            }
            StoredToken::Unreadable => {
                // Cannot confirm the token still belongs to this session
                self.state.send_if_modified(|snapshot| {
                    snapshot.state.is_pending() && snapshot.transition(SessionState::Unauthenticated)
                });
                return self.state.borrow().state.is_authenticated();
            }
        }

        match result {
            Ok(principal) => {
                info!(user = %principal.username, "Session validated");
                self.set_state(SessionState::Authenticated(Session::new(token, principal)));
                true
            }
            Err(e) => {
                let error = SessionError::from_validation(&e);
                warn!(kind = ?error.kind(), "Stored token failed validation: {e}");
                self.clear_token();
                self.set_state(SessionState::Unauthenticated);
                false
            }
        }
    }

    async fn whoami(&self, token: &AccessToken) -> Result<Principal, ClientError> {
        let _gate = self.whoami_gate.lock().await;
        self.api.whoami(token).await
    }

    fn set_state(&self, next: SessionState) {
        self.state
            .send_if_modified(|snapshot| snapshot.transition(next));
    }

    fn load_token(&self) -> Option<AccessToken> {
        self.storage.load().unwrap_or_else(|e| {
            warn!("Failed to read stored token: {e}");
            None
        })
    }

    fn stored_token_status(&self, token: &AccessToken) -> StoredToken {
        match self.storage.load() {
            Ok(Some(stored)) if &stored == token => StoredToken::Current,
            Ok(_) => StoredToken::Replaced,
            Err(e) => {
                warn!("Failed to re-read stored token: {e}");
                StoredToken::Unreadable
            }
        }
    }

    fn persist_token(&self, token: &AccessToken) -> bool {
        match self.storage.store(token) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist token: {e}");
                false
            }
        }
    }

    fn clear_token(&self) {
        if let Err(e) = self.storage.clear() {
            warn!("Failed to clear stored token: {e}");
        }
    }
}

/// Builder for [`SessionStore`]
#[derive(Default)]
pub struct SessionStoreBuilder {
    api: Option<Arc<dyn AuthApi>>,
    storage: Option<Arc<dyn TokenStorage>>,
    navigator: Option<Arc<dyn Navigator>>,
    login_path: Option<String>,
}

impl SessionStoreBuilder {
    /// Set the authentication endpoints
    pub fn api(mut self, api: Arc<dyn AuthApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Set where the token is persisted
    pub fn storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the router used by `logout`
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Set the login screen path (defaults to `/admin/login`)
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    /// Build the store
    ///
    /// # Errors
    ///
    /// Returns an error if the API, storage or navigator is missing
    pub fn build(self) -> CoreResult<SessionStore> {
        let api = self
            .api
            .ok_or_else(|| CoreError::invalid_config("session store requires an auth API"))?;
        let storage = self
            .storage
            .ok_or_else(|| CoreError::invalid_config("session store requires token storage"))?;
        let navigator = self
            .navigator
            .ok_or_else(|| CoreError::invalid_config("session store requires a navigator"))?;

        let (state, _) = watch::channel(SessionSnapshot::default());

        Ok(SessionStore {
            inner: Arc::new(Inner {
                api,
                storage,
                navigator,
                login_path: self
                    .login_path
                    .unwrap_or_else(|| AuthConfig::LOGIN_PATH.to_string()),
                state,
                initialized: OnceCell::new(),
                validation: Mutex::new(None),
                whoami_gate: Mutex::new(()),
            }),
        })
    }
}
