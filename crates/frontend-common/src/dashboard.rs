//! Admin dashboard data kept fresh by a [`PeriodicRefresher`]

use crate::auth::SessionStore;
use crate::config::ClientConfig;
use crate::refresh::{PeriodicRefresher, RefreshSchedule};
use phulong_http::types::DashboardBundle;
use phulong_http::{ClientError, PublicApiClient};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Latest dashboard data for the current session
#[derive(Clone)]
pub struct DashboardFeed {
    inner: Arc<Inner>,
}

struct Inner {
    session: SessionStore,
    client: PublicApiClient,
    limit: u32,
    bundle: watch::Sender<DashboardBundle>,
}

impl DashboardFeed {
    pub fn new(session: SessionStore, client: PublicApiClient, limit: u32) -> Self {
        let (bundle, _) = watch::channel(DashboardBundle::default());
        Self {
            inner: Arc::new(Inner {
                session,
                client,
                limit,
                bundle,
            }),
        }
    }

    pub fn from_config(session: SessionStore, client: PublicApiClient, config: &ClientConfig) -> Self {
        Self::new(session, client, config.dashboard_limit)
    }

    /// Fetch every dashboard part and overlay what loaded onto the previous data
    ///
    /// Failures never affect the session; a part that failed keeps its
    /// previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no session or no part could be loaded
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let api = self
            .inner
            .session
            .authenticated_client(&self.inner.client)
            .ok_or_else(|| ClientError::AuthenticationFailed("no active session".into()))?;

        let fresh = api.dashboard(self.inner.limit).await?;
        debug!(
            summary = fresh.summary.is_some(),
            recent_orders = fresh.recent_orders.is_some(),
            popular_services = fresh.popular_services.is_some(),
            "Dashboard refreshed"
        );
        self.inner
            .bundle
            .send_modify(|current| *current = fresh.merge_into(current));
        Ok(())
    }

    pub fn latest(&self) -> DashboardBundle {
        self.inner.bundle.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardBundle> {
        self.inner.bundle.subscribe()
    }

    /// Refresher whose runs call [`refresh`](Self::refresh)
    pub fn refresher(&self) -> PeriodicRefresher {
        let feed = self.clone();
        PeriodicRefresher::new(move || {
            let feed = feed.clone();
            async move { feed.refresh().await }
        })
    }

    /// Disabled auto-refresh schedule using the configured interval
    pub fn schedule(&self, config: &ClientConfig) -> RefreshSchedule {
        RefreshSchedule::new(self.refresher(), config.auto_refresh_interval())
    }
}
