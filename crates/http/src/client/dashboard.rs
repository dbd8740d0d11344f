//! Admin dashboard resources

use super::{AuthenticatedApiClient, error::ClientError};
use crate::types::{DashboardBundle, DashboardSummary, PopularService, RecentOrder};

impl AuthenticatedApiClient {
    /// Headline numbers for the dashboard
    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ClientError> {
        self.get_json("/dashboard/summary").await
    }

    /// Most recent orders
    pub async fn recent_orders(&self, limit: u32) -> Result<Vec<RecentOrder>, ClientError> {
        self.get_json(&format!("/dashboard/recent-orders?limit={limit}"))
            .await
    }

    /// Services ranked by order count
    pub async fn popular_services(&self, limit: u32) -> Result<Vec<PopularService>, ClientError> {
        self.get_json(&format!("/dashboard/popular-services?limit={limit}"))
            .await
    }

    /// Fetch every dashboard resource concurrently
    ///
    /// Each resource is fetched independently; a failed part is left `None`.
    /// Fails only when no part could be loaded, returning the summary's error.
    pub async fn dashboard(&self, limit: u32) -> Result<DashboardBundle, ClientError> {
        let (summary, recent_orders, popular_services) = futures::join!(
            self.dashboard_summary(),
            self.recent_orders(limit),
            self.popular_services(limit),
        );

        match (summary, recent_orders, popular_services) {
            (Err(e), Err(_), Err(_)) => Err(e),
            (summary, recent_orders, popular_services) => Ok(DashboardBundle {
                summary: keep_ok("summary", summary),
                recent_orders: keep_ok("recent orders", recent_orders),
                popular_services: keep_ok("popular services", popular_services),
            }),
        }
    }
}

fn keep_ok<T>(part: &str, result: Result<T, ClientError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to load dashboard {part}: {e}");
            None
        }
    }
}
