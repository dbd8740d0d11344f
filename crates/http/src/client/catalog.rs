//! Public service catalog

use super::{PublicApiClient, error::ClientError};
use crate::types::{Service, ServiceQuery};
use reqwest::Method;

impl PublicApiClient {
    /// List services, optionally filtered
    pub async fn list_services(&self, query: &ServiceQuery) -> Result<Vec<Service>, ClientError> {
        let request = self.request(Method::GET, "/services").query(query);
        self.execute(request).await
    }

    /// Get a single service
    pub async fn get_service(&self, id: i64) -> Result<Service, ClientError> {
        let request = self.request(Method::GET, &format!("/services/{id}"));
        self.execute(request).await
    }

    /// Services suggested alongside the one currently shown
    pub async fn suggested_services(&self, current_id: i64) -> Result<Vec<Service>, ClientError> {
        let request = self
            .request(Method::GET, "/services/suggested")
            .query(&[("current_id", current_id)]);
        self.execute(request).await
    }
}
