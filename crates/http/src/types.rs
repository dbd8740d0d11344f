//! Wire types exchanged with the REST API

use serde::{Deserialize, Serialize};

/// Login request body
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login response
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Account role as reported by `/users/me`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Root,
    Admin,
    #[serde(other)]
    Unknown,
}

/// The authenticated identity behind a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    /// Root accounts may manage other administrators
    pub fn is_root(&self) -> bool {
        self.role == Role::Root
    }
}

/// Headline numbers shown at the top of the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub new_orders: u64,
    pub services: u64,
    pub customers: u64,
    pub revenue: f64,
    #[serde(default)]
    pub total_orders: Option<u64>,
    #[serde(default)]
    pub pending_orders: Option<u64>,
    #[serde(default)]
    pub completed_orders: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentOrder {
    pub id: i64,
    pub customer_name: String,
    pub service_name: String,
    pub total_price: f64,
    pub status: String,
    pub created_at: String,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularService {
    pub id: i64,
    pub name: String,
    pub order_count: u64,
    pub total_revenue: f64,
    #[serde(default)]
    pub growth_rate: Option<f64>,
}

/// Everything the dashboard renders, fetched together on each refresh
///
/// A part that failed to load is `None`; callers keep their previous value
/// for that part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardBundle {
    pub summary: Option<DashboardSummary>,
    pub recent_orders: Option<Vec<RecentOrder>>,
    pub popular_services: Option<Vec<PopularService>>,
}

impl DashboardBundle {
    /// True when no part of the bundle loaded
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.recent_orders.is_none() && self.popular_services.is_none()
    }

    /// Overlay the parts that loaded onto a previous bundle
    pub fn merge_into(self, previous: &DashboardBundle) -> DashboardBundle {
        DashboardBundle {
            summary: self.summary.or_else(|| previous.summary.clone()),
            recent_orders: self.recent_orders.or_else(|| previous.recent_orders.clone()),
            popular_services: self
                .popular_services
                .or_else(|| previous.popular_services.clone()),
        }
    }
}

/// A service offered on the public site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Filters for the service catalog listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}
