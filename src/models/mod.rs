use serde::{Deserialize, Serialize};

pub mod company;
pub mod reference;
pub mod review;
pub mod suggestion;
pub mod user;

pub use company::*;
pub use reference::*;
pub use review::*;
pub use suggestion::*;
pub use user::*;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> ApiResponse<T> {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String, details: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody { message, details }),
        }
    }
}

/// Plain acknowledgement payload used by delete/logout style endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Dashboard counters for administrators
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AdminStatistics {
    pub users_count: i64,
    pub companies_count: i64,
    pub reviews_count: i64,
    pub pending_reviews: i64,
    pub approved_reviews: i64,
    pub rejected_reviews: i64,
    pub cities_count: i64,
    pub industries_count: i64,
    pub benefit_types_count: i64,
    pub rating_categories_count: i64,
    pub employment_types_count: i64,
    pub employment_periods_count: i64,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
