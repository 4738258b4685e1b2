//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A role as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResponse {
    pub name: String,
    pub level: i32,
}

/// Response containing a user's public information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub role: RoleResponse,
    pub created_at: DateTime<Utc>,
}

/// A post as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a post. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl UpdatePostRequest {
    /// Reject empty or oversized fields, mirroring what the posts table accepts.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() || title.chars().count() > 100 {
                return Err("title must be between 1 and 100 characters".to_string());
            }
        }
        if let Some(content) = &self.content {
            if content.trim().is_empty() || content.chars().count() > 1000 {
                return Err("content must be between 1 and 1000 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Liveness report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub env: String,
    pub version: String,
}

/// Operational snapshot served behind basic auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugVarsResponse {
    pub version: String,
    pub rate_limit_enabled: bool,
    pub rate_limit_mode: String,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    /// Keys with an open window; only reported for the in-process limiter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked_keys: Option<usize>,
    pub user_cache_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_validation() {
        assert!(UpdatePostRequest::default().validate().is_ok());

        let blank = UpdatePostRequest {
            title: Some("   ".to_string()),
            content: None,
        };
        assert!(blank.validate().is_err());

        let long = UpdatePostRequest {
            title: None,
            content: Some("x".repeat(1001)),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_update_request_fields_are_optional() {
        let req: UpdatePostRequest = serde_json::from_str(r#"{"title":"New"}"#).unwrap();

        assert_eq!(req.title.as_deref(), Some("New"));
        assert!(req.content.is_none());
    }
}
