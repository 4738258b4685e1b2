//! Problem-details error body (RFC 7807) returned by every rejected request.

use serde::{Deserialize, Serialize};

/// Error body with a stable `reason` clients can branch on.
///
/// `type` is always `about:blank`, so `title` is the standard reason phrase
/// for `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// e.g. `unauthenticated`, `forbidden`, `too_many_requests`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        503 => "Service Unavailable",
        _ => "Internal Server Error",
    }
}

impl ErrorResponse {
    pub fn for_status(status: u16) -> Self {
        Self {
            error_type: "about:blank".to_string(),
            title: reason_phrase(status).to_string(),
            status,
            detail: None,
            reason: None,
            request_id: None,
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::for_status(400).with_detail(detail)
    }

    pub fn unauthorized() -> Self {
        Self::for_status(401)
    }

    pub fn forbidden() -> Self {
        Self::for_status(403)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::for_status(404).with_detail(detail)
    }

    pub fn too_many_requests() -> Self {
        Self::for_status(429)
    }

    pub fn internal_error() -> Self {
        Self::for_status(500)
    }

    pub fn with_detail(self, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..self
        }
    }

    pub fn with_reason(self, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..self
        }
    }

    pub fn with_request_id(self, request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..self
        }
    }
}
