//! Domain-level error types.

use std::time::Duration;

use thiserror::Error;

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

/// Why a request was refused admission.
///
/// Every variant maps to a stable HTTP status and a machine-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests { retry_after: Duration },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdmissionError {
    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        Self::Unauthenticated(detail.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated(_) => 401,
            Self::Forbidden => 403,
            Self::TooManyRequests { .. } => 429,
            Self::Internal(_) => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::TooManyRequests { .. } => "too_many_requests",
            Self::Internal(_) => "internal",
        }
    }

    /// Back-off hint, only present on quota rejections.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TooManyRequests { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
