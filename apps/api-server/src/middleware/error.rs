//! Error handling - RFC 7807 compliant responses.

use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use gatekeep_core::admission::ResolveError;
use gatekeep_core::error::{AdmissionError, RepoError};
use gatekeep_shared::ErrorResponse;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Admission(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());

        let error = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
            AppError::Admission(e) => admission_problem(e),
        };

        if let Some(retry_after) = self.retry_after_secs() {
            builder.insert_header((header::RETRY_AFTER, HeaderValue::from(retry_after)));
        }

        builder.json(error)
    }
}

impl AppError {
    /// Whole seconds to wait, rounded up so clients never retry early.
    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AppError::Admission(e) => e.retry_after().map(|d| {
                let secs = d.as_secs();
                if d.subsec_nanos() > 0 { secs + 1 } else { secs }
            }),
            _ => None,
        }
    }
}

fn admission_problem(err: &AdmissionError) -> ErrorResponse {
    let problem = match err {
        // The detail stays generic: token and lookup failures are not told apart.
        AdmissionError::Unauthenticated(_) => ErrorResponse::unauthorized(),
        AdmissionError::Forbidden => ErrorResponse::forbidden(),
        AdmissionError::TooManyRequests { retry_after } => ErrorResponse::too_many_requests()
            .with_detail(format!(
                "Rate limit exceeded. Try again in {:.0} seconds.",
                retry_after.as_secs_f64().ceil()
            )),
        AdmissionError::Internal(detail) => {
            tracing::error!("Admission failed: {}", detail);
            ErrorResponse::internal_error()
        }
    };

    problem.with_reason(err.reason())
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            other => {
                tracing::error!(error = %other, "Repository error");
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(id) => AppError::NotFound(format!("user {id} not found")),
            ResolveError::Repository(e) => e.into(),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_admission_status_codes() {
        let cases = [
            (AdmissionError::unauthenticated("x"), StatusCode::UNAUTHORIZED),
            (AdmissionError::Forbidden, StatusCode::FORBIDDEN),
            (
                AdmissionError::TooManyRequests {
                    retry_after: Duration::from_secs(5),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (AdmissionError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_retry_after_header_rounds_up() {
        let err = AppError::from(AdmissionError::TooManyRequests {
            retry_after: Duration::from_millis(2_100),
        });

        let res = err.error_response();

        assert_eq!(res.headers().get(header::RETRY_AFTER).unwrap(), "3");
    }

    #[test]
    fn test_no_retry_after_on_forbidden() {
        let res = AppError::from(AdmissionError::Forbidden).error_response();

        assert!(res.headers().get(header::RETRY_AFTER).is_none());
    }
}
