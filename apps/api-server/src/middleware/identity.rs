//! Extractor for the identity attached by [`Admission`](super::Admission).

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use std::future::{Ready, ready};

use gatekeep_core::domain::AuthenticatedIdentity;

use super::error::AppError;

/// The admitted caller.
///
/// Only available on routes wrapped by the admission middleware; elsewhere the
/// extractor fails with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedIdentity);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = req.extensions().get::<AuthenticatedIdentity>().cloned();

        ready(identity.map(CurrentUser).ok_or_else(|| {
            AppError::Admission(gatekeep_core::AdmissionError::unauthenticated(
                "no admitted identity on request",
            ))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{ResponseError, http::StatusCode, test};

    use gatekeep_core::domain::{Role, User};

    #[actix_web::test]
    async fn test_reads_identity_from_extensions() {
        let req = test::TestRequest::default().to_http_request();
        let user = User::new(5, "eve", "eve@example.com", Role::new(1, "user", 1));
        req.extensions_mut().insert(AuthenticatedIdentity::new(user));

        let CurrentUser(identity) = CurrentUser::extract(&req).await.unwrap();
        assert_eq!(identity.user_id(), 5);
    }

    #[actix_web::test]
    async fn test_missing_identity_is_401() {
        let req = test::TestRequest::default().to_http_request();

        let err = CurrentUser::extract(&req).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
