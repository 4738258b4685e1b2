//! Basic-auth middleware for operational endpoints.

use actix_web::{
    Error, ResponseError, web,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{self, HeaderValue},
};
use std::future::{Ready, ready};

use super::error::AppError;
use crate::state::AppState;

/// Guards a scope with the static basic credentials from [`AppState`].
///
/// The check is synchronous and bypasses the admission pipeline entirely.
pub struct BasicAuth;

impl<S, B> Transform<S, ServiceRequest> for BasicAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = BasicAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BasicAuthService { service }))
    }
}

pub struct BasicAuthService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for BasicAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let verdict = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state.basic.verify(
                req.headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok()),
            ),
            None => {
                tracing::error!("AppState not found in app data");
                Err(gatekeep_core::AdmissionError::internal("server misconfigured"))
            }
        };

        match verdict {
            Ok(()) => {
                let fut = self.service.call(req);
                Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), reason = e.reason(), "Basic auth rejected");

                let mut response = AppError::from(e).error_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="restricted", charset="UTF-8""#),
                );

                let (http_req, _payload) = req.into_parts();
                let srv_response = ServiceResponse::new(http_req, response);
                Box::pin(async move { Ok(srv_response.map_into_right_body()) })
            }
        }
    }
}
