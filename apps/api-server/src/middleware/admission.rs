//! Admission middleware - runs every guarded request through the pipeline.

use actix_web::{
    Error, HttpMessage, ResponseError, web,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{
        Method,
        header::{self, HeaderName, HeaderValue},
    },
};
use std::future::{Future, Ready, ready};
use std::net::SocketAddr;
use std::pin::Pin;
use std::rc::Rc;

use gatekeep_core::AccessRequirement;

use super::error::AppError;
use crate::state::AppState;

/// Path parameter naming the post behind ownership-gated routes.
const POST_ID_PARAM: &str = "post_id";

/// Admission middleware factory.
///
/// Every request must carry a valid bearer token. Methods registered with
/// [`owner_or_role`](Self::owner_or_role) additionally require the caller to
/// own the post named by `{post_id}` or hold the given role. That post is
/// loaded once the caller is authenticated and placed in the request
/// extensions for the handler.
#[derive(Clone, Default)]
pub struct Admission {
    owner_rules: Rc<Vec<(Method, String)>>,
}

impl Admission {
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn owner_or_role(mut self, method: Method, role: &str) -> Self {
        Rc::make_mut(&mut self.owner_rules).push((method, role.to_string()));
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for Admission
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AdmissionService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionService {
            service: Rc::new(service),
            owner_rules: self.owner_rules.clone(),
        }))
    }
}

pub struct AdmissionService<S> {
    service: Rc<S>,
    owner_rules: Rc<Vec<(Method, String)>>,
}

impl<S, B> Service<ServiceRequest> for AdmissionService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let required_role = self
            .owner_rules
            .iter()
            .find(|(method, _)| method == req.method())
            .map(|(_, role)| role.clone());

        Box::pin(async move {
            let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
                tracing::error!("AppState not found in app data");
                return Ok(reject(req, AppError::Internal("server misconfigured".to_string())));
            };

            let authorization = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let identity = match state.pipeline.authenticate(authorization.as_deref()).await {
                Ok(identity) => identity,
                Err(e) => return Ok(reject(req, e.into())),
            };

            // The post is only looked up for authenticated callers.
            let requirement = match required_role {
                Some(role) => match load_post(&req, &state).await {
                    Ok(post) => {
                        let requirement = AccessRequirement::OwnerOrRole {
                            owner_id: post.user_id,
                            role,
                        };
                        req.extensions_mut().insert(post);
                        requirement
                    }
                    Err(e) => return Ok(reject(req, e)),
                },
                None => AccessRequirement::Authenticated,
            };

            let client = client_key(&req, state.trust_proxy_headers);
            match state
                .pipeline
                .admit_identity(identity, &requirement, &client)
                .await
            {
                Ok(admitted) => {
                    req.extensions_mut().insert(admitted.identity);

                    let mut res = service.call(req).await?;
                    if let Some(quota) = admitted.rate_limit {
                        res.headers_mut().insert(
                            HeaderName::from_static("x-ratelimit-remaining"),
                            HeaderValue::from(quota.remaining),
                        );
                    }
                    Ok(res.map_into_left_body())
                }
                Err(e) => Ok(reject(req, e.into())),
            }
        })
    }
}

/// Address the client-keyed quota counts against: the TCP peer's IP, or the
/// forwarded client IP when the server sits behind a trusted proxy.
fn client_key(req: &ServiceRequest, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = req.connection_info().realip_remote_addr() {
            return strip_port(forwarded);
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn strip_port(addr: &str) -> String {
    match addr.parse::<SocketAddr>() {
        Ok(socket) => socket.ip().to_string(),
        Err(_) => addr.trim_start_matches('[').trim_end_matches(']').to_string(),
    }
}

async fn load_post(
    req: &ServiceRequest,
    state: &AppState,
) -> Result<gatekeep_core::domain::Post, AppError> {
    let post_id: i64 = req
        .match_info()
        .get(POST_ID_PARAM)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| AppError::BadRequest("invalid post id".to_string()))?;

    state.posts.get_by_id(post_id).await.map_err(AppError::from)
}

fn reject<B>(req: ServiceRequest, err: AppError) -> ServiceResponse<EitherBody<B>> {
    let (http_req, _payload) = req.into_parts();
    ServiceResponse::new(http_req, err.error_response()).map_into_right_body()
}
