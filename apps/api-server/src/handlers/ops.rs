//! Operational endpoints behind basic auth.

use actix_web::{HttpResponse, web};
use gatekeep_shared::dto::DebugVarsResponse;

use crate::state::AppState;

/// GET /v1/debug/vars
pub async fn debug_vars(state: web::Data<AppState>) -> HttpResponse {
    let limiter = &state.limiter;
    let quota = limiter.config();

    HttpResponse::Ok().json(DebugVarsResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        rate_limit_enabled: limiter.mode().is_some(),
        rate_limit_mode: limiter
            .mode()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "disabled".to_string()),
        rate_limit_max_requests: quota.map(|q| q.max_requests()).unwrap_or(0),
        rate_limit_window_secs: quota.map(|q| q.window().as_secs()).unwrap_or(0),
        tracked_keys: limiter.local().map(|l| l.tracked_keys()),
        user_cache_enabled: state.pipeline.identities().cache().is_enabled(),
    })
}
