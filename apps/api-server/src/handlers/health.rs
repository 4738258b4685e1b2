//! Health check endpoint.

use actix_web::{HttpResponse, web};
use gatekeep_shared::dto::HealthResponse;

use crate::state::AppState;

/// Health check endpoint - returns server status.
///
/// GET /v1/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        env: state.env.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
