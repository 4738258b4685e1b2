//! User profile handlers.

use actix_web::{HttpResponse, web};
use gatekeep_core::domain::User;
use gatekeep_shared::dto::{RoleResponse, UserResponse};

use crate::middleware::CurrentUser;
use crate::middleware::error::AppResult;
use crate::state::AppState;

pub(crate) fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        is_active: user.is_active,
        role: RoleResponse {
            name: user.role.name.clone(),
            level: user.role.level,
        },
        created_at: user.created_at,
    }
}

/// GET /v1/users/me
pub async fn me(current: CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(user_response(&current.0.user))
}

/// GET /v1/users/{user_id}
///
/// Served through the identity resolver, so repeated lookups hit the user cache.
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = state.pipeline.identities().resolve(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(user_response(&user)))
}
