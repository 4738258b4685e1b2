//! Post handlers. Ownership checks happen in the admission middleware.

use actix_web::{HttpResponse, web};
use gatekeep_core::domain::Post;
use gatekeep_shared::dto::{PostResponse, UpdatePostRequest};

use crate::middleware::CurrentUser;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn post_response(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        user_id: post.user_id,
        title: post.title,
        content: post.content,
        created_at: post.created_at,
    }
}

/// GET /v1/posts/{post_id}
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let post = state.posts.get_by_id(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(post_response(post)))
}

/// PATCH /v1/posts/{post_id} - owner or moderator.
pub async fn update_post(
    state: web::Data<AppState>,
    current: CurrentUser,
    post: web::ReqData<Post>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate().map_err(AppError::BadRequest)?;

    let mut post = post.into_inner();
    if let Some(title) = req.title {
        post.title = title;
    }
    if let Some(content) = req.content {
        post.content = content;
    }

    let updated = state.posts.update(post).await?;
    tracing::info!(post_id = updated.id, user_id = current.0.user_id(), "Post updated");

    Ok(HttpResponse::Ok().json(post_response(updated)))
}

/// DELETE /v1/posts/{post_id} - owner or admin.
pub async fn delete_post(
    state: web::Data<AppState>,
    current: CurrentUser,
    post: web::ReqData<Post>,
) -> AppResult<HttpResponse> {
    state.posts.delete(post.id).await?;
    tracing::info!(post_id = post.id, user_id = current.0.user_id(), "Post deleted");

    Ok(HttpResponse::NoContent().finish())
}
