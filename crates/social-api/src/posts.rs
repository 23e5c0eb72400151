use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use social_types::api::PostRequest;
use social_types::models::Post;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::rows::post_from_row;
use crate::validation;

/// Load a post and confirm the caller wrote it.
async fn owned_post(
    state: &AppState,
    id: i64,
    caller: AuthUser,
    action: &str,
) -> Result<(), ApiError> {
    let db = state.db.clone();
    let post = blocking(move || db.get_post(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("post {id} not found")))?;

    if post.author_id != caller.id {
        return Err(ApiError::Forbidden(format!(
            "it's only allowed to {action} a post of your authorship"
        )));
    }
    Ok(())
}

/// POST /posts — the author is always the token subject.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let input = validation::post(&req)?;

    let db = state.db.clone();
    let author_id = caller.id;
    let row = blocking(move || {
        let id = db.create_post(&input.title, &input.content, author_id)?;
        db.get_post(id)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("post vanished after insert"))?;

    info!(post_id = row.id, author_id, "Post created");
    Ok((StatusCode::CREATED, Json(post_from_row(row))))
}

/// GET /posts — the caller's feed.
pub async fn feed(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let db = state.db.clone();
    let rows = blocking(move || db.feed(caller.id)).await?;

    Ok(Json(rows.into_iter().map(post_from_row).collect()))
}

/// GET /posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Post>, ApiError> {
    let Path(id) = path?;
    let db = state.db.clone();
    let row = blocking(move || db.get_post(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("post {id} not found")))?;

    Ok(Json(post_from_row(row)))
}

/// PUT /posts/{id}
pub async fn update_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    owned_post(&state, id, caller, "update").await?;

    let Json(req) = payload?;
    let input = validation::post(&req)?;

    let db = state.db.clone();
    if !blocking(move || db.update_post(id, &input.title, &input.content)).await? {
        return Err(ApiError::NotFound(format!("post {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(caller): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    owned_post(&state, id, caller, "delete").await?;

    let db = state.db.clone();
    if !blocking(move || db.delete_post(id)).await? {
        return Err(ApiError::NotFound(format!("post {id} not found")));
    }

    info!(post_id = id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/{id}/posts
pub async fn get_posts_by_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let Path(author_id) = path?;
    let db = state.db.clone();
    let rows = blocking(move || db.get_posts_by_user(author_id)).await?;

    Ok(Json(rows.into_iter().map(post_from_row).collect()))
}

/// POST /posts/{id}/like
pub async fn like_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let db = state.db.clone();
    if !blocking(move || db.like_post(id)).await? {
        return Err(ApiError::NotFound(format!("post {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /posts/{id}/unlike — stops at zero.
pub async fn unlike_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let db = state.db.clone();
    if !blocking(move || db.unlike_post(id)).await? {
        return Err(ApiError::NotFound(format!("post {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
