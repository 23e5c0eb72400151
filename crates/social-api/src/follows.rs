use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
};

use social_db::is_constraint_violation;
use social_types::models::User;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::rows::user_from_row;

/// POST /users/{id}/follow — the caller starts following `id`. Repeats are no-ops.
pub async fn follow(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(caller): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let Path(target) = path?;
    if target == caller.id {
        return Err(ApiError::Forbidden("it's not possible to follow yourself".into()));
    }

    let db = state.db.clone();
    let follower = caller.id;
    // The foreign key on the edge rejects an unknown target.
    blocking(move || db.follow(target, follower))
        .await
        .map_err(|err| {
            if is_constraint_violation(&err) {
                ApiError::NotFound(format!("user {target} not found"))
            } else {
                err.into()
            }
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /users/{id}/unfollow — succeeds whether or not the caller followed `id`.
pub async fn unfollow(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(caller): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let Path(target) = path?;
    if target == caller.id {
        return Err(ApiError::Forbidden("it's not possible to unfollow yourself".into()));
    }

    let db = state.db.clone();
    let follower = caller.id;
    blocking(move || db.unfollow(target, follower)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/{id}/followers
pub async fn followers(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Path(user_id) = path?;
    let db = state.db.clone();
    let rows = blocking(move || db.get_followers(user_id)).await?;

    Ok(Json(rows.into_iter().map(user_from_row).collect()))
}

/// GET /users/{id}/following
pub async fn following(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Path(user_id) = path?;
    let db = state.db.clone();
    let rows = blocking(move || db.get_following(user_id)).await?;

    Ok(Json(rows.into_iter().map(user_from_row).collect()))
}
