use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use social_db::is_constraint_violation;
use social_types::api::{
    CreateUserRequest, UpdatePasswordRequest, UpdateUserRequest, UserSearchQuery,
};
use social_types::models::User;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::password;
use crate::rows::user_from_row;
use crate::validation;

fn duplicate_or_internal(err: anyhow::Error) -> ApiError {
    if is_constraint_violation(&err) {
        ApiError::Unprocessable("e-mail or nick already in use".into())
    } else {
        err.into()
    }
}

/// POST /users — register an account. The only user route without auth.
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let new_user = validation::new_user(req)?;

    let plaintext = new_user.password;
    let hash = blocking(move || Ok(password::hash_password(&plaintext)?)).await?;

    let db = state.db.clone();
    let profile = new_user.profile;
    let row = blocking(move || {
        let id = db.create_user(&profile.name, &profile.nick, &profile.email, &hash)?;
        db.get_user(id)
    })
    .await
    .map_err(duplicate_or_internal)?
    .ok_or_else(|| anyhow::anyhow!("user vanished after insert"))?;

    info!(user_id = row.id, "User registered");
    Ok((StatusCode::CREATED, Json(user_from_row(row))))
}

/// GET /users?user=<filter>
pub async fn search_users(
    State(state): State<AppState>,
    query: Result<Query<UserSearchQuery>, QueryRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Query(query) = query?;
    let db = state.db.clone();
    let filter = query.user.trim().to_string();
    let rows = blocking(move || db.search_users(&filter)).await?;

    Ok(Json(rows.into_iter().map(user_from_row).collect()))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let Path(id) = path?;

    let db = state.db.clone();
    let row = blocking(move || db.get_user(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;

    Ok(Json(user_from_row(row)))
}

/// PUT /users/{id} — only the account owner may edit their profile.
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    if id != caller.id {
        return Err(ApiError::Forbidden(
            "it's not possible to update a user other than yourself".into(),
        ));
    }

    let Json(req) = payload?;
    let profile = validation::profile_update(&req)?;

    let db = state.db.clone();
    let updated = blocking(move || db.update_user(id, &profile.name, &profile.nick, &profile.email))
        .await
        .map_err(duplicate_or_internal)?;
    if !updated {
        return Err(ApiError::NotFound(format!("user {id} not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /users/{id} — only the account owner may delete it.
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(caller): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    if id != caller.id {
        return Err(ApiError::Forbidden(
            "it's not possible to delete a user other than yourself".into(),
        ));
    }

    let db = state.db.clone();
    if !blocking(move || db.delete_user(id)).await? {
        return Err(ApiError::NotFound(format!("user {id} not found")));
    }

    info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /users/update-password — change the caller's own password.
pub async fn update_password(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    let change = validation::password_change(req)?;

    let db = state.db.clone();
    let user_id = caller.id;
    let stored = blocking(move || db.get_password_hash(user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

    let current = change.current;
    blocking(move || Ok(password::verify_password(&stored, &current))).await??;

    let new = change.new;
    let hash = blocking(move || Ok(password::hash_password(&new)?)).await?;

    let db = state.db.clone();
    if !blocking(move || db.update_password(user_id, &hash)).await? {
        return Err(ApiError::NotFound(format!("user {user_id} not found")));
    }

    info!(user_id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}
