use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::{debug, error};

use social_db::Database;
use social_types::api::{LoginRequest, LoginResponse};

use crate::error::ApiError;
use crate::password;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

/// Immutable per-process state shared by every request.
pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: TokenService) -> AppState {
        Arc::new(Self { db, tokens })
    }
}

/// Run blocking work (SQLite, Argon2) off the async runtime.
pub async fn blocking<F, T>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow!("blocking task failed: {}", e)
    })?
}

/// POST /login — exchange email and password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("e-mail and password required".into()));
    }

    let db = state.db.clone();
    let credentials = blocking(move || db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".into()))?;

    let user_id = credentials.id;
    let hash = credentials.password;
    let plaintext = req.password;
    blocking(move || Ok(password::verify_password(&hash, &plaintext)))
        .await?
        .map_err(|e| match e {
            password::PasswordError::Mismatch => {
                ApiError::Unauthorized("invalid credentials".into())
            }
            other => other.into(),
        })?;

    let token = state.tokens.issue(user_id)?;
    debug!(user_id, "Issued token");

    Ok(Json(LoginResponse { user_id, token }))
}
