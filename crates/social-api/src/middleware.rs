use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{debug, info};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::token::bearer_token;

/// The caller, as established by a validated bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
}

/// Access log line for every request, emitted before authentication.
pub async fn log_request(req: Request, next: Next) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    info!(method = %req.method(), path = %req.uri().path(), host, "request");

    next.run(req).await
}

/// Reject the request with 401 unless it carries a valid bearer token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = state
        .tokens
        .extract_subject(bearer_token(req.headers()))
        .inspect_err(|e| debug!("Rejected token: {}", e))?;

    req.extensions_mut().insert(AuthUser { id: user_id });
    Ok(next.run(req).await)
}
