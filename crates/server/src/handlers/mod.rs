//! HTTP and WebSocket route handlers.

pub mod messages;
pub mod profiles;
pub mod requests;
pub mod ws;

use crate::config::AppState;
use crate::error::{Error, Result};
use crate::models::UserId;
use axum::http::HeaderMap;

/// Pull the bearer token out of the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(Error::Unauthorized("no auth token"))
}

/// Resolve the request's bearer token to a verified identity.
pub(crate) async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserId> {
    let token = bearer_token(headers)?;
    state.auth.verify(token).await
}
