//! Profile routes: browse the directory, read and edit your own profile.

use crate::config::AppState;
use crate::directory::{ProfileUpdate, UserProfile};
use crate::error::Result;
use crate::handlers::authenticate;
use crate::handlers::messages::parse_user_id;
use crate::models::Role;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub role: Option<Role>,
}

/// GET /api/profiles?role=investor
pub async fn list_profiles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Vec<UserProfile>>> {
    let me = authenticate(&state, &headers).await?;
    let profiles = state.directory.list(query.role, me).await?;
    Ok(Json(profiles))
}

/// GET /api/profiles/me
pub async fn my_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>> {
    let me = authenticate(&state, &headers).await?;
    let profile = state.directory.lookup(me).await?;
    Ok(Json(profile))
}

/// PUT /api/profiles/me
pub async fn update_my_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    let me = authenticate(&state, &headers).await?;
    let profile = state.directory.update_profile(me, update).await?;
    Ok(Json(profile))
}

/// GET /api/profiles/{id}
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>> {
    authenticate(&state, &headers).await?;
    let profile = state.directory.lookup(parse_user_id(&id)?).await?;
    Ok(Json(profile))
}
