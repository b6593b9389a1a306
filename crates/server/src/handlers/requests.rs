//! Connection request routes.

use crate::config::AppState;
use crate::error::Result;
use crate::handlers::authenticate;
use crate::models::UserId;
use crate::requests::{ConnectionRequest, RequestBox};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SendRequestInput {
    pub to: UserId,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRequestsQuery {
    #[serde(default, rename = "box")]
    pub scope: RequestBox,
}

/// POST /api/requests
pub async fn send_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SendRequestInput>,
) -> Result<Json<ConnectionRequest>> {
    let me = authenticate(&state, &headers).await?;
    let request = state.requests.send(me, input.to, input.message).await?;
    Ok(Json(request))
}

/// GET /api/requests?box=outbox
pub async fn list_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<ConnectionRequest>>> {
    let me = authenticate(&state, &headers).await?;
    let requests = state.requests.list(me, query.scope).await?;
    Ok(Json(requests))
}

/// PUT /api/requests/{id}/accept
pub async fn accept_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionRequest>> {
    let me = authenticate(&state, &headers).await?;
    let request = state.requests.respond(id, me, true).await?;
    Ok(Json(request))
}

/// PUT /api/requests/{id}/reject
pub async fn reject_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionRequest>> {
    let me = authenticate(&state, &headers).await?;
    let request = state.requests.respond(id, me, false).await?;
    Ok(Json(request))
}
