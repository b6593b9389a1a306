//! Message routes: thread history, mark-read, and the conversation sidebar.

use crate::config::AppState;
use crate::error::{Error, Result};
use crate::handlers::authenticate;
use crate::models::{ConversationSummary, Message, UserId};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId> {
    raw.parse()
        .map_err(|_| Error::Validation("invalid user id".into()))
}

/// GET /api/messages/recent
pub async fn recent_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ConversationSummary>>> {
    let me = authenticate(&state, &headers).await?;
    let summaries = state.conversations.list(me).await?;
    Ok(Json(summaries))
}

/// GET /api/messages/thread/{user_id}
pub async fn get_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Message>>> {
    let me = authenticate(&state, &headers).await?;
    let other = parse_user_id(&user_id)?;

    // A thread against an unknown user is a 404, not an empty list.
    state.directory.lookup(other).await?;

    let messages = state.store.thread(me, other).await?;
    Ok(Json(messages))
}

/// PUT /api/messages/mark-read/{user_id}
pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    let me = authenticate(&state, &headers).await?;
    let other = parse_user_id(&user_id)?;

    let modified = state.read_state.mark_thread_read(me, other).await?;
    state.delivery.push_snapshot(me).await?;

    Ok(Json(json!({ "ok": true, "modified": modified })))
}
