//! Live session endpoint.
//!
//! A client opens one WebSocket per device. The token travels either in
//! the query string (browser WebSocket APIs cannot set headers) or in the
//! usual Authorization header. After authentication the session gets an
//! initial conversation snapshot, then events flow both ways until the
//! socket closes.

use crate::config::AppState;
use crate::error::Result;
use crate::handlers::bearer_token;
use crate::models::{ClientEvent, UserId};
use crate::presence::SessionHandle;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// GET /ws?token=...
pub async fn ws_connect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    let token = match query.token.as_deref() {
        Some(token) => token,
        None => bearer_token(&headers)?,
    };
    let user = state.auth.verify(token).await?;

    Ok(ws.on_upgrade(move |socket| handle_session(state, user, socket)))
}

async fn handle_session(state: AppState, user: UserId, socket: WebSocket) {
    let (handle, mut events) = SessionHandle::new(user);
    let session_id = handle.id;
    state.presence.register(handle).await;
    info!("[Ws] session {} opened for {}", session_id, user);

    if let Err(e) = state.delivery.push_snapshot(user).await {
        warn!("[Ws] initial snapshot for {} failed: {}", user, e);
    }

    let (mut sink, mut stream) = socket.split();

    // Writer: drain this session's event queue onto the socket.
    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("[Ws] failed to encode event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader: dispatch client events until the socket closes.
    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let event: ClientEvent = match serde_json::from_str(text.as_str()) {
            Ok(event) => event,
            Err(e) => {
                // Malformed frames are dropped, not fatal to the session.
                debug!("[Ws] malformed event from {}: {}", user, e);
                continue;
            }
        };

        let outcome = match event {
            ClientEvent::PrivateMessage { to, body } => state
                .delivery
                .send_message(user, to, &body)
                .await
                .map(|_| ()),
            ClientEvent::Typing { to } => {
                state.delivery.send_typing(user, to, true).await;
                Ok(())
            }
            ClientEvent::StopTyping { to } => {
                state.delivery.send_typing(user, to, false).await;
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!("[Ws] event from {} failed: {}", user, e);
        }
    }

    state.presence.deregister(user, session_id).await;
    writer.abort();
    info!("[Ws] session {} closed for {}", session_id, user);
}
