//! Live session registry.
//!
//! Maps a user identity to its set of open sessions so the delivery router
//! can fan events out. A user may hold any number of concurrent sessions
//! (multi-device); sessions vanish on disconnect and are never persisted.

use crate::models::{ServerEvent, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// One live transport connection belonging to exactly one identity.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub user: UserId,
    pub connected_at: DateTime<Utc>,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl SessionHandle {
    /// Create a handle plus the receiving end its writer task drains.
    pub fn new(user: UserId) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4(),
            user,
            connected_at: Utc::now(),
            tx,
        };
        (handle, rx)
    }

    /// Best-effort delivery; a session mid-disconnect just drops the event.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }
}

/// Registry of live sessions, keyed by user identity.
///
/// Injected as an `Arc` through `AppState` rather than living in a global,
/// so every test gets its own isolated hub.
#[derive(Default)]
pub struct PresenceHub {
    rooms: RwLock<HashMap<UserId, Vec<SessionHandle>>>,
}

impl PresenceHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to its user's room.
    pub async fn register(&self, session: SessionHandle) {
        debug!(
            "[Presence] register session {} for {}",
            session.id, session.user
        );
        let mut rooms = self.rooms.write().await;
        rooms.entry(session.user).or_default().push(session);
    }

    /// Remove a session on disconnect. An emptied room is dropped; the next
    /// message to that user simply has no live recipient and stays stored.
    pub async fn deregister(&self, user: UserId, session_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(sessions) = rooms.get_mut(&user) {
            sessions.retain(|s| s.id != session_id);
            if sessions.is_empty() {
                rooms.remove(&user);
            }
        }
        debug!("[Presence] deregister session {} for {}", session_id, user);
    }

    /// All live sessions for a user (possibly empty).
    pub async fn sessions_for(&self, user: UserId) -> Vec<SessionHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(&user).cloned().unwrap_or_default()
    }

    /// Fan one event out to every session of a user.
    pub async fn broadcast_to(&self, user: UserId, event: ServerEvent) {
        for session in self.sessions_for(user).await {
            session.send(event.clone());
        }
    }
}
