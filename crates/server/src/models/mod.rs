//! Data model for the messaging core
//!
//! Strongly-typed identities, stored messages, derived conversation
//! summaries, and the JSON events exchanged over a live session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque user identity, stable across sessions.
///
/// One canonical representation everywhere: parsing happens once at the
/// boundary, so storage never sees mixed encodings of the same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Platform role attached to every profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Entrepreneur,
    Investor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Entrepreneur => "entrepreneur",
            Role::Investor => "investor",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrepreneur" => Ok(Role::Entrepreneur),
            "investor" => Ok(Role::Investor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A stored private message. Immutable except for the read flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Order key assigned by the store at append time. Strictly increasing
    /// with insertion, so timestamp ties always have a deterministic order.
    pub seq: i64,
    pub from: UserId,
    pub to: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Display attributes of the other side of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
}

/// Sidebar entry: one per counterparty, holding the latest message in
/// either direction and the viewer's unread count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub other_user: Counterparty,
    pub last_message: Message,
    pub unread_count: u32,
}

/// Events a client may send over its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    PrivateMessage { to: UserId, body: String },
    Typing { to: UserId },
    StopTyping { to: UserId },
}

/// Events fanned out to live sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    PrivateMessage(Message),
    Typing { from: UserId },
    StopTyping { from: UserId },
    Conversations(Vec<ConversationSummary>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_round_trips_through_canonical_form() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn client_events_use_socket_style_names() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"private_message","data":{"to":"8f9b5f51-2b8e-4b6f-9d3a-0f1c2d3e4f5a","body":"hi"}}"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::PrivateMessage { .. }));

        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"stop_typing","data":{"to":"8f9b5f51-2b8e-4b6f-9d3a-0f1c2d3e4f5a"}}"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::StopTyping { .. }));
    }
}
