//! Delivery router: persistence plus live fan-out.
//!
//! A message is durably stored before any session sees it; if the store
//! fails, nothing is broadcast. Typing signals skip storage entirely.

use crate::conversations::ConversationAggregator;
use crate::directory::UserDirectory;
use crate::error::{Error, Result};
use crate::models::{Message, ServerEvent, UserId};
use crate::presence::PresenceHub;
use crate::store::MessageStore;
use std::sync::Arc;
use tracing::{debug, info};

pub struct DeliveryRouter {
    store: Arc<MessageStore>,
    hub: Arc<PresenceHub>,
    directory: Arc<UserDirectory>,
    conversations: Arc<ConversationAggregator>,
}

impl DeliveryRouter {
    pub fn new(
        store: Arc<MessageStore>,
        hub: Arc<PresenceHub>,
        directory: Arc<UserDirectory>,
        conversations: Arc<ConversationAggregator>,
    ) -> Self {
        Self {
            store,
            hub,
            directory,
            conversations,
        }
    }

    /// Persist a message, then fan it out to every live session of the
    /// recipient and of the sender (so the sender's other devices see it).
    ///
    /// Returns `None` when the send is dropped: empty body, self-send, or
    /// unknown recipient. The reference behavior is to stay silent rather
    /// than fail the session. With no live recipient the message is still
    /// stored and surfaces on the next thread or sidebar fetch.
    pub async fn send_message(
        &self,
        from: UserId,
        to: UserId,
        body: &str,
    ) -> Result<Option<Message>> {
        if body.trim().is_empty() || from == to {
            debug!("[Delivery] dropping invalid send from {}", from);
            return Ok(None);
        }
        match self.directory.lookup(to).await {
            Ok(_) => {}
            Err(Error::NotFound(_)) => {
                debug!("[Delivery] dropping send to unknown recipient {}", to);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        // Persist first: a message is never delivered live without having
        // been durably stored.
        let message = self.store.append(from, to, body).await?;

        self.hub
            .broadcast_to(to, ServerEvent::PrivateMessage(message.clone()))
            .await;
        self.hub
            .broadcast_to(from, ServerEvent::PrivateMessage(message.clone()))
            .await;

        info!("[Delivery] {} -> {} (seq {})", from, to, message.seq);
        Ok(Some(message))
    }

    /// Relay a typing signal to the target's sessions only. Fire-and-forget:
    /// nothing is stored, and a stop without a preceding start is a
    /// harmless no-op downstream.
    pub async fn send_typing(&self, from: UserId, to: UserId, started: bool) {
        let event = if started {
            ServerEvent::Typing { from }
        } else {
            ServerEvent::StopTyping { from }
        };
        self.hub.broadcast_to(to, event).await;
    }

    /// Recompute the viewer's conversation list and push it to their own
    /// sessions. Used at session open and after mark-read; never sent to
    /// the counterparty, since read state is not observable to the sender.
    pub async fn push_snapshot(&self, user: UserId) -> Result<()> {
        let summaries = self.conversations.list(user).await?;
        self.hub
            .broadcast_to(user, ServerEvent::Conversations(summaries))
            .await;
        Ok(())
    }
}
