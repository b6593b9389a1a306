//! Read-state transitions.

use crate::error::Result;
use crate::models::UserId;
use crate::store::MessageStore;
use std::sync::Arc;
use tracing::info;

/// Marks the viewer's side of a thread as read.
///
/// Thin on purpose: the store's set-based update is the whole mechanism,
/// so redundant or concurrent calls for the same pair are harmless - the
/// second one just changes zero rows.
pub struct ReadStateManager {
    store: Arc<MessageStore>,
}

impl ReadStateManager {
    pub fn new(store: Arc<MessageStore>) -> Self {
        Self { store }
    }

    /// Mark everything the counterparty sent to the viewer as read and
    /// return the number of messages that changed. Callers refresh the
    /// viewer's conversation snapshot afterwards; the counterparty never
    /// observes read state.
    pub async fn mark_thread_read(&self, viewer: UserId, counterparty: UserId) -> Result<u64> {
        let modified = self.store.mark_read(counterparty, viewer).await?;
        if modified > 0 {
            info!(
                "[ReadState] {} read {} messages from {}",
                viewer, modified, counterparty
            );
        }
        Ok(modified)
    }
}
