//! Conversation aggregation.
//!
//! Computes the sidebar view for a user: one entry per counterparty,
//! holding the latest message in either direction and the viewer's unread
//! count. Pure computation over current store state; nothing here is
//! cached, so callers re-invoke it after any mutation that affects the
//! viewer.

use crate::directory::UserDirectory;
use crate::error::{Error, Result};
use crate::models::{ConversationSummary, Message, UserId};
use crate::store::MessageStore;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ConversationAggregator {
    store: Arc<MessageStore>,
    directory: Arc<UserDirectory>,
}

impl ConversationAggregator {
    pub fn new(store: Arc<MessageStore>, directory: Arc<UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// Conversation summaries for the viewer, most recent first.
    ///
    /// A counterparty with zero unread still appears as long as any message
    /// exists in either direction; a viewer with no messages gets an empty
    /// list.
    pub async fn list(&self, viewer: UserId) -> Result<Vec<ConversationSummary>> {
        let messages = self.store.involving(viewer).await?;

        // Input is ascending by (created_at, seq): the last write per
        // counterparty is that conversation's most recent message.
        let mut latest: HashMap<UserId, Message> = HashMap::new();
        let mut unread: HashMap<UserId, u32> = HashMap::new();
        for message in messages {
            let other = if message.from == viewer {
                message.to
            } else {
                message.from
            };
            if message.from == other && message.to == viewer && !message.read {
                *unread.entry(other).or_default() += 1;
            }
            latest.insert(other, message);
        }

        let mut summaries = Vec::with_capacity(latest.len());
        for (other, last_message) in latest {
            // A counterparty missing from the directory drops out of the
            // view rather than failing the whole snapshot.
            let profile = match self.directory.lookup(other).await {
                Ok(profile) => profile,
                Err(Error::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            summaries.push(ConversationSummary {
                other_user: profile.into(),
                last_message,
                unread_count: unread.get(&other).copied().unwrap_or(0),
            });
        }

        summaries.sort_by(|a, b| {
            (b.last_message.created_at, b.last_message.seq)
                .cmp(&(a.last_message.created_at, a.last_message.seq))
        });

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Arc<MessageStore>,
        directory: Arc<UserDirectory>,
        aggregator: ConversationAggregator,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("nexus.sqlite");
        let store = Arc::new(MessageStore::new(&db).await.unwrap());
        let directory = Arc::new(UserDirectory::new(&db).await.unwrap());
        let aggregator = ConversationAggregator::new(store.clone(), directory.clone());
        Fixture {
            _dir: dir,
            store,
            directory,
            aggregator,
        }
    }

    impl Fixture {
        async fn user(&self, name: &str, email: &str, role: Role) -> UserId {
            self.directory.create_user(name, email, role).await.unwrap().id
        }
    }

    #[tokio::test]
    async fn no_messages_means_empty_list() {
        let fx = fixture().await;
        let viewer = fx.user("Alice", "alice@founder.test", Role::Entrepreneur).await;
        assert!(fx.aggregator.list(viewer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn single_send_shows_up_symmetrically() {
        let fx = fixture().await;
        let a = fx.user("Alice", "alice@founder.test", Role::Entrepreneur).await;
        let b = fx.user("Ivy", "ivy@investor.test", Role::Investor).await;

        let sent = fx.store.append(a, b, "hi").await.unwrap();

        let a_view = fx.aggregator.list(a).await.unwrap();
        let b_view = fx.aggregator.list(b).await.unwrap();
        assert_eq!(a_view.len(), 1);
        assert_eq!(b_view.len(), 1);
        assert_eq!(a_view[0].other_user.id, b);
        assert_eq!(b_view[0].other_user.id, a);
        assert_eq!(a_view[0].last_message.seq, sent.seq);
        assert_eq!(b_view[0].last_message.seq, sent.seq);

        // Unread only counts on the recipient's side.
        assert_eq!(a_view[0].unread_count, 0);
        assert_eq!(b_view[0].unread_count, 1);
    }

    #[tokio::test]
    async fn unread_counts_reset_and_grow_back() {
        let fx = fixture().await;
        let a = fx.user("Alice", "alice@founder.test", Role::Entrepreneur).await;
        let b = fx.user("Ivy", "ivy@investor.test", Role::Investor).await;

        for body in ["one", "two", "three"] {
            fx.store.append(a, b, body).await.unwrap();
        }
        assert_eq!(fx.aggregator.list(b).await.unwrap()[0].unread_count, 3);

        fx.store.mark_read(a, b).await.unwrap();
        let view = fx.aggregator.list(b).await.unwrap();
        assert_eq!(view.len(), 1, "zero unread keeps the entry visible");
        assert_eq!(view[0].unread_count, 0);

        fx.store.append(a, b, "four").await.unwrap();
        assert_eq!(fx.aggregator.list(b).await.unwrap()[0].unread_count, 1);
    }

    #[tokio::test]
    async fn entries_sort_by_most_recent_message() {
        let fx = fixture().await;
        let a = fx.user("Alice", "alice@founder.test", Role::Entrepreneur).await;
        let b = fx.user("Bob", "bob@founder.test", Role::Entrepreneur).await;
        let ivy = fx.user("Ivy", "ivy@investor.test", Role::Investor).await;

        fx.store.append(a, b, "older thread").await.unwrap();
        fx.store.append(ivy, a, "newer thread").await.unwrap();

        let view = fx.aggregator.list(a).await.unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].other_user.id, ivy);
        assert_eq!(view[1].other_user.id, b);

        // Replying flips the order back.
        fx.store.append(b, a, "ping").await.unwrap();
        let view = fx.aggregator.list(a).await.unwrap();
        assert_eq!(view[0].other_user.id, b);
    }

    #[tokio::test]
    async fn counterparty_missing_from_directory_is_skipped() {
        let fx = fixture().await;
        let a = fx.user("Alice", "alice@founder.test", Role::Entrepreneur).await;
        let ghost = UserId::new();

        fx.store.append(ghost, a, "boo").await.unwrap();
        assert!(fx.aggregator.list(a).await.unwrap().is_empty());
    }
}
