//! Append-only private message log backed by SQLite.
//!
//! Messages are immutable except for the read flag. Ordering is
//! `(created_at, seq)` with `seq` assigned by AUTOINCREMENT, so concurrent
//! writers never collide on an order key.

use super::open_pool;
use crate::error::{Error, Result};
use crate::models::{Message, UserId};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

type MessageRow = (i64, String, String, String, String, bool);

pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Open (or create) the message log.
    pub async fn new(db_path: &Path) -> Result<Self> {
        let store = Self {
            pool: open_pool(db_path).await?,
        };
        store.init_db().await?;

        info!("[Store] Message log ready at {:?}", db_path);
        Ok(store)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                sender TEXT NOT NULL,
                recipient TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                read INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_pair ON messages (sender, recipient)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a message, assigning its timestamp and order key.
    ///
    /// The store is identity-agnostic: self-sends are rejected at the
    /// delivery layer, not here.
    pub async fn append(&self, from: UserId, to: UserId, body: &str) -> Result<Message> {
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::Validation("message body must not be empty".into()));
        }

        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO messages (sender, recipient, body, created_at, read) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .bind(body)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Message {
            seq: result.last_insert_rowid(),
            from,
            to,
            body: body.to_string(),
            created_at,
            read: false,
        })
    }

    /// Full ordered history between two users, ascending by
    /// `(created_at, seq)`. Each call is a fresh query; new messages show
    /// up on re-fetch.
    pub async fn thread(&self, a: UserId, b: UserId) -> Result<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT seq, sender, recipient, body, created_at, read FROM messages
            WHERE (sender = ? AND recipient = ?) OR (sender = ? AND recipient = ?)
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(b.to_string())
        .bind(a.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_row).collect()
    }

    /// Every message the user sent or received, ascending. Aggregator input.
    pub async fn involving(&self, user: UserId) -> Result<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT seq, sender, recipient, body, created_at, read FROM messages
            WHERE sender = ? OR recipient = ?
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(user.to_string())
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_row).collect()
    }

    /// Mark every unread message in the sender→recipient direction as read
    /// and return the number of rows changed.
    ///
    /// Pure set-to-true: redundant calls change zero rows and never error.
    /// Rows appended after the update ran are left unread.
    pub async fn mark_read(&self, from: UserId, to: UserId) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read = 1 WHERE sender = ? AND recipient = ? AND read = 0",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn parse_row(row: MessageRow) -> Result<Message> {
    let (seq, sender, recipient, body, created_at, read) = row;

    let from: UserId = sender
        .parse()
        .map_err(|e| Error::Internal(anyhow!("corrupt sender id in row {seq}: {e}")))?;
    let to: UserId = recipient
        .parse()
        .map_err(|e| Error::Internal(anyhow!("corrupt recipient id in row {seq}: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(anyhow!("corrupt timestamp in row {seq}: {e}")))?
        .with_timezone(&Utc);

    Ok(Message {
        seq,
        from,
        to,
        body,
        created_at,
        read,
    })
}
