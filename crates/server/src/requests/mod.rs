//! Connection requests.
//!
//! Entrepreneur/investor introduction requests: simple single-record
//! mutations kept apart from the messaging core. Listing is decorated with
//! the sender's display attributes straight from the users table.

use crate::error::{Error, Result};
use crate::models::{Role, UserId};
use crate::store::open_pool;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

type RequestRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(Error::Internal(anyhow!("unknown request status: {other}"))),
        }
    }
}

/// Which side of a user's requests to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestBox {
    #[default]
    Inbox,
    Outbox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub id: Uuid,
    pub from: UserId,
    pub from_name: String,
    pub from_role: Role,
    pub to: UserId,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

pub struct RequestManager {
    pool: SqlitePool,
}

impl RequestManager {
    pub async fn new(db_path: &Path) -> Result<Self> {
        let manager = Self {
            pool: open_pool(db_path).await?,
        };
        manager.init_db().await?;

        info!("[Requests] Initialized");
        Ok(manager)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS connection_requests (
                id TEXT PRIMARY KEY,
                from_user_id TEXT NOT NULL,
                to_user_id TEXT NOT NULL,
                message TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                responded_at TEXT,
                UNIQUE(from_user_id, to_user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Send an introduction request.
    pub async fn send(
        &self,
        from: UserId,
        to: UserId,
        message: Option<String>,
    ) -> Result<ConnectionRequest> {
        if from == to {
            return Err(Error::Validation("cannot request yourself".into()));
        }

        let recipient: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
            .bind(to.to_string())
            .fetch_optional(&self.pool)
            .await?;
        if recipient.is_none() {
            return Err(Error::NotFound("recipient"));
        }

        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM connection_requests WHERE from_user_id = ? AND to_user_id = ?",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_optional(&self.pool)
        .await?;
        if existing.is_some() {
            return Err(Error::Validation("request already sent".into()));
        }

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO connection_requests (id, from_user_id, to_user_id, message, status, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(id.to_string())
        .bind(from.to_string())
        .bind(to.to_string())
        .bind(&message)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!("[Requests] {} -> {}", from, to);
        self.get(id).await
    }

    /// A user's requests, newest first.
    pub async fn list(&self, user: UserId, scope: RequestBox) -> Result<Vec<ConnectionRequest>> {
        let filter = match scope {
            RequestBox::Inbox => "r.to_user_id = ?",
            RequestBox::Outbox => "r.from_user_id = ?",
        };
        let query = format!(
            r#"
            SELECT r.id, r.from_user_id, u.name, u.role, r.to_user_id,
                   r.message, r.status, r.created_at
            FROM connection_requests r
            JOIN users u ON r.from_user_id = u.id
            WHERE {filter}
            ORDER BY r.created_at DESC
            "#
        );

        let rows: Vec<RequestRow> = sqlx::query_as(&query)
            .bind(user.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(parse_row).collect()
    }

    /// Accept or reject a pending request addressed to the viewer.
    pub async fn respond(
        &self,
        id: Uuid,
        viewer: UserId,
        accept: bool,
    ) -> Result<ConnectionRequest> {
        let request = self.get(id).await?;
        if request.to != viewer {
            // Addressed to someone else: indistinguishable from missing.
            return Err(Error::NotFound("request"));
        }
        if request.status != RequestStatus::Pending {
            return Err(Error::Validation("request already responded to".into()));
        }

        let status = if accept {
            RequestStatus::Accepted
        } else {
            RequestStatus::Rejected
        };
        sqlx::query("UPDATE connection_requests SET status = ?, responded_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        info!("[Requests] {} {}", id, status.as_str());
        self.get(id).await
    }

    async fn get(&self, id: Uuid) -> Result<ConnectionRequest> {
        let row: Option<RequestRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.from_user_id, u.name, u.role, r.to_user_id,
                   r.message, r.status, r.created_at
            FROM connection_requests r
            JOIN users u ON r.from_user_id = u.id
            WHERE r.id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => parse_row(row),
            None => Err(Error::NotFound("request")),
        }
    }
}

fn parse_row(row: RequestRow) -> Result<ConnectionRequest> {
    let (id, from, from_name, from_role, to, message, status, created_at) = row;

    Ok(ConnectionRequest {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(anyhow!("corrupt request id {id}: {e}")))?,
        from: from
            .parse()
            .map_err(|e| Error::Internal(anyhow!("corrupt sender id on request {id}: {e}")))?,
        from_name,
        from_role: from_role
            .parse()
            .map_err(|e| Error::Internal(anyhow!("corrupt role on request {id}: {e}")))?,
        to: to
            .parse()
            .map_err(|e| Error::Internal(anyhow!("corrupt recipient id on request {id}: {e}")))?,
        message,
        status: RequestStatus::parse(&status)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Internal(anyhow!("corrupt created_at on request {id}: {e}")))?
            .with_timezone(&Utc),
    })
}
