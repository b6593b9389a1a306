//! User directory.
//!
//! Profile records for the two platform roles. The messaging core only
//! needs `lookup`; the profile routes reuse the same manager for browsing
//! and self-service updates. Credentials live outside this subsystem.

use crate::error::{Error, Result};
use crate::models::{Counterparty, Role, UserId};
use crate::store::open_pool;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

type ProfileRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
);

/// A user's public profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserProfile> for Counterparty {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            role: profile.role,
            avatar_url: profile.avatar_url,
        }
    }
}

/// Fields a user may change on their own profile.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct UserDirectory {
    pool: SqlitePool,
}

impl UserDirectory {
    pub async fn new(db_path: &Path) -> Result<Self> {
        let directory = Self {
            pool: open_pool(db_path).await?,
        };
        directory.init_db().await?;

        info!("[Directory] Initialized");
        Ok(directory)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                role TEXT NOT NULL,
                avatar_url TEXT,
                bio TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create a profile record.
    pub async fn create_user(&self, name: &str, email: &str, role: Role) -> Result<UserProfile> {
        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            return Err(Error::Validation("email already registered".into()));
        }

        let profile = UserProfile {
            id: UserId::new(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            avatar_url: None,
            bio: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO users (id, name, email, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(profile.id.to_string())
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(profile.role.as_str())
        .bind(profile.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!("[Directory] user created: {} ({})", name, email);
        Ok(profile)
    }

    /// Resolve an identity to its profile.
    pub async fn lookup(&self, id: UserId) -> Result<UserProfile> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT id, name, email, role, avatar_url, bio, created_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => parse_row(row),
            None => Err(Error::NotFound("user")),
        }
    }

    /// Browse profiles, optionally filtered by role, excluding the viewer.
    pub async fn list(&self, role: Option<Role>, excluding: UserId) -> Result<Vec<UserProfile>> {
        let rows: Vec<ProfileRow> = if let Some(role) = role {
            sqlx::query_as(
                r#"
                SELECT id, name, email, role, avatar_url, bio, created_at FROM users
                WHERE role = ? AND id != ?
                ORDER BY created_at DESC LIMIT 50
                "#,
            )
            .bind(role.as_str())
            .bind(excluding.to_string())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"
                SELECT id, name, email, role, avatar_url, bio, created_at FROM users
                WHERE id != ?
                ORDER BY created_at DESC LIMIT 50
                "#,
            )
            .bind(excluding.to_string())
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(parse_row).collect()
    }

    /// Update the caller's own display attributes.
    pub async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<UserProfile> {
        let current = self.lookup(id).await?;

        let name = update.name.unwrap_or(current.name);
        let bio = update.bio.or(current.bio);
        let avatar_url = update.avatar_url.or(current.avatar_url);

        sqlx::query("UPDATE users SET name = ?, bio = ?, avatar_url = ? WHERE id = ?")
            .bind(&name)
            .bind(&bio)
            .bind(&avatar_url)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        self.lookup(id).await
    }
}

fn parse_row(row: ProfileRow) -> Result<UserProfile> {
    let (id, name, email, role, avatar_url, bio, created_at) = row;

    Ok(UserProfile {
        id: id
            .parse()
            .map_err(|e| Error::Internal(anyhow!("corrupt user id {id}: {e}")))?,
        name,
        email,
        role: role
            .parse()
            .map_err(|e| Error::Internal(anyhow!("corrupt role for {id}: {e}")))?,
        avatar_url,
        bio,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Internal(anyhow!("corrupt created_at for {id}: {e}")))?
            .with_timezone(&Utc),
    })
}
