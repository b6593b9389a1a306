//! Bearer-token verification.
//!
//! The core never authenticates users itself: it takes the opaque token a
//! client presents at session open and resolves it to a verified identity.
//! Tokens are minted out-of-band (demo seeder, tests, a future login
//! service) via `issue`.

use crate::error::{Error, Result};
use crate::models::UserId;
use crate::store::open_pool;
use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct CachedToken {
    user: UserId,
    expires_at: DateTime<Utc>,
}

pub struct TokenVerifier {
    pool: SqlitePool,
    /// In-memory cache so the hot path skips the database.
    cache: RwLock<HashMap<String, CachedToken>>,
}

impl TokenVerifier {
    pub async fn new(db_path: &Path) -> Result<Self> {
        let verifier = Self {
            pool: open_pool(db_path).await?,
            cache: RwLock::new(HashMap::new()),
        };
        verifier.init_db().await?;

        info!("[Auth] Token verifier initialized");
        Ok(verifier)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mint an opaque bearer token for a user (30-day expiry).
    pub async fn issue(&self, user: UserId) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let expires_at = created_at + Duration::days(30);

        sqlx::query(
            "INSERT INTO tokens (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user.to_string())
        .bind(created_at.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.cache
            .write()
            .await
            .insert(token.clone(), CachedToken { user, expires_at });

        Ok(token)
    }

    /// Resolve a bearer token to a verified identity.
    pub async fn verify(&self, token: &str) -> Result<UserId> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(token) {
                if cached.expires_at > Utc::now() {
                    return Ok(cached.user);
                }
            }
        }

        let row: Option<(String, String)> =
            sqlx::query_as("SELECT user_id, expires_at FROM tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        let (user_id, expires_at) = row.ok_or(Error::Unauthorized("invalid token"))?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|e| Error::Internal(anyhow!("corrupt token expiry: {e}")))?
            .with_timezone(&Utc);
        if expires_at <= Utc::now() {
            warn!("[Auth] expired token presented");
            return Err(Error::Unauthorized("token expired"));
        }

        let user: UserId = user_id
            .parse()
            .map_err(|e| Error::Internal(anyhow!("corrupt user id on token: {e}")))?;

        self.cache
            .write()
            .await
            .insert(token.to_string(), CachedToken { user, expires_at });

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn issued_token_verifies_to_its_user() {
        let dir = TempDir::new().unwrap();
        let verifier = TokenVerifier::new(&dir.path().join("nexus.sqlite"))
            .await
            .unwrap();

        let user = UserId::new();
        let token = verifier.issue(user).await.unwrap();
        assert_eq!(verifier.verify(&token).await.unwrap(), user);
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let dir = TempDir::new().unwrap();
        let verifier = TokenVerifier::new(&dir.path().join("nexus.sqlite"))
            .await
            .unwrap();

        let err = verifier.verify("not-a-token").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn verification_survives_a_cold_cache() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("nexus.sqlite");

        let user = UserId::new();
        let token = {
            let verifier = TokenVerifier::new(&db).await.unwrap();
            verifier.issue(user).await.unwrap()
        };

        let verifier = TokenVerifier::new(&db).await.unwrap();
        assert_eq!(verifier.verify(&token).await.unwrap(), user);
    }
}
