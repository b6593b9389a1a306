//! Durable storage.
//!
//! All managers share one SQLite file; each owns its pool and creates its
//! own tables on startup.

mod message_store;

pub use message_store::MessageStore;

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Open a pool against the shared database file, creating it if missing.
///
/// WAL plus a busy timeout so the managers' pools can write concurrently
/// without tripping over SQLite's file lock.
pub(crate) async fn open_pool(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    Ok(SqlitePoolOptions::new().connect_with(options).await?)
}
