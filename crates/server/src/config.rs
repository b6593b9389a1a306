//! Server configuration and shared state.

use crate::auth::TokenVerifier;
use crate::conversations::ConversationAggregator;
use crate::delivery::DeliveryRouter;
use crate::directory::UserDirectory;
use crate::presence::PresenceHub;
use crate::readstate::ReadStateManager;
use crate::requests::RequestManager;
use crate::store::MessageStore;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the SQLite database.
    pub data_dir: PathBuf,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let data_dir = std::env::var("NEXUS_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("nexus_data"));
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(4000);

        Self { data_dir, port }
    }
}

impl ServerConfig {
    /// Config rooted at an explicit directory, with an OS-assigned port.
    /// Used by tests so nothing leaks between runs.
    pub fn with_base_dir(base: &Path) -> Self {
        Self {
            data_dir: base.to_path_buf(),
            port: 0,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("nexus.sqlite")
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

/// Everything the routes need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<TokenVerifier>,
    pub directory: Arc<UserDirectory>,
    pub store: Arc<MessageStore>,
    pub presence: Arc<PresenceHub>,
    pub conversations: Arc<ConversationAggregator>,
    pub delivery: Arc<DeliveryRouter>,
    pub read_state: Arc<ReadStateManager>,
    pub requests: Arc<RequestManager>,
}

impl AppState {
    pub async fn init(config: &ServerConfig) -> anyhow::Result<Self> {
        config.ensure_dirs()?;
        let db = config.db_path();

        let auth = Arc::new(TokenVerifier::new(&db).await?);
        let directory = Arc::new(UserDirectory::new(&db).await?);
        let store = Arc::new(MessageStore::new(&db).await?);
        let presence = Arc::new(PresenceHub::new());
        let conversations = Arc::new(ConversationAggregator::new(
            store.clone(),
            directory.clone(),
        ));
        let delivery = Arc::new(DeliveryRouter::new(
            store.clone(),
            presence.clone(),
            directory.clone(),
            conversations.clone(),
        ));
        let read_state = Arc::new(ReadStateManager::new(store.clone()));
        let requests = Arc::new(RequestManager::new(&db).await?);

        info!("[Config] state ready, db at {}", db.display());
        Ok(Self {
            auth,
            directory,
            store,
            presence,
            conversations,
            delivery,
            read_state,
            requests,
        })
    }
}
