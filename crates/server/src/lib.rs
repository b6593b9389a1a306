//! Business Nexus messaging server.
//!
//! Real-time private messaging for a two-role platform (entrepreneurs and
//! investors): durable message threads over SQLite, live fan-out over
//! WebSocket sessions, conversation summaries with unread counts, plus the
//! profile directory and connection requests the messaging UI leans on.

pub mod auth;
pub mod config;
pub mod conversations;
pub mod delivery;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod models;
pub mod presence;
pub mod readstate;
pub mod requests;
pub mod store;

pub use error::{Error, Result};

use axum::routing::{get, post, put};
use axum::Router;
use config::{AppState, ServerConfig};
use models::Role;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Build the full route tree over shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(handlers::ws::ws_connect))
        .route(
            "/api/messages/recent",
            get(handlers::messages::recent_conversations),
        )
        .route(
            "/api/messages/thread/{user_id}",
            get(handlers::messages::get_thread),
        )
        .route(
            "/api/messages/mark-read/{user_id}",
            put(handlers::messages::mark_read),
        )
        .route("/api/profiles", get(handlers::profiles::list_profiles))
        .route(
            "/api/profiles/me",
            get(handlers::profiles::my_profile).put(handlers::profiles::update_my_profile),
        )
        .route("/api/profiles/{id}", get(handlers::profiles::get_profile))
        .route(
            "/api/requests",
            post(handlers::requests::send_request).get(handlers::requests::list_requests),
        )
        .route(
            "/api/requests/{id}/accept",
            put(handlers::requests::accept_request),
        )
        .route(
            "/api/requests/{id}/reject",
            put(handlers::requests::reject_request),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Seed two demo accounts with ready-to-use tokens. Idempotent: an already
/// registered email is left alone.
async fn seed_demo_users(state: &AppState) -> anyhow::Result<()> {
    let demo = [
        ("Alice Founder", "alice@founder.test", Role::Entrepreneur),
        ("Ivy Investor", "ivy@investor.test", Role::Investor),
    ];

    for (name, email, role) in demo {
        match state.directory.create_user(name, email, role).await {
            Ok(profile) => {
                let token = state.auth.issue(profile.id).await?;
                info!("[Seed] {} <{}> token: {}", name, email, token);
            }
            Err(Error::Validation(_)) => {
                info!("[Seed] {} already present", email);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Start the server: logging, state, routes, listener.
pub async fn run() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("Global tracing subscriber already set");
    }

    info!("=== Business Nexus API ===");

    let config = ServerConfig::default();
    let state = AppState::init(&config).await?;

    if std::env::var("NEXUS_SEED_DEMO").is_ok() {
        seed_demo_users(&state).await?;
    }

    let app = router(state);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
