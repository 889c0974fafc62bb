//! HTTP surface
//!
//! Thin axum wiring over the core components. Route handlers stay small: the
//! interesting behavior lives in `history`, `probe`, and `relay`; everything
//! here is request parsing and response shaping.

pub mod files;
pub mod handlers;
pub mod settings;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;

use crate::config::DeckConfig;
use crate::history::log::MessageLog;
use crate::probe::AgentProbe;
use crate::relay::{AgentInvoker, ChatRelay};

/// Shared application state passed to axum handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<DeckConfig>,
    /// The history log
    pub log: Arc<MessageLog>,
    /// Agent liveness probe
    pub probe: Arc<dyn AgentProbe>,
    /// Chat relay
    pub relay: Arc<ChatRelay>,
}

impl AppState {
    /// Build the full component graph from a configuration and the two
    /// swappable seams (probe and invoker).
    pub fn new(
        config: DeckConfig,
        probe: Arc<dyn AgentProbe>,
        invoker: Arc<dyn AgentInvoker>,
    ) -> Self {
        let config = Arc::new(config);
        let log = Arc::new(MessageLog::new(config.history_path()));
        let relay = Arc::new(ChatRelay::new(
            Arc::clone(&log),
            Arc::clone(&probe),
            invoker,
            config.files_root.to_string_lossy().into_owned(),
            config.invoke_timeout.as_secs(),
        ));

        Self {
            config,
            log,
            probe,
            relay,
        }
    }
}

/// Build the axum router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/status", get(handlers::status))
        .route("/api/history", get(handlers::history))
        .route(
            "/api/sessions/{session_id}",
            get(handlers::get_session)
                .patch(handlers::rename_session)
                .delete(handlers::delete_session),
        )
        .route(
            "/api/sessions/{session_id}/messages",
            get(handlers::session_messages),
        )
        .route("/api/chat", post(handlers::chat))
        .route("/api/agents", get(settings::agents))
        .route("/api/permissions", get(settings::permissions))
        .route("/api/mcp", get(settings::mcp_list))
        .route("/api/mcp/{name}", get(settings::mcp_get))
        .route("/api/mcp/{name}/toggle", post(settings::mcp_toggle))
        .route("/api/todos", get(settings::todos))
        .route("/api/execute", post(settings::execute))
        .route("/api/files/browse", get(files::browse))
        .route("/api/files/read", get(files::read_file))
        .route("/api/files/write", post(files::write_file))
        .route("/api/files/delete", delete(files::delete_file))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Handle returned by [`start`], keeping the serve task alive
pub struct ServerHandle {
    /// Bound port (useful with port 0)
    pub port: u16,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Wait for the serve task to finish (it normally never does)
    pub async fn wait(self) {
        let _ = self.server.await;
    }
}

/// Bind the configured port and start serving in a background task
pub async fn start(state: AppState) -> std::io::Result<ServerHandle> {
    let port = state.config.port;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    let local_addr = listener.local_addr()?;
    log::info!("agentdeck listening on http://{local_addr}");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        server,
    })
}
