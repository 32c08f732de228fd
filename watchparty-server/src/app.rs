use crate::{RoomManager, ServerConfig, SignalingService, ws_handler};
use anyhow::Context;
use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared handles for the HTTP handlers.
pub struct AppState {
    pub signaling: SignalingService,
    pub room_manager: RoomManager,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let signaling = SignalingService::new(config.ice_servers.clone());
        let room_manager = RoomManager::new(
            Arc::new(signaling.clone()),
            config.room_channel_capacity,
        );
        Self {
            signaling,
            room_manager,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Watchparty signaling server is running" }))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    serve_with_listener(listener, config).await
}

pub async fn serve_with_listener(listener: TcpListener, config: ServerConfig) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let state = Arc::new(AppState::new(&config));
    info!("Signaling server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .context("signaling server terminated")
}
