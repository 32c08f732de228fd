use crate::{CaptureError, CaptureService, ChannelSink, ClientEvent, LocalMedia, MeshHandle, PlaybackClock};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use watchparty_core::{IceServerConfig, RoomId, SessionId};

mod connect_impl;
mod controls_impl;
mod server_message_impl;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the signaling server, e.g. `ws://127.0.0.1:5000/ws`.
    pub server_url: String,
    pub room: RoomId,
    pub user_name: String,
    /// A link not connected within this window is closed.
    pub negotiation_timeout: Duration,
    /// Overrides the ICE servers announced in `welcome`.
    pub ice_servers: Option<Vec<IceServerConfig>>,
    pub tick_interval: Duration,
    pub welcome_timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        server_url: impl Into<String>,
        room: impl Into<RoomId>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            room: room.into(),
            user_name: user_name.into(),
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:5000/ws".to_owned(),
            room: RoomId::from("lobby"),
            user_name: "guest".to_owned(),
            negotiation_timeout: Duration::from_secs(10),
            ice_servers: None,
            tick_interval: Duration::from_secs(1),
            welcome_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[error("timed out waiting for welcome")]
    WelcomeTimeout,
    #[error("unexpected message before welcome: {0}")]
    UnexpectedMessage(String),
    #[error("session channel closed")]
    ChannelClosed,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

struct EngineInner {
    session_id: SessionId,
    room: RoomId,
    user_name: String,
    sink: ChannelSink,
    mesh: MeshHandle,
    capture: Arc<dyn CaptureService>,
    clock: Mutex<PlaybackClock>,
    local_media: Mutex<LocalMedia>,
    events: mpsc::UnboundedSender<ClientEvent>,
    writer: Mutex<Option<JoinHandle<()>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// A participant in one room: session channel, mesh of peer links and local playback clock.
#[derive(Clone)]
pub struct ClientEngine {
    inner: Arc<EngineInner>,
}

impl ClientEngine {
    fn emit(&self, event: ClientEvent) {
        let _ = self.inner.events.send(event);
    }
}
