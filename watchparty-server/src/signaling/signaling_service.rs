use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use watchparty_core::{IceServerConfig, ServerMessage, SessionId, SignalKind};

struct SignalingInner {
    sessions: DashMap<SessionId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Table of live sessions keyed by session id, plus the stateless negotiation relay.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                sessions: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_session(&self, session_id: SessionId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.sessions.insert(session_id, tx);
    }

    pub fn remove_session(&self, session_id: &SessionId) {
        self.inner.sessions.remove(session_id);
    }

    pub fn is_connected(&self, session_id: &SessionId) -> bool {
        self.inner.sessions.contains_key(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn send_signal(&self, session_id: SessionId, msg: &ServerMessage) -> bool {
        let Some(session) = self.inner.sessions.get(&session_id) else {
            warn!(
                "Attempted to send signal to disconnected session {}",
                session_id
            );
            return false;
        };

        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = session.send(Message::Text(json.into())) {
                    error!("Failed to send WS message to {}: {:?}", session_id, e);
                    return false;
                }
                true
            }
            Err(e) => {
                error!("Failed to serialize signal message: {}", e);
                false
            }
        }
    }

    /// Forwards one negotiation message to exactly one recipient, stamping the sender.
    ///
    /// No buffering, ordering or payload validation happens here; a message for a
    /// session that is not connected is dropped.
    pub fn relay(&self, kind: SignalKind, from: SessionId, to: SessionId, payload: Value) -> bool {
        debug!("Relaying {} from {} to {}", kind, from, to);
        self.send_signal(to, &ServerMessage::signal(kind, from, payload))
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send_to(&self, session_id: SessionId, msg: ServerMessage) -> bool {
        self.send_signal(session_id, &msg)
    }
}
