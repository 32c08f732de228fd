use async_trait::async_trait;
use watchparty_core::{ServerMessage, SessionId};

/// Outbound side of the session channel, as seen by a room.
///
/// Implemented by the WebSocket signaling service; rooms only ever talk to sessions
/// through this trait.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver one message to one session. Returns `false` if the session is not connected.
    async fn send_to(&self, session_id: SessionId, msg: ServerMessage) -> bool;

    /// Deliver the same message to every listed session.
    async fn broadcast(&self, session_ids: &[SessionId], msg: ServerMessage) {
        for session_id in session_ids {
            self.send_to(*session_id, msg.clone()).await;
        }
    }
}
