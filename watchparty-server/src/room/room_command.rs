use tokio::sync::oneshot;
use watchparty_core::{MediaRef, Member, PlaybackState, PlayerAction, SessionId};

/// Commands routed to a room's event loop from the session handlers.
#[derive(Debug)]
pub enum RoomCommand {
    /// A session asked to join (duplicate joins are idempotent).
    Join {
        session_id: SessionId,
        user_name: String,
    },

    /// Explicit leave or transport disconnect.
    Leave { session_id: SessionId },

    Chat { user_name: String, message: String },

    /// `play` / `pause` / `seek` issued by a session.
    PlayerAction {
        session_id: SessionId,
        from_user: String,
        action: PlayerAction,
        time: Option<u64>,
    },

    GetPlaybackState { session_id: SessionId },

    SetMedia { media: MediaRef },

    GetMedia { session_id: SessionId },

    /// Read-only snapshot, used by diagnostics and tests.
    Inspect { reply: oneshot::Sender<RoomSnapshot> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub members: Vec<Member>,
    pub playback: PlaybackState,
    pub media: Option<MediaRef>,
}
