use crate::{CaptureError, LinkState, TrackKind};
use watchparty_core::{MediaRef, Member, PlayerAction, SessionId};

/// What a running client reports to its host application.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Welcome {
        id: SessionId,
    },
    MembersChanged {
        members: Vec<Member>,
        leaving_user_name: Option<String>,
    },
    MemberJoined {
        id: SessionId,
        user_name: String,
    },
    MemberLeft {
        id: SessionId,
        user_name: Option<String>,
    },
    Chat {
        user_name: String,
        message: String,
    },
    /// A remote member's playback action, already applied to the local clock.
    Playback {
        action: PlayerAction,
        time: Option<u64>,
        from_user: String,
    },
    /// Stored room state received on entry, applied verbatim.
    PlaybackSynced {
        playing: bool,
        time: u64,
    },
    MediaChanged(MediaRef),
    Tick {
        position: u64,
    },
    LinkStateChanged {
        remote: SessionId,
        state: LinkState,
    },
    RemoteTrack {
        remote: SessionId,
        kind: TrackKind,
        track_id: String,
    },
    CaptureFailed(CaptureError),
    Disconnected,
}
