use crate::{LinkSummary, LocalTrack, TrackKind};
use serde_json::Value;
use tokio::sync::oneshot;
use watchparty_core::{Member, SessionId, SignalKind};

/// Input to the mesh coordinator. Nothing outside the coordinator touches links directly.
#[derive(Debug)]
pub enum MeshCommand {
    /// Full, authoritative membership snapshot in join order.
    Membership(Vec<Member>),
    MemberLeft(SessionId),
    Signal {
        kind: SignalKind,
        from: SessionId,
        payload: Value,
    },
    SetLocalTrack {
        kind: TrackKind,
        track: Option<LocalTrack>,
    },
    Links {
        reply: oneshot::Sender<Vec<LinkSummary>>,
    },
    Shutdown,
}
