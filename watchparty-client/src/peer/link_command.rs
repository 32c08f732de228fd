use crate::{LocalTrack, TrackKind};
use watchparty_core::{IceCandidate, SessionDescription, SessionId};

use super::LinkState;

/// Work routed to one link's task by the mesh coordinator.
#[derive(Debug)]
pub enum LinkCommand {
    RemoteOffer(SessionDescription),
    RemoteAnswer(SessionDescription),
    RemoteCandidate(IceCandidate),
    /// New content for a local slot; `None` when capture of that kind turned off.
    SetLocalTrack {
        kind: TrackKind,
        track: Option<LocalTrack>,
    },
    Close,
}

/// Reports from a link task back to the coordinator, tagged with the link instance.
#[derive(Debug)]
pub struct LinkEvent {
    pub remote: SessionId,
    pub instance: u64,
    pub kind: LinkEventKind,
}

#[derive(Debug)]
pub enum LinkEventKind {
    StateChanged(LinkState),
    RemoteTrack {
        kind: TrackKind,
        track_id: String,
    },
}
