use crate::TrackKind;
use watchparty_core::IceCandidate;

/// State reported by the underlying connection object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl TransportState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransportState::Disconnected | TransportState::Failed | TransportState::Closed
        )
    }
}

/// Callbacks of one connection object, delivered to the link that owns it.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    LocalCandidate(IceCandidate),
    StateChanged(TransportState),
    RemoteTrack { kind: TrackKind, track_id: String },
}
