mod playback;
mod room;
mod session;
mod signaling;

pub use playback::{MediaRef, PlaybackState, PlayerAction};
pub use room::{Member, RoomId};
pub use session::SessionId;
pub use signaling::{IceCandidate, IceServerConfig, SdpType, SessionDescription, SignalKind};
