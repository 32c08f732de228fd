mod connection_event;
mod peer_connection;
mod webrtc_connection;

pub use connection_event::*;
pub use peer_connection::*;
pub use webrtc_connection::*;
