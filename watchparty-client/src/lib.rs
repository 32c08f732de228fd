mod candidate_queue;
mod capture;
mod connection;
mod engine;
mod event;
mod mesh;
mod peer;
mod playback;
mod signaling;

pub use candidate_queue::*;
pub use capture::*;
pub use connection::*;
pub use engine::{ClientConfig, ClientEngine, ClientError};
pub use event::*;
pub use mesh::*;
pub use peer::*;
pub use playback::*;
pub use signaling::*;
