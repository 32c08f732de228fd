pub use watchparty_core::{ClientMessage, RoomId, ServerMessage, SessionId};

pub mod model {
    pub use watchparty_core::model::*;
    pub use watchparty_core::{format_time, parse_time};
}

#[cfg(feature = "server")]
pub mod server {
    pub use watchparty_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use watchparty_client::*;
}
