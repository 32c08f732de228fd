mod app;
mod config;
mod room;
mod signaling;

pub use app::{AppState, router, serve, serve_with_listener};
pub use config::ServerConfig;
pub use room::*;
pub use signaling::*;
