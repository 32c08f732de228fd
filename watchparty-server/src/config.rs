use std::net::SocketAddr;
use watchparty_core::IceServerConfig;

/// Settings for one signaling server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Handed to every session in its `welcome` so clients need no baked-in ICE list.
    pub ice_servers: Vec<IceServerConfig>,
    pub room_channel_capacity: usize,
}

impl ServerConfig {
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            ice_servers: vec![
                IceServerConfig::stun("stun:stun.l.google.com:19302"),
                IceServerConfig::stun("stun:stun1.l.google.com:19302"),
            ],
            room_channel_capacity: 100,
        }
    }
}
