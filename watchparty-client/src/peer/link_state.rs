use std::fmt;
use watchparty_core::SessionId;

/// Lifecycle of one link instance. A missing entry in the mesh table is the absent state.
///
/// `Closed` is terminal: re-linking the same remote means a new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Connecting => f.write_str("connecting"),
            LinkState::Connected => f.write_str("connected"),
            LinkState::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Initiator,
    Responder,
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkRole::Initiator => f.write_str("initiator"),
            LinkRole::Responder => f.write_str("responder"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSummary {
    pub remote: SessionId,
    pub role: LinkRole,
    pub state: LinkState,
}
