use crate::model::session::SessionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque room name typed by a participant. The first join implicitly creates the room.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Rooms with a blank name are treated as a missing `roomId` and ignored.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a room's join-ordered member list.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: SessionId,
    pub user_name: String,
}

impl Member {
    pub fn new(id: SessionId, user_name: impl Into<String>) -> Self {
        Self {
            id,
            user_name: user_name.into(),
        }
    }
}
