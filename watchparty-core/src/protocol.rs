//! JSON messages carried over the session channel.
//!
//! Every frame is `{"type": "<kebab-case name>", "payload": {...}}`. Negotiation
//! payloads stay as raw JSON so the server can forward them without parsing.

use crate::model::{IceServerConfig, Member, PlayerAction, RoomId, SessionId, SignalKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent by a participant to the coordinating process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    JoinRoom {
        room_id: RoomId,
        user_name: String,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    Offer {
        room_id: RoomId,
        to: SessionId,
        payload: Value,
    },
    Answer {
        room_id: RoomId,
        to: SessionId,
        payload: Value,
    },
    IceCandidate {
        room_id: RoomId,
        to: SessionId,
        payload: Value,
    },
    ChatMessage {
        room_id: RoomId,
        user_name: String,
        message: String,
    },
    PlayerAction {
        room_id: RoomId,
        action: PlayerAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<u64>,
    },
    PlayerGetState {
        room_id: RoomId,
    },
    SetPlayerUrl {
        room_id: RoomId,
        url: String,
        #[serde(alias = "type")]
        provider_type: String,
    },
    GetPlayerUrl {
        room_id: RoomId,
    },
}

impl ClientMessage {
    pub fn room_id(&self) -> &RoomId {
        match self {
            ClientMessage::JoinRoom { room_id, .. }
            | ClientMessage::LeaveRoom { room_id }
            | ClientMessage::Offer { room_id, .. }
            | ClientMessage::Answer { room_id, .. }
            | ClientMessage::IceCandidate { room_id, .. }
            | ClientMessage::ChatMessage { room_id, .. }
            | ClientMessage::PlayerAction { room_id, .. }
            | ClientMessage::PlayerGetState { room_id }
            | ClientMessage::SetPlayerUrl { room_id, .. }
            | ClientMessage::GetPlayerUrl { room_id } => room_id,
        }
    }

    /// Builds the outbound envelope for one negotiation message.
    pub fn signal(kind: SignalKind, room_id: RoomId, to: SessionId, payload: Value) -> Self {
        match kind {
            SignalKind::Offer => ClientMessage::Offer {
                room_id,
                to,
                payload,
            },
            SignalKind::Answer => ClientMessage::Answer {
                room_id,
                to,
                payload,
            },
            SignalKind::IceCandidate => ClientMessage::IceCandidate {
                room_id,
                to,
                payload,
            },
        }
    }
}

/// Messages sent by the coordinating process to a participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    Welcome {
        id: SessionId,
        ice_servers: Vec<IceServerConfig>,
    },
    UserJoined {
        id: SessionId,
        user_name: String,
    },
    UsersUpdate {
        members: Vec<Member>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        leaving_user_name: Option<String>,
    },
    UserLeft {
        id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_name: Option<String>,
    },
    Offer {
        from: SessionId,
        payload: Value,
    },
    Answer {
        from: SessionId,
        payload: Value,
    },
    IceCandidate {
        from: SessionId,
        payload: Value,
    },
    ChatMessage {
        user_name: String,
        message: String,
    },
    PlayerAction {
        action: PlayerAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<u64>,
        from_user: String,
    },
    PlayerState {
        playing: bool,
        time: u64,
    },
    PlayerUrl {
        url: String,
        provider_type: String,
    },
}

impl ServerMessage {
    /// Builds the delivered form of a relayed negotiation message.
    pub fn signal(kind: SignalKind, from: SessionId, payload: Value) -> Self {
        match kind {
            SignalKind::Offer => ServerMessage::Offer { from, payload },
            SignalKind::Answer => ServerMessage::Answer { from, payload },
            SignalKind::IceCandidate => ServerMessage::IceCandidate { from, payload },
        }
    }
}
