use crate::{AppState, RoomCommand};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watchparty_core::{ClientMessage, MediaRef, RoomId, ServerMessage, SessionId, SignalKind};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Room membership of one connection. A session sits in at most one room.
#[derive(Default)]
struct Presence {
    room: Option<(RoomId, String)>,
}

impl Presence {
    fn user_name(&self) -> &str {
        self.room.as_ref().map(|(_, name)| name.as_str()).unwrap_or("")
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = SessionId::new();
    info!("New WebSocket connection: {}", session_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.signaling.add_session(session_id, tx);
    state.signaling.send_signal(
        session_id,
        &ServerMessage::Welcome {
            id: session_id,
            ice_servers: state.signaling.get_ice_servers(),
        },
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut presence = Presence::default();

    loop {
        tokio::select! {
            _ = &mut send_task => {
                debug!("Outbound half of {} closed", session_id);
                break;
            }
            frame = receiver.next() => {
                let Some(Ok(frame)) = frame else { break };
                match frame {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => handle_message(&state, session_id, &mut presence, msg).await,
                        Err(e) => warn!("Invalid message from {}: {}", session_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    send_task.abort();
    state.signaling.remove_session(&session_id);
    if let Some((room_id, _)) = presence.room.take() {
        state
            .room_manager
            .dispatch(&room_id, RoomCommand::Leave { session_id })
            .await;
    }
    info!("WebSocket disconnected: {}", session_id);
}

async fn handle_message(
    state: &AppState,
    session_id: SessionId,
    presence: &mut Presence,
    msg: ClientMessage,
) {
    let room_id = msg.room_id().clone();
    if room_id.is_blank() {
        warn!("Dropping message without roomId from {}", session_id);
        return;
    }
    let rooms = &state.room_manager;

    match msg {
        ClientMessage::JoinRoom { user_name, .. } => {
            if let Some((current, _)) = presence.room.take() {
                if current != room_id {
                    info!("Session {} switches from '{}' to '{}'", session_id, current, room_id);
                    rooms
                        .dispatch(&current, RoomCommand::Leave { session_id })
                        .await;
                }
            }
            presence.room = Some((room_id.clone(), user_name.clone()));
            rooms
                .dispatch(
                    &room_id,
                    RoomCommand::Join {
                        session_id,
                        user_name,
                    },
                )
                .await;
        }

        ClientMessage::LeaveRoom { .. } => {
            if presence.room.as_ref().is_some_and(|(r, _)| *r == room_id) {
                presence.room = None;
                rooms
                    .dispatch(&room_id, RoomCommand::Leave { session_id })
                    .await;
            }
        }

        ClientMessage::Offer { to, payload, .. } => {
            state.signaling.relay(SignalKind::Offer, session_id, to, payload);
        }
        ClientMessage::Answer { to, payload, .. } => {
            state.signaling.relay(SignalKind::Answer, session_id, to, payload);
        }
        ClientMessage::IceCandidate { to, payload, .. } => {
            state
                .signaling
                .relay(SignalKind::IceCandidate, session_id, to, payload);
        }

        ClientMessage::ChatMessage {
            user_name, message, ..
        } => {
            rooms
                .dispatch(&room_id, RoomCommand::Chat { user_name, message })
                .await;
        }

        ClientMessage::PlayerAction { action, time, .. } => {
            let cmd = RoomCommand::PlayerAction {
                session_id,
                from_user: presence.user_name().to_owned(),
                action,
                time,
            };
            rooms.dispatch(&room_id, cmd).await;
        }

        ClientMessage::PlayerGetState { .. } => {
            rooms
                .dispatch(&room_id, RoomCommand::GetPlaybackState { session_id })
                .await;
        }

        ClientMessage::SetPlayerUrl {
            url, provider_type, ..
        } => {
            let media = MediaRef::new(url, provider_type);
            rooms
                .dispatch(&room_id, RoomCommand::SetMedia { media })
                .await;
        }

        ClientMessage::GetPlayerUrl { .. } => {
            rooms
                .dispatch(&room_id, RoomCommand::GetMedia { session_id })
                .await;
        }
    }
}
