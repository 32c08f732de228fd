use crate::{ClientEngine, ClientEvent};
use tracing::{debug, warn};
use watchparty_core::{MediaRef, PlaybackState, ServerMessage, SignalKind};

impl ClientEngine {
    pub(super) async fn handle_server_message(&self, msg: ServerMessage) {
        let mesh = &self.inner.mesh;

        match msg {
            ServerMessage::Welcome { .. } => {
                debug!("Ignoring repeated welcome");
            }

            ServerMessage::UserJoined { id, user_name } => {
                self.emit(ClientEvent::MemberJoined { id, user_name });
            }

            ServerMessage::UsersUpdate {
                members,
                leaving_user_name,
            } => {
                if let Err(e) = mesh.update_members(members.clone()).await {
                    warn!("Mesh unavailable: {}", e);
                }
                self.emit(ClientEvent::MembersChanged {
                    members,
                    leaving_user_name,
                });
            }

            ServerMessage::UserLeft { id, user_name } => {
                if let Err(e) = mesh.member_left(id).await {
                    warn!("Mesh unavailable: {}", e);
                }
                self.emit(ClientEvent::MemberLeft { id, user_name });
            }

            ServerMessage::Offer { from, payload } => {
                self.route_signal(SignalKind::Offer, from, payload).await;
            }
            ServerMessage::Answer { from, payload } => {
                self.route_signal(SignalKind::Answer, from, payload).await;
            }
            ServerMessage::IceCandidate { from, payload } => {
                self.route_signal(SignalKind::IceCandidate, from, payload)
                    .await;
            }

            ServerMessage::ChatMessage { user_name, message } => {
                self.emit(ClientEvent::Chat { user_name, message });
            }

            ServerMessage::PlayerAction {
                action,
                time,
                from_user,
            } => {
                if !self.inner.clock.lock().await.apply(action, time) {
                    debug!("Ignoring malformed {} from {}", action, from_user);
                    return;
                }
                self.emit(ClientEvent::Playback {
                    action,
                    time,
                    from_user,
                });
            }

            ServerMessage::PlayerState { playing, time } => {
                self.inner
                    .clock
                    .lock()
                    .await
                    .sync(PlaybackState { playing, time });
                self.emit(ClientEvent::PlaybackSynced { playing, time });
            }

            ServerMessage::PlayerUrl { url, provider_type } => {
                let media = MediaRef::new(url, provider_type);
                self.inner.clock.lock().await.set_media(media.clone());
                self.emit(ClientEvent::MediaChanged(media));
            }
        }
    }

    async fn route_signal(
        &self,
        kind: SignalKind,
        from: watchparty_core::SessionId,
        payload: serde_json::Value,
    ) {
        if let Err(e) = self.inner.mesh.signal(kind, from, payload).await {
            warn!("Dropping {} from {}: {}", kind, from, e);
        }
    }
}
