use crate::room::room_command::{RoomCommand, RoomSnapshot};
use crate::signaling::SignalingOutput;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watchparty_core::{
    MediaRef, Member, PlaybackState, PlayerAction, RoomId, ServerMessage, SessionId,
};

/// Authoritative state of one room: join-ordered members, playback and shared media.
///
/// Owned by a single task; every mutation arrives as a [`RoomCommand`] and is handled
/// to completion before the next one is read.
pub struct Room {
    id: RoomId,
    members: Vec<Member>,
    playback: PlaybackState,
    media: Option<MediaRef>,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
}

impl Room {
    pub fn new(
        id: RoomId,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            id,
            members: Vec::new(),
            playback: PlaybackState::default(),
            media: None,
            command_rx,
            signaling,
        }
    }

    pub async fn run(mut self) {
        info!("Room '{}' event loop started", self.id);

        loop {
            match self.command_rx.recv().await {
                Some(cmd) => self.handle_command(cmd).await,
                None => {
                    info!("Command channel closed. Shutting down room '{}'.", self.id);
                    break;
                }
            }
        }

        info!("Room '{}' event loop finished", self.id);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                session_id,
                user_name,
            } => {
                self.join(session_id, user_name).await;
            }

            RoomCommand::Leave { session_id } => {
                self.leave(session_id).await;
            }

            RoomCommand::Chat { user_name, message } => {
                let msg = ServerMessage::ChatMessage { user_name, message };
                self.signaling.broadcast(&self.member_ids(), msg).await;
            }

            RoomCommand::PlayerAction {
                session_id,
                from_user,
                action,
                time,
            } => {
                self.set_playback_state(session_id, &from_user, action, time)
                    .await;
            }

            RoomCommand::GetPlaybackState { session_id } => {
                let state = self.playback_state();
                let msg = ServerMessage::PlayerState {
                    playing: state.playing,
                    time: state.time,
                };
                self.signaling.send_to(session_id, msg).await;
            }

            RoomCommand::SetMedia { media } => {
                self.set_media(media).await;
            }

            RoomCommand::GetMedia { session_id } => {
                let Some(media) = self.media() else {
                    debug!("Room '{}' has no media yet, nothing to send", self.id);
                    return;
                };
                let msg = ServerMessage::PlayerUrl {
                    url: media.url.clone(),
                    provider_type: media.provider_type.clone(),
                };
                self.signaling.send_to(session_id, msg).await;
            }

            RoomCommand::Inspect { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Appends the session to the member list unless already present and returns the
    /// join-ordered members.
    ///
    /// A new member triggers `user-joined` to everyone else and `users-update` to everyone.
    /// A duplicate join mutates nothing and only refreshes the joiner's snapshot.
    pub async fn join(&mut self, session_id: SessionId, user_name: String) -> Vec<Member> {
        if self.position_of(&session_id).is_some() {
            debug!(
                "Session {} already in room '{}', ignoring duplicate join",
                session_id, self.id
            );
            let msg = ServerMessage::UsersUpdate {
                members: self.members.clone(),
                leaving_user_name: None,
            };
            self.signaling.send_to(session_id, msg).await;
            return self.members.clone();
        }

        info!(
            "Session {} ('{}') joined room '{}' at position {}",
            session_id,
            user_name,
            self.id,
            self.members.len()
        );
        self.members.push(Member::new(session_id, user_name.clone()));

        let others: Vec<SessionId> = self
            .member_ids()
            .into_iter()
            .filter(|id| *id != session_id)
            .collect();
        let joined = ServerMessage::UserJoined {
            id: session_id,
            user_name,
        };
        self.signaling.broadcast(&others, joined).await;

        let update = ServerMessage::UsersUpdate {
            members: self.members.clone(),
            leaving_user_name: None,
        };
        self.signaling.broadcast(&self.member_ids(), update).await;

        self.members.clone()
    }

    /// Removes the session if it is a member and notifies the remaining members.
    pub async fn leave(&mut self, session_id: SessionId) -> Option<Member> {
        let Some(position) = self.position_of(&session_id) else {
            debug!("Session {} not in room '{}', nothing to leave", session_id, self.id);
            return None;
        };
        let leaving = self.members.remove(position);
        info!(
            "Session {} ('{}') left room '{}', {} member(s) remain",
            session_id,
            leaving.user_name,
            self.id,
            self.members.len()
        );

        let remaining = self.member_ids();
        let left = ServerMessage::UserLeft {
            id: session_id,
            user_name: Some(leaving.user_name.clone()),
        };
        self.signaling.broadcast(&remaining, left).await;

        let update = ServerMessage::UsersUpdate {
            members: self.members.clone(),
            leaving_user_name: Some(leaving.user_name.clone()),
        };
        self.signaling.broadcast(&remaining, update).await;

        Some(leaving)
    }

    /// Applies a playback action and relays it, annotated with the issuer's name, to every
    /// other member. The issuer never gets its own action back.
    pub async fn set_playback_state(
        &mut self,
        session_id: SessionId,
        from_user: &str,
        action: PlayerAction,
        time: Option<u64>,
    ) -> bool {
        if !self.playback.apply(action, time) {
            warn!(
                "Dropping malformed '{}' from {} in room '{}'",
                action, session_id, self.id
            );
            return false;
        }

        let from_user = self
            .members
            .iter()
            .find(|m| m.id == session_id)
            .map(|m| m.user_name.clone())
            .unwrap_or_else(|| from_user.to_owned());
        debug!(
            "Room '{}' playback {:?} after '{}' from {}",
            self.id, self.playback, action, from_user
        );

        let others: Vec<SessionId> = self
            .member_ids()
            .into_iter()
            .filter(|id| *id != session_id)
            .collect();
        let msg = ServerMessage::PlayerAction {
            action,
            time,
            from_user,
        };
        self.signaling.broadcast(&others, msg).await;
        true
    }

    /// Stored state, `{playing: false, time: 0}` for a room nobody has touched.
    pub fn playback_state(&self) -> PlaybackState {
        self.playback
    }

    /// Stores the shared video reference and announces it to every member, sender included.
    pub async fn set_media(&mut self, media: MediaRef) {
        info!(
            "Room '{}' media set to {} ({})",
            self.id, media.url, media.provider_type
        );
        self.media = Some(media.clone());
        let msg = ServerMessage::PlayerUrl {
            url: media.url,
            provider_type: media.provider_type,
        };
        self.signaling.broadcast(&self.member_ids(), msg).await;
    }

    pub fn media(&self) -> Option<&MediaRef> {
        self.media.as_ref()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            members: self.members.clone(),
            playback: self.playback,
            media: self.media.clone(),
        }
    }

    fn member_ids(&self) -> Vec<SessionId> {
        self.members.iter().map(|m| m.id).collect()
    }

    fn position_of(&self, session_id: &SessionId) -> Option<usize> {
        self.members.iter().position(|m| m.id == *session_id)
    }
}
