use crate::{ClientEngine, ClientError, ClientEvent, LinkSummary, PlaybackClock, TrackKind};
use std::time::Duration;
use tracing::{info, warn};
use watchparty_core::{ClientMessage, PlayerAction, RoomId, SessionId};

const LEAVE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

impl ClientEngine {
    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    pub fn room(&self) -> &RoomId {
        &self.inner.room
    }

    pub fn user_name(&self) -> &str {
        &self.inner.user_name
    }

    pub async fn play(&self) -> Result<(), ClientError> {
        self.player_action(PlayerAction::Play, None).await
    }

    pub async fn pause(&self) -> Result<(), ClientError> {
        self.player_action(PlayerAction::Pause, None).await
    }

    /// Snaps every member, this one included, to `time` seconds.
    pub async fn seek(&self, time: u64) -> Result<(), ClientError> {
        self.player_action(PlayerAction::Seek, Some(time)).await
    }

    /// Applies locally first; the server never echoes an action back to its issuer.
    async fn player_action(&self, action: PlayerAction, time: Option<u64>) -> Result<(), ClientError> {
        self.inner.clock.lock().await.apply(action, time);
        self.send(ClientMessage::PlayerAction {
            room_id: self.inner.room.clone(),
            action,
            time,
        })
        .await
    }

    pub async fn request_state(&self) -> Result<(), ClientError> {
        self.send(ClientMessage::PlayerGetState {
            room_id: self.inner.room.clone(),
        })
        .await
    }

    pub async fn send_chat(&self, message: impl Into<String>) -> Result<(), ClientError> {
        self.send(ClientMessage::ChatMessage {
            room_id: self.inner.room.clone(),
            user_name: self.inner.user_name.clone(),
            message: message.into(),
        })
        .await
    }

    /// Shares a video with the room. The server broadcasts it back to everyone.
    pub async fn set_media(
        &self,
        url: impl Into<String>,
        provider_type: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.send(ClientMessage::SetPlayerUrl {
            room_id: self.inner.room.clone(),
            url: url.into(),
            provider_type: provider_type.into(),
        })
        .await
    }

    pub async fn playback(&self) -> PlaybackClock {
        self.inner.clock.lock().await.clone()
    }

    pub async fn links(&self) -> Result<Vec<LinkSummary>, ClientError> {
        self.inner.mesh.links().await
    }

    pub async fn is_capturing(&self, kind: TrackKind) -> bool {
        self.inner.local_media.lock().await.is_active(kind)
    }

    /// Turns capture of `kind` on or off and returns the new state.
    ///
    /// Existing links keep running either way; only the content of their slot changes.
    /// A failed start is reported as [`ClientEvent::CaptureFailed`] and leaves capture off.
    pub async fn toggle_capture(&self, kind: TrackKind) -> Result<bool, ClientError> {
        let mut media = self.inner.local_media.lock().await;

        if media.is_active(kind) {
            self.inner.capture.stop(kind).await;
            media.set(kind, None);
            self.inner.mesh.set_local_track(kind, None).await?;
            info!("Capture of {} off", kind);
            return Ok(false);
        }

        match self.inner.capture.start(kind).await {
            Ok(track) => {
                media.set(kind, Some(track.clone()));
                self.inner.mesh.set_local_track(kind, Some(track)).await?;
                info!("Capture of {} on", kind);
                Ok(true)
            }
            Err(e) => {
                warn!("Capture of {} failed: {}", kind, e);
                self.emit(ClientEvent::CaptureFailed(e.clone()));
                Err(e.into())
            }
        }
    }

    /// Leaves the room, tears down every link and closes the session channel.
    pub async fn leave(&self) {
        let _ = self
            .send(ClientMessage::LeaveRoom {
                room_id: self.inner.room.clone(),
            })
            .await;
        self.inner.mesh.shutdown().await;
        self.inner.sink.close();

        if let Some(writer) = self.inner.writer.lock().await.take() {
            if tokio::time::timeout(LEAVE_FLUSH_TIMEOUT, writer).await.is_err() {
                warn!("Session writer did not flush in time");
            }
        }
        for task in self.inner.tasks.lock().await.drain(..) {
            task.abort();
        }
        info!("Left room '{}'", self.inner.room);
    }
}
