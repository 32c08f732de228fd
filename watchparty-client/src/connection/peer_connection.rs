use crate::{ConnectionEvent, LocalTrack, TrackKind};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use watchparty_core::{IceCandidate, IceServerConfig, SessionDescription, SessionId};

/// One negotiated media connection to one remote session.
///
/// Calls on a single instance are never issued concurrently; the owning link serializes them.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Creates an offer and applies it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Creates an answer to the applied remote offer and applies it locally.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Only valid once a remote description is applied.
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Whether an outbound slot of this kind already exists and supports in-place replacement.
    async fn has_track_slot(&self, kind: TrackKind) -> bool;

    /// Swaps the content of an existing slot. `None` clears it without removing the slot.
    async fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) -> Result<()>;

    /// Adds a new outbound slot. Takes effect after the next offer/answer round.
    async fn add_track(&self, track: LocalTrack) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn create(
        &self,
        remote: SessionId,
        ice_servers: &[IceServerConfig],
        events: mpsc::Sender<ConnectionEvent>,
    ) -> Result<Box<dyn PeerConnection>>;
}
