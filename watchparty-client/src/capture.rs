use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const LOCAL_STREAM_ID: &str = "watchparty-local";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub const ALL: [TrackKind; 2] = [TrackKind::Audio, TrackKind::Video];
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Why a capture attempt failed. Scoped to that one attempt, never to a link.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission to capture {0} was denied")]
    PermissionDenied(TrackKind),
    #[error("no {0} device found")]
    DeviceNotFound(TrackKind),
    #[error("{0} device is busy")]
    DeviceBusy(TrackKind),
    #[error("{0} constraints cannot be satisfied")]
    UnsupportedConstraints(TrackKind),
    #[error("capture unavailable: {0}")]
    Unavailable(String),
}

/// An outbound track ready to be placed into a connection's send slot.
#[derive(Clone)]
pub struct LocalTrack {
    pub kind: TrackKind,
    pub id: String,
    pub track: Arc<TrackLocalStaticSample>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, id: impl Into<String>) -> Self {
        let id = id.into();
        let mime_type = match kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let track = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            id.clone(),
            LOCAL_STREAM_ID.to_owned(),
        );
        Self {
            kind,
            id,
            track: Arc::new(track),
        }
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub kind: TrackKind,
    pub id: String,
    pub label: String,
}

/// Source of local audio/video tracks. Acquisition is async and may fail.
#[async_trait]
pub trait CaptureService: Send + Sync {
    async fn start(&self, kind: TrackKind) -> Result<LocalTrack, CaptureError>;

    async fn stop(&self, kind: TrackKind);

    async fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError>;
}

/// Tracks currently published by this participant, one slot per kind.
#[derive(Debug, Clone, Default)]
pub struct LocalMedia {
    audio: Option<LocalTrack>,
    video: Option<LocalTrack>,
}

impl LocalMedia {
    pub fn get(&self, kind: TrackKind) -> Option<&LocalTrack> {
        match kind {
            TrackKind::Audio => self.audio.as_ref(),
            TrackKind::Video => self.video.as_ref(),
        }
    }

    pub fn set(&mut self, kind: TrackKind, track: Option<LocalTrack>) {
        match kind {
            TrackKind::Audio => self.audio = track,
            TrackKind::Video => self.video = track,
        }
    }

    pub fn is_active(&self, kind: TrackKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.audio.iter().chain(self.video.iter()).cloned().collect()
    }
}

/// Headless capture that hands out blank tracks with no samples written to them.
///
/// Kinds listed in `unavailable` fail with [`CaptureError::DeviceNotFound`].
#[derive(Default)]
pub struct PlaceholderCapture {
    unavailable: Vec<TrackKind>,
    active: Mutex<LocalMedia>,
}

impl PlaceholderCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without(kinds: impl IntoIterator<Item = TrackKind>) -> Self {
        Self {
            unavailable: kinds.into_iter().collect(),
            active: Mutex::new(LocalMedia::default()),
        }
    }
}

#[async_trait]
impl CaptureService for PlaceholderCapture {
    async fn start(&self, kind: TrackKind) -> Result<LocalTrack, CaptureError> {
        if self.unavailable.contains(&kind) {
            return Err(CaptureError::DeviceNotFound(kind));
        }

        let mut active = self.active.lock().await;
        if let Some(track) = active.get(kind) {
            debug!("Placeholder {} already running", kind);
            return Ok(track.clone());
        }

        let track = LocalTrack::new(kind, format!("{}-{}", kind, Uuid::new_v4()));
        info!("Placeholder capture started: {} ({})", kind, track.id);
        active.set(kind, Some(track.clone()));
        Ok(track)
    }

    async fn stop(&self, kind: TrackKind) {
        let mut active = self.active.lock().await;
        if active.is_active(kind) {
            info!("Placeholder capture stopped: {}", kind);
        }
        active.set(kind, None);
    }

    async fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        Ok(TrackKind::ALL
            .into_iter()
            .filter(|kind| !self.unavailable.contains(kind))
            .map(|kind| DeviceInfo {
                kind,
                id: format!("placeholder-{}", kind),
                label: format!("Placeholder {}", kind),
            })
            .collect())
    }
}
