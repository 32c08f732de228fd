use crate::{ConnectionEvent, ConnectionFactory, LocalTrack, PeerConnection, TrackKind, TransportState};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use watchparty_core::{IceCandidate, IceServerConfig, SdpType, SessionDescription, SessionId};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// [`PeerConnection`] backed by a webrtc-rs `RTCPeerConnection`.
pub struct WebRtcConnection {
    remote: SessionId,
    peer_connection: Arc<RTCPeerConnection>,
    slots: Mutex<HashMap<TrackKind, Arc<RTCRtpSender>>>,
}

impl WebRtcConnection {
    pub async fn new(
        remote: SessionId,
        ice_servers: &[IceServerConfig],
        preallocate_slots: bool,
        events: mpsc::Sender<ConnectionEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    info!("Peer connection to {} changed state: {:?}", remote, s);
                    let state = match s {
                        RTCPeerConnectionState::Connected => TransportState::Connected,
                        RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
                        RTCPeerConnectionState::Failed => TransportState::Failed,
                        RTCPeerConnectionState::Closed => TransportState::Closed,
                        _ => TransportState::Connecting,
                    };
                    let _ = tx.send(ConnectionEvent::StateChanged(state)).await;
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(ConnectionEvent::LocalCandidate(from_rtc_candidate(init)))
                    .await;
            })
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    let Some(kind) = track_kind(track.kind()) else {
                        return;
                    };
                    debug!("Remote {} track {} from {}", kind, track.id(), remote);
                    let _ = tx
                        .send(ConnectionEvent::RemoteTrack {
                            kind,
                            track_id: track.id(),
                        })
                        .await;
                })
            },
        ));

        let mut slots = HashMap::new();
        if preallocate_slots {
            for kind in TrackKind::ALL {
                let transceiver = peer_connection
                    .add_transceiver_from_kind(codec_type(kind), None)
                    .await
                    .with_context(|| format!("Failed to pre-allocate {} slot", kind))?;
                slots.insert(kind, transceiver.sender().await);
            }
        }

        Ok(Self {
            remote,
            peer_connection,
            slots: Mutex::new(slots),
        })
    }
}

#[async_trait]
impl PeerConnection for WebRtcConnection {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.sdp_type {
            SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await?;
        Ok(())
    }

    async fn has_track_slot(&self, kind: TrackKind) -> bool {
        self.slots.lock().await.contains_key(&kind)
    }

    async fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) -> Result<()> {
        let sender = self
            .slots
            .lock()
            .await
            .get(&kind)
            .cloned()
            .ok_or_else(|| anyhow!("no {} slot towards {}", kind, self.remote))?;
        let track = track.map(|t| t.track as Arc<dyn TrackLocal + Send + Sync>);
        sender.replace_track(track).await?;
        Ok(())
    }

    async fn add_track(&self, track: LocalTrack) -> Result<()> {
        let kind = track.kind;
        let sender = self
            .peer_connection
            .add_track(track.track as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        self.slots.lock().await.insert(kind, sender);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Builds a [`WebRtcConnection`] per link.
///
/// With `preallocate_slots` every connection starts with one audio and one video
/// send/receive slot, so capture toggles never need a renegotiation round.
#[derive(Debug, Clone)]
pub struct WebRtcConnectionFactory {
    pub preallocate_slots: bool,
}

impl Default for WebRtcConnectionFactory {
    fn default() -> Self {
        Self {
            preallocate_slots: true,
        }
    }
}

#[async_trait]
impl ConnectionFactory for WebRtcConnectionFactory {
    async fn create(
        &self,
        remote: SessionId,
        ice_servers: &[IceServerConfig],
        events: mpsc::Sender<ConnectionEvent>,
    ) -> Result<Box<dyn PeerConnection>> {
        let connection =
            WebRtcConnection::new(remote, ice_servers, self.preallocate_slots, events).await?;
        Ok(Box::new(connection))
    }
}

fn to_rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn codec_type(kind: TrackKind) -> RTPCodecType {
    match kind {
        TrackKind::Audio => RTPCodecType::Audio,
        TrackKind::Video => RTPCodecType::Video,
    }
}

fn track_kind(codec: RTPCodecType) -> Option<TrackKind> {
    match codec {
        RTPCodecType::Audio => Some(TrackKind::Audio),
        RTPCodecType::Video => Some(TrackKind::Video),
        _ => None,
    }
}
