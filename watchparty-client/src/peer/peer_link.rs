use crate::{
    CandidateQueue, ConnectionEvent, LocalTrack, PeerConnection, SignalingSink, TrackKind,
    TransportState,
};
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watchparty_core::{ClientMessage, IceCandidate, RoomId, SessionDescription, SessionId, SignalKind};

use super::{LinkCommand, LinkEvent, LinkEventKind, LinkRole, LinkState};

/// How a link enters `connecting`.
#[derive(Debug)]
pub enum LinkStart {
    /// This side is last in join order: attach tracks, offer, wait for the answer.
    Initiate,
    /// An offer arrived first: apply it, flush held candidates, answer.
    Answer(SessionDescription),
}

impl LinkStart {
    pub fn role(&self) -> LinkRole {
        match self {
            LinkStart::Initiate => LinkRole::Initiator,
            LinkStart::Answer(_) => LinkRole::Responder,
        }
    }
}

pub struct LinkParams {
    pub local: SessionId,
    pub remote: SessionId,
    pub room: RoomId,
    pub instance: u64,
    pub timeout: Duration,
    pub candidates: CandidateQueue,
    pub local_tracks: Vec<LocalTrack>,
    pub signaling: Arc<dyn SignalingSink>,
    pub command_rx: mpsc::UnboundedReceiver<LinkCommand>,
    pub connection_rx: mpsc::Receiver<ConnectionEvent>,
    pub events: mpsc::UnboundedSender<LinkEvent>,
}

/// Owns one connection object and drives it through negotiation.
///
/// Every operation on the connection happens on this task, so offer/answer creation and
/// description application for one remote are never interleaved.
pub struct PeerLink {
    local: SessionId,
    remote: SessionId,
    room: RoomId,
    instance: u64,
    role: LinkRole,
    state: LinkState,
    timeout: Duration,
    connection: Box<dyn PeerConnection>,
    candidates: CandidateQueue,
    local_tracks: Vec<LocalTrack>,
    awaiting_answer: bool,
    renegotiate_after_answer: bool,
    signaling: Arc<dyn SignalingSink>,
    command_rx: mpsc::UnboundedReceiver<LinkCommand>,
    connection_rx: mpsc::Receiver<ConnectionEvent>,
    connection_events_open: bool,
    events: mpsc::UnboundedSender<LinkEvent>,
}

impl PeerLink {
    pub fn new(params: LinkParams, role: LinkRole, connection: Box<dyn PeerConnection>) -> Self {
        Self {
            local: params.local,
            remote: params.remote,
            room: params.room,
            instance: params.instance,
            role,
            state: LinkState::Connecting,
            timeout: params.timeout,
            connection,
            candidates: params.candidates,
            local_tracks: params.local_tracks,
            awaiting_answer: false,
            renegotiate_after_answer: false,
            signaling: params.signaling,
            command_rx: params.command_rx,
            connection_rx: params.connection_rx,
            connection_events_open: true,
            events: params.events,
        }
    }

    pub async fn run(mut self, start: LinkStart) {
        info!(
            "Link {} -> {} started as {} (instance {})",
            self.local, self.remote, self.role, self.instance
        );

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        if let Err(e) = self.begin(start).await {
            warn!("Negotiation with {} failed: {:#}", self.remote, e);
            self.close().await;
        }

        while self.state != LinkState::Closed {
            tokio::select! {
                _ = &mut deadline, if self.state == LinkState::Connecting => {
                    warn!(
                        "Link to {} not connected after {:?}, closing",
                        self.remote, self.timeout
                    );
                    self.close().await;
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        debug!("Command channel for link to {} closed", self.remote);
                        self.close().await;
                    }
                },

                evt = self.connection_rx.recv(), if self.connection_events_open => match evt {
                    Some(evt) => self.handle_connection_event(evt).await,
                    None => self.connection_events_open = false,
                },
            }
        }

        info!("Link {} -> {} finished", self.local, self.remote);
    }

    async fn begin(&mut self, start: LinkStart) -> Result<()> {
        for track in std::mem::take(&mut self.local_tracks) {
            self.attach(track).await;
        }

        match start {
            LinkStart::Initiate => self.send_offer().await,
            LinkStart::Answer(offer) => self.answer_offer(offer).await,
        }
    }

    async fn handle_command(&mut self, cmd: LinkCommand) {
        match cmd {
            LinkCommand::RemoteOffer(offer) => {
                if self.awaiting_answer {
                    debug!("Offer from {} while awaiting its answer, dropping", self.remote);
                    return;
                }
                if let Err(e) = self.answer_offer(offer).await {
                    warn!("Dropping offer from {}: {:#}", self.remote, e);
                    self.close_if_connecting().await;
                }
            }

            LinkCommand::RemoteAnswer(answer) => {
                if !self.awaiting_answer {
                    debug!("Unexpected answer from {}, dropping", self.remote);
                    return;
                }
                if let Err(e) = self.connection.set_remote_description(answer).await {
                    warn!("Dropping answer from {}: {:#}", self.remote, e);
                    self.close_if_connecting().await;
                    return;
                }
                self.awaiting_answer = false;
                self.flush_candidates().await;

                if self.renegotiate_after_answer {
                    self.renegotiate_after_answer = false;
                    self.renegotiate().await;
                }
            }

            LinkCommand::RemoteCandidate(candidate) => match self.candidates.accept(candidate) {
                Some(candidate) => self.apply_candidate(candidate).await,
                None => debug!(
                    "Queued candidate from {} ({} pending)",
                    self.remote,
                    self.candidates.pending_len()
                ),
            },

            LinkCommand::SetLocalTrack { kind, track } => {
                self.publish(kind, track).await;
            }

            LinkCommand::Close => {
                self.close().await;
            }
        }
    }

    async fn handle_connection_event(&mut self, evt: ConnectionEvent) {
        match evt {
            ConnectionEvent::LocalCandidate(candidate) => {
                self.signal(SignalKind::IceCandidate, candidate.to_payload())
                    .await;
            }

            ConnectionEvent::StateChanged(TransportState::Connected) => {
                if self.state == LinkState::Connecting {
                    info!("Link {} -> {} connected", self.local, self.remote);
                    self.state = LinkState::Connected;
                    self.emit(LinkEventKind::StateChanged(LinkState::Connected));
                }
            }

            ConnectionEvent::StateChanged(s) if s.is_terminal() => {
                info!("Connection to {} reported {:?}", self.remote, s);
                self.close().await;
            }

            ConnectionEvent::StateChanged(_) => {}

            ConnectionEvent::RemoteTrack { kind, track_id } => {
                self.emit(LinkEventKind::RemoteTrack { kind, track_id });
            }
        }
    }

    async fn send_offer(&mut self) -> Result<()> {
        let offer = self.connection.create_offer().await?;
        self.awaiting_answer = true;
        self.signal(SignalKind::Offer, offer.to_payload()).await;
        Ok(())
    }

    async fn answer_offer(&mut self, offer: SessionDescription) -> Result<()> {
        self.connection.set_remote_description(offer).await?;
        self.flush_candidates().await;
        let answer = self.connection.create_answer().await?;
        self.signal(SignalKind::Answer, answer.to_payload()).await;
        Ok(())
    }

    async fn renegotiate(&mut self) {
        debug!("Renegotiating with {}", self.remote);
        if let Err(e) = self.send_offer().await {
            warn!("Renegotiation with {} failed: {:#}", self.remote, e);
        }
    }

    async fn flush_candidates(&mut self) {
        for candidate in self.candidates.mark_ready() {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.connection.add_ice_candidate(candidate).await {
            debug!("Dropping candidate from {}: {:#}", self.remote, e);
        }
    }

    async fn attach(&self, track: LocalTrack) {
        let kind = track.kind;
        let result = if self.connection.has_track_slot(kind).await {
            self.connection.replace_track(kind, Some(track)).await
        } else {
            self.connection.add_track(track).await
        };
        if let Err(e) = result {
            warn!("Could not attach {} towards {}: {:#}", kind, self.remote, e);
        }
    }

    /// Replaces in place when a slot exists. Otherwise adds the track, and only the
    /// initiator follows up with a fresh offer.
    async fn publish(&mut self, kind: TrackKind, track: Option<LocalTrack>) {
        if self.connection.has_track_slot(kind).await {
            if let Err(e) = self.connection.replace_track(kind, track).await {
                warn!("Could not replace {} towards {}: {:#}", kind, self.remote, e);
            }
            return;
        }

        let Some(track) = track else {
            return;
        };
        if let Err(e) = self.connection.add_track(track).await {
            warn!("Could not add {} towards {}: {:#}", kind, self.remote, e);
            return;
        }

        match self.role {
            LinkRole::Initiator if self.awaiting_answer => {
                self.renegotiate_after_answer = true;
            }
            LinkRole::Initiator => self.renegotiate().await,
            LinkRole::Responder => debug!(
                "New {} towards {} waits for the initiator's next offer",
                kind, self.remote
            ),
        }
    }

    async fn signal(&self, kind: SignalKind, payload: Value) {
        let msg = ClientMessage::signal(kind, self.room.clone(), self.remote, payload);
        if let Err(e) = self.signaling.send(msg).await {
            warn!("Failed to send {} to {}: {:#}", kind, self.remote, e);
        }
    }

    fn emit(&self, kind: LinkEventKind) {
        let _ = self.events.send(LinkEvent {
            remote: self.remote,
            instance: self.instance,
            kind,
        });
    }

    async fn close_if_connecting(&mut self) {
        if self.state == LinkState::Connecting {
            self.close().await;
        }
    }

    async fn close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }
        self.finish().await;
        self.emit(LinkEventKind::StateChanged(LinkState::Closed));
    }

    async fn finish(&mut self) {
        self.state = LinkState::Closed;
        if let Err(e) = self.connection.close().await {
            debug!("Error closing connection to {}: {:#}", self.remote, e);
        }
    }
}
