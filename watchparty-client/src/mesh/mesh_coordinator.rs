use crate::{
    CandidateQueue, ClientError, ClientEvent, ConnectionFactory, LinkCommand, LinkEvent,
    LinkEventKind, LinkParams, LinkRole, LinkStart, LinkState, LinkSummary, LocalMedia,
    LocalTrack, PeerLink, SignalingSink, TrackKind,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use watchparty_core::{
    IceCandidate, IceServerConfig, Member, RoomId, SdpType, SessionDescription, SessionId,
    SignalKind,
};

use super::{MeshCommand, initiation_targets, yields_on_glare};

const COMMAND_CAPACITY: usize = 256;
const CONNECTION_EVENT_CAPACITY: usize = 64;

pub struct MeshParams {
    pub local: SessionId,
    pub room: RoomId,
    pub ice_servers: Vec<IceServerConfig>,
    pub negotiation_timeout: Duration,
    pub factory: Arc<dyn ConnectionFactory>,
    pub signaling: Arc<dyn SignalingSink>,
    pub events: mpsc::UnboundedSender<ClientEvent>,
}

struct LinkEntry {
    instance: u64,
    role: LinkRole,
    state: LinkState,
    commands: mpsc::UnboundedSender<LinkCommand>,
}

/// Ownership table of peer links, keyed by remote session id.
///
/// Decides from each membership snapshot which links must exist and who initiates them,
/// routes inbound negotiation messages to the right link, and holds candidates for
/// remotes that have no link yet.
pub struct MeshCoordinator {
    local: SessionId,
    room: RoomId,
    ice_servers: Vec<IceServerConfig>,
    negotiation_timeout: Duration,
    factory: Arc<dyn ConnectionFactory>,
    signaling: Arc<dyn SignalingSink>,
    events: mpsc::UnboundedSender<ClientEvent>,
    members: Vec<Member>,
    links: HashMap<SessionId, LinkEntry>,
    held_candidates: HashMap<SessionId, CandidateQueue>,
    local_media: LocalMedia,
    next_instance: u64,
    command_rx: mpsc::Receiver<MeshCommand>,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
}

impl MeshCoordinator {
    pub fn new(params: MeshParams, command_rx: mpsc::Receiver<MeshCommand>) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        Self {
            local: params.local,
            room: params.room,
            ice_servers: params.ice_servers,
            negotiation_timeout: params.negotiation_timeout,
            factory: params.factory,
            signaling: params.signaling,
            events: params.events,
            members: Vec::new(),
            links: HashMap::new(),
            held_candidates: HashMap::new(),
            local_media: LocalMedia::default(),
            next_instance: 0,
            command_rx,
            link_tx,
            link_rx,
        }
    }

    /// Starts the coordinator on its own task.
    pub fn spawn(params: MeshParams) -> MeshHandle {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        tokio::spawn(MeshCoordinator::new(params, rx).run());
        MeshHandle { tx }
    }

    pub async fn run(mut self) {
        info!("Mesh coordinator for {} started", self.local);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(MeshCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },

                Some(evt) = self.link_rx.recv() => {
                    self.handle_link_event(evt);
                }
            }
        }

        let remotes: Vec<SessionId> = self.links.keys().copied().collect();
        for remote in remotes {
            self.teardown(remote, "shutdown");
        }
        info!("Mesh coordinator for {} finished", self.local);
    }

    async fn handle_command(&mut self, cmd: MeshCommand) {
        match cmd {
            MeshCommand::Membership(members) => {
                self.apply_membership(members).await;
            }

            MeshCommand::MemberLeft(remote) => {
                self.held_candidates.remove(&remote);
                self.teardown(remote, "left the room");
            }

            MeshCommand::Signal {
                kind,
                from,
                payload,
            } => {
                self.handle_signal(kind, from, payload).await;
            }

            MeshCommand::SetLocalTrack { kind, track } => {
                self.set_local_track(kind, track);
            }

            MeshCommand::Links { reply } => {
                let _ = reply.send(self.summaries());
            }

            MeshCommand::Shutdown => {}
        }
    }

    /// Treats the snapshot as a full replacement: links to absent members go, and if this
    /// side is now last it offers to every member it has no link with.
    async fn apply_membership(&mut self, members: Vec<Member>) {
        self.members = members;
        let present: HashSet<SessionId> = self.members.iter().map(|m| m.id).collect();

        let departed: Vec<SessionId> = self
            .links
            .keys()
            .filter(|id| !present.contains(id))
            .copied()
            .collect();
        for remote in departed {
            self.teardown(remote, "absent from membership");
        }
        self.held_candidates.retain(|id, _| present.contains(id));

        for remote in initiation_targets(self.local, &self.members) {
            if !self.links.contains_key(&remote) {
                self.open_link(remote, LinkStart::Initiate).await;
            }
        }
    }

    async fn handle_signal(&mut self, kind: SignalKind, from: SessionId, payload: Value) {
        match kind {
            SignalKind::Offer => {
                let Some(offer) = parse_description(&payload, SdpType::Offer, from) else {
                    return;
                };
                self.handle_offer(from, offer).await;
            }

            SignalKind::Answer => {
                let Some(answer) = parse_description(&payload, SdpType::Answer, from) else {
                    return;
                };
                if !self.forward(from, LinkCommand::RemoteAnswer(answer)) {
                    debug!("Answer from {} without a link, dropping", from);
                }
            }

            SignalKind::IceCandidate => {
                let candidate = match IceCandidate::from_payload(&payload) {
                    Ok(c) => c,
                    Err(e) => {
                        debug!("Malformed candidate from {}: {}", from, e);
                        return;
                    }
                };
                if self.links.contains_key(&from) {
                    self.forward(from, LinkCommand::RemoteCandidate(candidate));
                    return;
                }
                let queue = self.held_candidates.entry(from).or_default();
                queue.accept(candidate);
                debug!(
                    "Holding candidate from {} until its link exists ({} held)",
                    from,
                    queue.pending_len()
                );
            }
        }
    }

    async fn handle_offer(&mut self, from: SessionId, offer: SessionDescription) {
        let Some(role) = self.links.get(&from).map(|entry| entry.role) else {
            self.open_link(from, LinkStart::Answer(offer)).await;
            return;
        };

        match role {
            LinkRole::Responder => {
                let Some(entry) = self.links.get(&from) else {
                    return;
                };
                if let Err(mpsc::error::SendError(LinkCommand::RemoteOffer(offer))) =
                    entry.commands.send(LinkCommand::RemoteOffer(offer))
                {
                    debug!("Link to {} already finished, answering on a new one", from);
                    self.open_link(from, LinkStart::Answer(offer)).await;
                }
            }
            LinkRole::Initiator if yields_on_glare(self.local, from) => {
                info!("Both sides offered with {}, yielding", from);
                self.teardown(from, "glare");
                self.open_link(from, LinkStart::Answer(offer)).await;
            }
            LinkRole::Initiator => {
                debug!("Both sides offered with {}, keeping own offer", from);
            }
        }
    }

    fn set_local_track(&mut self, kind: TrackKind, track: Option<LocalTrack>) {
        info!(
            "Local {} {}",
            kind,
            if track.is_some() { "on" } else { "off" }
        );
        self.local_media.set(kind, track.clone());
        let remotes: Vec<SessionId> = self.links.keys().copied().collect();
        for remote in remotes {
            self.forward(
                remote,
                LinkCommand::SetLocalTrack {
                    kind,
                    track: track.clone(),
                },
            );
        }
    }

    /// Creates a fresh link instance, replacing any existing one for the same remote.
    async fn open_link(&mut self, remote: SessionId, start: LinkStart) {
        if self.links.contains_key(&remote) {
            self.teardown(remote, "replaced");
        }

        let candidates = self.held_candidates.remove(&remote).unwrap_or_default();
        let (connection_tx, connection_rx) = mpsc::channel(CONNECTION_EVENT_CAPACITY);
        let connection = match self
            .factory
            .create(remote, &self.ice_servers, connection_tx)
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Could not create connection to {}: {:#}", remote, e);
                return;
            }
        };

        self.next_instance += 1;
        let instance = self.next_instance;
        let role = start.role();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let link = PeerLink::new(
            LinkParams {
                local: self.local,
                remote,
                room: self.room.clone(),
                instance,
                timeout: self.negotiation_timeout,
                candidates,
                local_tracks: self.local_media.tracks(),
                signaling: self.signaling.clone(),
                command_rx,
                connection_rx,
                events: self.link_tx.clone(),
            },
            role,
            connection,
        );
        tokio::spawn(link.run(start));

        self.links.insert(
            remote,
            LinkEntry {
                instance,
                role,
                state: LinkState::Connecting,
                commands: command_tx,
            },
        );
        self.emit(ClientEvent::LinkStateChanged {
            remote,
            state: LinkState::Connecting,
        });
    }

    fn teardown(&mut self, remote: SessionId, reason: &str) {
        let Some(entry) = self.links.remove(&remote) else {
            return;
        };
        info!("Tearing down link to {} ({})", remote, reason);
        let _ = entry.commands.send(LinkCommand::Close);
        self.emit(ClientEvent::LinkStateChanged {
            remote,
            state: LinkState::Closed,
        });
    }

    fn handle_link_event(&mut self, evt: LinkEvent) {
        let Some(entry) = self.links.get_mut(&evt.remote) else {
            debug!("Event from retired link to {}", evt.remote);
            return;
        };
        if entry.instance != evt.instance {
            debug!("Event from stale link instance {} to {}", evt.instance, evt.remote);
            return;
        }

        match evt.kind {
            LinkEventKind::StateChanged(state) => {
                entry.state = state;
                if state == LinkState::Closed {
                    self.links.remove(&evt.remote);
                }
                self.emit(ClientEvent::LinkStateChanged {
                    remote: evt.remote,
                    state,
                });
            }

            LinkEventKind::RemoteTrack { kind, track_id } => {
                self.emit(ClientEvent::RemoteTrack {
                    remote: evt.remote,
                    kind,
                    track_id,
                });
            }
        }
    }

    fn forward(&self, remote: SessionId, cmd: LinkCommand) -> bool {
        match self.links.get(&remote) {
            Some(entry) => entry.commands.send(cmd).is_ok(),
            None => false,
        }
    }

    fn summaries(&self) -> Vec<LinkSummary> {
        let mut summaries: Vec<LinkSummary> = self
            .links
            .iter()
            .map(|(remote, entry)| LinkSummary {
                remote: *remote,
                role: entry.role,
                state: entry.state,
            })
            .collect();
        summaries.sort_by_key(|s| s.remote);
        summaries
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

fn parse_description(
    payload: &Value,
    expected: SdpType,
    from: SessionId,
) -> Option<SessionDescription> {
    match SessionDescription::from_payload(payload) {
        Ok(desc) if desc.sdp_type == expected => Some(desc),
        Ok(desc) => {
            debug!(
                "Expected {:?} from {}, got {:?}; dropping",
                expected, from, desc.sdp_type
            );
            None
        }
        Err(e) => {
            debug!("Malformed session description from {}: {}", from, e);
            None
        }
    }
}

/// Cloneable front door to a running [`MeshCoordinator`].
#[derive(Clone)]
pub struct MeshHandle {
    tx: mpsc::Sender<MeshCommand>,
}

impl MeshHandle {
    pub fn new(tx: mpsc::Sender<MeshCommand>) -> Self {
        Self { tx }
    }

    pub async fn update_members(&self, members: Vec<Member>) -> Result<(), ClientError> {
        self.send(MeshCommand::Membership(members)).await
    }

    pub async fn member_left(&self, remote: SessionId) -> Result<(), ClientError> {
        self.send(MeshCommand::MemberLeft(remote)).await
    }

    pub async fn signal(
        &self,
        kind: SignalKind,
        from: SessionId,
        payload: Value,
    ) -> Result<(), ClientError> {
        self.send(MeshCommand::Signal {
            kind,
            from,
            payload,
        })
        .await
    }

    pub async fn set_local_track(
        &self,
        kind: TrackKind,
        track: Option<LocalTrack>,
    ) -> Result<(), ClientError> {
        self.send(MeshCommand::SetLocalTrack { kind, track }).await
    }

    pub async fn links(&self) -> Result<Vec<LinkSummary>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(MeshCommand::Links { reply }).await?;
        rx.await.map_err(|_| ClientError::ChannelClosed)
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(MeshCommand::Shutdown).await;
    }

    async fn send(&self, cmd: MeshCommand) -> Result<(), ClientError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| ClientError::ChannelClosed)
    }
}
