use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use watchparty_client::{
    ConnectionEvent, ConnectionFactory, LocalTrack, PeerConnection, TrackKind, TransportState,
};
use watchparty_core::{IceCandidate, IceServerConfig, SessionDescription, SessionId};

#[derive(Debug, Clone, Copy)]
pub struct MockOptions {
    /// Report `connected` as soon as both descriptions are applied.
    pub auto_connect: bool,
    /// Start every connection with one outbound slot per track kind.
    pub preallocate_slots: bool,
    /// Emit one local candidate after each created description.
    pub emit_candidates: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            auto_connect: true,
            preallocate_slots: true,
            emit_candidates: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub offers: usize,
    pub answers: usize,
    pub local_set: bool,
    pub remote_set: bool,
    pub connected: bool,
    pub closed: bool,
    pub remote_descriptions: Vec<SessionDescription>,
    pub candidates: Vec<String>,
    /// Candidates handed over before any remote description.
    pub early_candidates: usize,
    pub slots: HashSet<TrackKind>,
    pub replaced: Vec<(TrackKind, Option<String>)>,
    pub added: Vec<TrackKind>,
}

/// Scripted stand-in for a real peer connection. Records every call.
pub struct MockConnection {
    pub local: SessionId,
    pub remote: SessionId,
    options: MockOptions,
    events: mpsc::Sender<ConnectionEvent>,
    pub recorded: Arc<Mutex<Recorded>>,
}

impl MockConnection {
    fn maybe_connect(&self, rec: &mut Recorded) {
        if self.options.auto_connect && rec.local_set && rec.remote_set && !rec.connected {
            rec.connected = true;
            let _ = self
                .events
                .try_send(ConnectionEvent::StateChanged(TransportState::Connected));
        }
    }

    fn emit_candidate(&self, n: usize) {
        if self.options.emit_candidates {
            let candidate = IceCandidate::new(format!("candidate:{}-{}", self.local, n));
            let _ = self
                .events
                .try_send(ConnectionEvent::LocalCandidate(candidate));
        }
    }
}

#[async_trait]
impl PeerConnection for MockConnection {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let n = {
            let mut rec = self.recorded.lock().unwrap();
            if rec.closed {
                bail!("connection closed");
            }
            rec.offers += 1;
            rec.local_set = true;
            self.maybe_connect(&mut rec);
            rec.offers
        };
        self.emit_candidate(n);
        Ok(SessionDescription::offer(format!("offer {} from {}", n, self.local)))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let n = {
            let mut rec = self.recorded.lock().unwrap();
            if !rec.remote_set {
                bail!("no remote offer");
            }
            rec.answers += 1;
            rec.local_set = true;
            self.maybe_connect(&mut rec);
            rec.answers
        };
        self.emit_candidate(n);
        Ok(SessionDescription::answer(format!("answer {} from {}", n, self.local)))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let mut rec = self.recorded.lock().unwrap();
        if rec.closed {
            return Err(anyhow!("connection closed"));
        }
        rec.remote_set = true;
        rec.remote_descriptions.push(desc);
        self.maybe_connect(&mut rec);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let mut rec = self.recorded.lock().unwrap();
        if !rec.remote_set {
            rec.early_candidates += 1;
        }
        rec.candidates.push(candidate.candidate);
        Ok(())
    }

    async fn has_track_slot(&self, kind: TrackKind) -> bool {
        self.recorded.lock().unwrap().slots.contains(&kind)
    }

    async fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) -> Result<()> {
        let mut rec = self.recorded.lock().unwrap();
        rec.replaced.push((kind, track.map(|t| t.id)));
        Ok(())
    }

    async fn add_track(&self, track: LocalTrack) -> Result<()> {
        let mut rec = self.recorded.lock().unwrap();
        rec.slots.insert(track.kind);
        rec.added.push(track.kind);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.recorded.lock().unwrap().closed = true;
        Ok(())
    }
}

pub struct MockHandle {
    pub remote: SessionId,
    pub recorded: Arc<Mutex<Recorded>>,
    events: mpsc::Sender<ConnectionEvent>,
}

impl MockHandle {
    pub fn snapshot<T>(&self, f: impl FnOnce(&Recorded) -> T) -> T {
        f(&self.recorded.lock().unwrap())
    }

    /// Injects a transport state change as if reported by the network stack.
    pub fn report(&self, state: TransportState) {
        let _ = self.events.try_send(ConnectionEvent::StateChanged(state));
    }
}

/// Hands out [`MockConnection`]s for one local session and keeps a handle to each.
#[derive(Clone)]
pub struct MockConnectionFactory {
    pub local: SessionId,
    options: MockOptions,
    created: Arc<Mutex<Vec<Arc<MockHandle>>>>,
}

impl MockConnectionFactory {
    pub fn new(local: SessionId, options: MockOptions) -> Self {
        Self {
            local,
            options,
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every connection created towards `remote`, oldest first.
    pub fn connections_to(&self, remote: SessionId) -> Vec<Arc<MockHandle>> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.remote == remote)
            .cloned()
            .collect()
    }

    pub fn latest(&self, remote: SessionId) -> Option<Arc<MockHandle>> {
        self.connections_to(remote).pop()
    }

    pub fn all(&self) -> Vec<Arc<MockHandle>> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn create(
        &self,
        remote: SessionId,
        _ice_servers: &[IceServerConfig],
        events: mpsc::Sender<ConnectionEvent>,
    ) -> Result<Box<dyn PeerConnection>> {
        let mut recorded = Recorded::default();
        if self.options.preallocate_slots {
            recorded.slots.extend(TrackKind::ALL);
        }
        let recorded = Arc::new(Mutex::new(recorded));

        self.created.lock().unwrap().push(Arc::new(MockHandle {
            remote,
            recorded: recorded.clone(),
            events: events.clone(),
        }));

        Ok(Box::new(MockConnection {
            local: self.local,
            remote,
            options: self.options,
            events,
            recorded,
        }))
    }
}
