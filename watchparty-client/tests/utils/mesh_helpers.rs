use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;
use watchparty_client::{
    ClientEvent, LinkState, LinkSummary, MeshCoordinator, MeshHandle, MeshParams, SignalingSink,
};
use watchparty_core::{IceServerConfig, RoomId, SessionId};

use super::{MockConnectionFactory, MockOptions, SignalHub};

pub const NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for anything a test waits on (ms).
pub const WAIT_TIMEOUT_MS: u64 = 5000;

pub struct TestPeer {
    pub id: SessionId,
    pub mesh: MeshHandle,
    pub factory: MockConnectionFactory,
    pub events: mpsc::UnboundedReceiver<ClientEvent>,
}

impl TestPeer {
    pub async fn links(&self) -> Vec<LinkSummary> {
        self.mesh.links().await.expect("Mesh died")
    }

    pub async fn connected_to(&self) -> Vec<SessionId> {
        self.links()
            .await
            .into_iter()
            .filter(|l| l.state == LinkState::Connected)
            .map(|l| l.remote)
            .collect()
    }

    pub async fn wait_connected(&self, count: usize) {
        let peer = self;
        wait_for(
            &format!("{} connected links on {}", count, self.id),
            move || async move { peer.connected_to().await.len() == count },
        )
        .await;
    }
}

/// Deterministic session ids; a smaller `n` sorts first.
pub fn session(n: u128) -> SessionId {
    SessionId(Uuid::from_u128(n))
}

pub fn spawn_mesh(
    id: SessionId,
    options: MockOptions,
    signaling: Arc<dyn SignalingSink>,
) -> TestPeer {
    let factory = MockConnectionFactory::new(id, options);
    let (events, events_rx) = mpsc::unbounded_channel();
    let mesh = MeshCoordinator::spawn(MeshParams {
        local: id,
        room: RoomId::from("movie-night"),
        ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
        negotiation_timeout: NEGOTIATION_TIMEOUT,
        factory: Arc::new(factory.clone()),
        signaling,
        events,
    });
    TestPeer {
        id,
        mesh,
        factory,
        events: events_rx,
    }
}

/// Spawns a mesh wired to the hub. It is not a room member until [`SignalHub::join`].
pub fn spawn_peer(hub: &Arc<SignalHub>, id: SessionId, options: MockOptions) -> TestPeer {
    let peer = spawn_mesh(id, options, hub.sink(id));
    hub.register(id, peer.mesh.clone());
    peer
}

/// Polls `check` until it holds, panicking after [`WAIT_TIMEOUT_MS`].
pub async fn wait_for<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let polled = tokio::time::timeout(Duration::from_millis(WAIT_TIMEOUT_MS), async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    if polled.is_err() {
        panic!("Timed out waiting for {}", what);
    }
}
