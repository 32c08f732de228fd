use crate::engine::EngineInner;
use crate::{
    CaptureService, ClientConfig, ClientEngine, ClientError, ClientEvent, ConnectionFactory,
    LocalMedia, MeshCoordinator, MeshParams, PlaybackClock, SignalingSink, WsSession,
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::info;
use watchparty_core::{ClientMessage, ServerMessage};

impl ClientEngine {
    /// Opens the session channel, joins the room and starts the mesh and the playback tick.
    ///
    /// The stored playback state and media are requested once right after joining.
    pub async fn connect(
        config: ClientConfig,
        factory: Arc<dyn ConnectionFactory>,
        capture: Arc<dyn CaptureService>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClientEvent>), ClientError> {
        let session = WsSession::connect(&config.server_url, config.welcome_timeout).await?;
        let (session_id, announced_ice, sink, incoming, [writer, reader]) = session.into_parts();
        let ice_servers = config.ice_servers.clone().unwrap_or(announced_ice);

        let (events, events_rx) = mpsc::unbounded_channel();
        let _ = events.send(ClientEvent::Welcome { id: session_id });

        let mesh = MeshCoordinator::spawn(MeshParams {
            local: session_id,
            room: config.room.clone(),
            ice_servers,
            negotiation_timeout: config.negotiation_timeout,
            factory,
            signaling: Arc::new(sink.clone()),
            events: events.clone(),
        });

        let engine = ClientEngine {
            inner: Arc::new(EngineInner {
                session_id,
                room: config.room.clone(),
                user_name: config.user_name.clone(),
                sink,
                mesh,
                capture,
                clock: Mutex::new(PlaybackClock::new()),
                local_media: Mutex::new(LocalMedia::default()),
                events,
                writer: Mutex::new(Some(writer)),
                tasks: Mutex::new(vec![reader]),
            }),
        };

        let room_id = config.room.clone();
        for msg in [
            ClientMessage::JoinRoom {
                room_id: room_id.clone(),
                user_name: config.user_name.clone(),
            },
            ClientMessage::PlayerGetState {
                room_id: room_id.clone(),
            },
            ClientMessage::GetPlayerUrl { room_id },
        ] {
            engine.send(msg).await?;
        }
        info!(
            "Joined room '{}' as '{}' ({})",
            config.room, config.user_name, session_id
        );

        let pump = tokio::spawn(engine.clone().pump_incoming(incoming));
        let tick = tokio::spawn(engine.clone().run_clock(config.tick_interval));
        engine.inner.tasks.lock().await.extend([pump, tick]);

        Ok((engine, events_rx))
    }

    async fn pump_incoming(self, mut incoming: mpsc::UnboundedReceiver<ServerMessage>) {
        while let Some(msg) = incoming.recv().await {
            self.handle_server_message(msg).await;
        }
        info!("Session channel for {} closed", self.inner.session_id);
        self.inner.mesh.shutdown().await;
        self.emit(ClientEvent::Disconnected);
    }

    async fn run_clock(self, period: std::time::Duration) {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let position = self.inner.clock.lock().await.tick();
            if let Some(position) = position {
                self.emit(ClientEvent::Tick { position });
            }
        }
    }

    pub(crate) async fn send(&self, msg: ClientMessage) -> Result<(), ClientError> {
        self.inner
            .sink
            .send(msg)
            .await
            .map_err(|_| ClientError::ChannelClosed)
    }
}
