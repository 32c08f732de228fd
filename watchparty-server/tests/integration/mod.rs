
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::Level;

use watchparty_core::{RoomId, ServerMessage, SessionId};
use watchparty_server::{Room, RoomCommand, RoomSnapshot};

use crate::utils::MockSignalingOutput;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Spawns a bare room actor wired to a capturing output.
pub fn create_test_room() -> (
    mpsc::Sender<RoomCommand>,
    mpsc::UnboundedReceiver<(SessionId, ServerMessage)>,
    MockSignalingOutput,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<RoomCommand>(100);
    let (signaling, signal_rx) = MockSignalingOutput::new();

    let room = Room::new(RoomId::from("test-room"), cmd_rx, Arc::new(signaling.clone()));

    tokio::spawn(async move {
        room.run().await;
    });

    (cmd_tx, signal_rx, signaling)
}

pub async fn inspect(cmd_tx: &mpsc::Sender<RoomCommand>) -> RoomSnapshot {
    let (reply, rx) = oneshot::channel();
    cmd_tx
        .send(RoomCommand::Inspect { reply })
        .await
        .expect("Room died");
    rx.await.expect("Room dropped the reply")
}
