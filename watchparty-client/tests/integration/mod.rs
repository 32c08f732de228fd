pub mod mesh_tests;

use tokio::sync::mpsc;
use tracing::Level;
use watchparty_client::ClientEvent;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Everything already queued on an event channel, without waiting.
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
