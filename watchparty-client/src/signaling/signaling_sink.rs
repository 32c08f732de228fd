use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::mpsc;
use watchparty_core::ClientMessage;

/// Outbound half of the session channel, as seen by links and the engine.
#[async_trait]
pub trait SignalingSink: Send + Sync {
    async fn send(&self, msg: ClientMessage) -> Result<()>;
}

#[derive(Debug)]
pub(crate) enum Outbound {
    Message(ClientMessage),
    Close,
}

/// Hands messages to the socket writer task, in order.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    /// Closes the socket once everything queued before this call is written.
    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

#[async_trait]
impl SignalingSink for ChannelSink {
    async fn send(&self, msg: ClientMessage) -> Result<()> {
        self.tx
            .send(Outbound::Message(msg))
            .map_err(|_| anyhow!("session channel closed"))
    }
}
