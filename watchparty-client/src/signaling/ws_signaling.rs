use super::signaling_sink::Outbound;
use crate::{ChannelSink, ClientError};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use watchparty_core::{IceServerConfig, ServerMessage, SessionId};

/// An open session channel after the server's `welcome`.
pub struct WsSession {
    pub session_id: SessionId,
    pub ice_servers: Vec<IceServerConfig>,
    pub sink: ChannelSink,
    pub incoming: mpsc::UnboundedReceiver<ServerMessage>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl WsSession {
    /// Connects and waits up to `welcome_timeout` for the session id.
    pub async fn connect(url: &str, welcome_timeout: Duration) -> Result<Self, ClientError> {
        info!("Connecting to {}", url);
        let (stream, _) = connect_async(url)
            .await
            .map_err(|source| ClientError::Connect {
                url: url.to_owned(),
                source: Box::new(source),
            })?;
        let (mut write, mut read) = stream.split();

        let (session_id, ice_servers) = tokio::time::timeout(welcome_timeout, async {
            while let Some(frame) = read.next().await {
                let Ok(Message::Text(text)) = frame else {
                    continue;
                };
                return match serde_json::from_str::<ServerMessage>(text.as_str()) {
                    Ok(ServerMessage::Welcome { id, ice_servers }) => Ok((id, ice_servers)),
                    Ok(other) => Err(ClientError::UnexpectedMessage(format!("{:?}", other))),
                    Err(e) => Err(ClientError::UnexpectedMessage(e.to_string())),
                };
            }
            Err(ClientError::ChannelClosed)
        })
        .await
        .map_err(|_| ClientError::WelcomeTimeout)??;
        info!("Welcomed as {} ({} ICE servers)", session_id, ice_servers.len());

        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(async move {
            while let Some(Outbound::Message(msg)) = out_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize {:?}: {}", msg, e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::text(json)).await {
                    warn!("Session channel write failed: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
            debug!("Session writer finished");
        });

        let (in_tx, incoming) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(msg) => {
                                if in_tx.send(msg).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Invalid server message: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Session channel read failed: {}", e);
                        break;
                    }
                }
            }
            debug!("Session reader finished");
        });

        Ok(Self {
            session_id,
            ice_servers,
            sink: ChannelSink::new(out_tx),
            incoming,
            writer,
            reader,
        })
    }

    /// Splits off the background pumps so the caller can own them.
    pub fn into_parts(
        self,
    ) -> (
        SessionId,
        Vec<IceServerConfig>,
        ChannelSink,
        mpsc::UnboundedReceiver<ServerMessage>,
        [JoinHandle<()>; 2],
    ) {
        (
            self.session_id,
            self.ice_servers,
            self.sink,
            self.incoming,
            [self.writer, self.reader],
        )
    }
}
