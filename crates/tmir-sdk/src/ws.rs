//! WebSocket connector backed by tokio-tungstenite.

use crate::error::TransportError;
use crate::transport::{Connection, Connector};
use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

const LOG_TARGET: &str = "tmir_sdk::ws";

/// Opens `ws://` / `wss://` connections. Only text frames are surfaced;
/// control frames are answered by tungstenite and binary frames are dropped.
#[derive(Clone, Debug)]
pub struct WsConnector {
    handshake_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl WsConnector {
    pub fn new(handshake_timeout: Duration) -> Self {
        Self { handshake_timeout }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        let (stream, _) = timeout(self.handshake_timeout, connect_async(url))
            .await
            .map_err(|_| TransportError::Connect(format!("{url}: handshake timed out")))?
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        let (sink, source) = stream.split();

        let sink = sink
            .with(|text: String| future::ok::<_, tungstenite::Error>(Message::Text(text)))
            .sink_map_err(TransportError::from);

        let source = source.filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(target: LOG_TARGET, ?frame, "socket closed by server");
                    None
                }
                Ok(Message::Binary(bytes)) => {
                    tracing::debug!(target: LOG_TARGET, len = bytes.len(), "ignoring binary frame");
                    None
                }
                Ok(_) => None,
                Err(err) => Some(Err(TransportError::from(err))),
            })
        });

        Ok(Connection {
            sink: Box::pin(sink),
            stream: source.boxed(),
        })
    }
}
