//! In-memory connector for tests and simulation.

use crate::error::TransportError;
use crate::transport::{Connection, Connector};
use async_trait::async_trait;
use futures::channel::mpsc as frames;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;

/// What the next connect attempt should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    Accept,
    Refuse,
}

/// Connector that hands the server side of each accepted connection to the
/// test as a [`MemoryPeer`]. Attempts follow a script; once it runs out,
/// every attempt is accepted.
pub struct MemoryConnector {
    script: Mutex<VecDeque<ConnectOutcome>>,
    attempts: AtomicU32,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            script: Mutex::new(VecDeque::new()),
            attempts: AtomicU32::new(0),
            peers: tx,
        };
        (connector, rx)
    }

    /// Queue `count` refusals after whatever is already scripted.
    pub fn refuse_next(&self, count: usize) {
        let mut script = self.script.lock();
        script.extend(std::iter::repeat(ConnectOutcome::Refuse).take(count));
    }

    pub fn script(&self, outcomes: impl IntoIterator<Item = ConnectOutcome>) {
        self.script.lock().extend(outcomes);
    }

    /// Connect attempts seen so far, accepted or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(ConnectOutcome::Accept);
        if outcome == ConnectOutcome::Refuse {
            return Err(TransportError::Connect(format!("{url}: refused")));
        }

        let (to_client, client_rx) = frames::unbounded();
        let (client_tx, from_client) = frames::unbounded();

        let peer = MemoryPeer {
            url: url.to_owned(),
            to_client,
            from_client,
        };
        self.peers
            .send(peer)
            .map_err(|_| TransportError::Connect(format!("{url}: nobody listening")))?;

        let sink = client_tx.sink_map_err(|e| TransportError::Send(e.to_string()));
        Ok(Connection {
            sink: Box::pin(sink),
            stream: client_rx.boxed(),
        })
    }
}

/// Server side of one in-memory connection. Dropping it closes the
/// connection from the server end.
pub struct MemoryPeer {
    url: String,
    to_client: frames::UnboundedSender<Result<String, TransportError>>,
    from_client: frames::UnboundedReceiver<String>,
}

impl MemoryPeer {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver a text frame to the client. False once the client side is gone.
    pub fn push(&self, text: impl Into<String>) -> bool {
        self.to_client.unbounded_send(Ok(text.into())).is_ok()
    }

    /// Break the connection with an error instead of a clean close.
    pub fn fail(&self, reason: &str) {
        let _ = self
            .to_client
            .unbounded_send(Err(TransportError::Protocol(reason.to_owned())));
    }

    /// Next frame the client sent, or `None` once the client hung up.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    pub fn disconnect(self) {}
}
