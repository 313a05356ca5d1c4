//! Reconnecting transport.
//!
//! One task owns the physical connection. It reconnects with exponential
//! backoff until the caller closes the handle, and reports everything that
//! happens as an ordered stream of [`TransportEvent`]s.

use crate::backoff::{Backoff, BackoffPolicy};
use crate::error::TransportError;
use async_trait::async_trait;
use futures::sink::Sink;
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Sleep;

const LOG_TARGET: &str = "tmir_sdk::transport";

/// Outbound half of a connection, carrying text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
/// Inbound half of a connection, carrying text frames in receipt order.
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

/// One established connection.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Something that can open connections to a URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub is_open: bool,
    pub retry_attempt: u32,
    /// Set by [`TransportHandle::close`]; permanent for that transport.
    pub user_closed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    /// The connection dropped or could not be opened.
    Closed,
    Frame(String),
    ReconnectScheduled { attempt: u32, delay: Duration },
}

#[derive(Debug)]
enum Command {
    Send(String),
    Close,
}

enum PumpExit {
    Dropped,
    UserClosed,
}

/// Caller side of a running transport.
///
/// Dropping every clone has the same effect as [`close`](Self::close).
#[derive(Clone, Debug)]
pub struct TransportHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    shared: Arc<RwLock<ConnectionState>>,
    task: Arc<JoinHandle<()>>,
}

impl TransportHandle {
    /// Queue a frame on the open connection.
    ///
    /// Returns `false` and drops the frame when the connection is not open.
    /// Frames are never held back for a later connection.
    pub fn send(&self, text: String) -> bool {
        if !self.shared.read().is_open {
            tracing::debug!(target: LOG_TARGET, "not connected; dropping outbound frame");
            return false;
        }
        self.cmd_tx.send(Command::Send(text)).is_ok()
    }

    /// Stop for good. The flag is set before the socket is closed, so the
    /// resulting close never schedules a retry. A retry already pending still
    /// fires, sees the flag and stops; no events are emitted after the close.
    pub fn close(&self) {
        self.shared.write().user_closed = true;
        let _ = self.cmd_tx.send(Command::Close);
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.read()
    }

    pub fn is_open(&self) -> bool {
        self.shared.read().is_open
    }

    /// True once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Entry point for starting transports.
pub struct Transport;

impl Transport {
    /// Spawn the connection task on the current tokio runtime.
    ///
    /// Events are delivered in the order they happen; frames keep the order
    /// the connection delivered them in.
    pub fn start(
        connector: Arc<dyn Connector>,
        url: impl Into<String>,
        policy: BackoffPolicy,
    ) -> (TransportHandle, mpsc::UnboundedReceiver<TransportEvent>) {
        let url = url.into();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(RwLock::new(ConnectionState::default()));

        let task = tokio::spawn(run(
            connector,
            url,
            Backoff::new(policy),
            shared.clone(),
            cmd_rx,
            event_tx,
        ));

        let handle = TransportHandle {
            cmd_tx,
            shared,
            task: Arc::new(task),
        };
        (handle, event_rx)
    }
}

async fn run(
    connector: Arc<dyn Connector>,
    url: String,
    mut backoff: Backoff,
    shared: Arc<RwLock<ConnectionState>>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    tracing::info!(target: LOG_TARGET, url = %url, "starting transport");

    loop {
        if shared.read().user_closed {
            break;
        }

        match connector.connect(&url).await {
            Ok(connection) => {
                backoff.reset();
                {
                    let mut state = shared.write();
                    state.is_open = true;
                    state.retry_attempt = 0;
                }
                tracing::info!(target: LOG_TARGET, url = %url, "connected");
                let _ = events.send(TransportEvent::Opened);

                let exit = pump(connection, &mut cmd_rx, &events).await;

                shared.write().is_open = false;
                let _ = events.send(TransportEvent::Closed);

                if let PumpExit::UserClosed = exit {
                    shared.write().user_closed = true;
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, url = %url, error = %err, "connect failed");
                let _ = events.send(TransportEvent::Closed);
            }
        }

        if shared.read().user_closed {
            break;
        }

        let attempt = backoff.attempt();
        let delay = backoff.next_delay();
        shared.write().retry_attempt = backoff.attempt();
        tracing::debug!(
            target: LOG_TARGET,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
        let _ = events.send(TransportEvent::ReconnectScheduled { attempt, delay });

        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);
        let wait = wait_for_retry(timer.as_mut(), &mut cmd_rx, &shared).await;
        if let RetryWait::Closed = wait {
            drop(events);
            timer.await;
            tracing::debug!(target: LOG_TARGET, "pending retry fired after close");
            break;
        }
    }

    tracing::info!(target: LOG_TARGET, url = %url, "transport stopped");
}

/// Move frames both ways until the connection ends or the caller closes.
async fn pump(
    connection: Connection,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> PumpExit {
    let Connection {
        mut sink,
        mut stream,
    } = connection;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send(text)) => {
                    if let Err(err) = sink.send(text).await {
                        tracing::warn!(
                            target: LOG_TARGET,
                            error = %err,
                            "send failed, dropping connection"
                        );
                        return PumpExit::Dropped;
                    }
                }
                Some(Command::Close) | None => {
                    tracing::debug!(target: LOG_TARGET, "closing connection");
                    let _ = sink.close().await;
                    return PumpExit::UserClosed;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(text)) => {
                    let _ = events.send(TransportEvent::Frame(text));
                }
                Some(Err(err)) => {
                    tracing::warn!(target: LOG_TARGET, error = %err, "connection error");
                    return PumpExit::Dropped;
                }
                None => {
                    tracing::debug!(target: LOG_TARGET, "connection ended");
                    return PumpExit::Dropped;
                }
            },
        }
    }
}

enum RetryWait {
    Elapsed,
    Closed,
}

/// Sleep out the backoff delay. Sends that arrive meanwhile are dropped.
async fn wait_for_retry(
    mut timer: Pin<&mut Sleep>,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    shared: &RwLock<ConnectionState>,
) -> RetryWait {
    loop {
        tokio::select! {
            _ = timer.as_mut() => return RetryWait::Elapsed,
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send(_)) => {
                    tracing::debug!(target: LOG_TARGET, "not connected; dropping outbound frame");
                }
                Some(Command::Close) => return RetryWait::Closed,
                None => {
                    shared.write().user_closed = true;
                    return RetryWait::Closed;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;

    async fn next(events: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
        events.recv().await.expect("transport event")
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_connects_back_off() {
        let (connector, _peers) = MemoryConnector::new();
        connector.refuse_next(6);
        let (handle, mut events) =
            Transport::start(Arc::new(connector), "mem://table", BackoffPolicy::default());

        let mut delays = Vec::new();
        while delays.len() < 6 {
            match next(&mut events).await {
                TransportEvent::Closed => {}
                TransportEvent::ReconnectScheduled { delay, .. } => delays.push(delay.as_millis()),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10_000, 10_000]);
        assert_eq!(next(&mut events).await, TransportEvent::Opened);
        assert_eq!(handle.state().retry_attempt, 0);
        handle.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_closed_is_dropped() {
        let (connector, _peers) = MemoryConnector::new();
        connector.refuse_next(1);
        let (handle, mut events) =
            Transport::start(Arc::new(connector), "mem://table", BackoffPolicy::default());

        assert_eq!(next(&mut events).await, TransportEvent::Closed);
        assert!(!handle.send("{}".to_owned()));
        handle.close();
    }
}
