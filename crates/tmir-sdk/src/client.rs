//! Table client: one per room.

use crate::config::ClientConfig;
use crate::dispatcher::{DispatchStats, Dispatcher, Observer};
use crate::error::{Result, SdkError};
use crate::transport::{ConnectionState, Connector, Transport, TransportHandle};
use crate::ws::WsConnector;
use parking_lot::{MappedRwLockReadGuard, Mutex, RwLockReadGuard};
use serde::Serialize;
use std::sync::Arc;
use tmir_state::{Diagnostics, TableState};
use tokio::task::JoinHandle;
use ulid::Ulid;

const LOG_TARGET: &str = "tmir_sdk::client";

/// A live connection and the task draining its events.
struct Link {
    handle: TransportHandle,
    pump: JoinHandle<()>,
}

impl Link {
    async fn shutdown(self) {
        self.handle.close();
        if let Err(err) = self.pump.await {
            tracing::warn!(target: LOG_TARGET, error = %err, "event pump ended abnormally");
        }
    }
}

/// Mirror of one room's table.
///
/// The client owns the dispatcher (and through it the reconciler), at most
/// one transport, and the task that feeds transport events to the
/// dispatcher in order. Callers read the table and send payloads; nothing
/// else writes the state.
///
/// # Example
///
/// ```rust,no_run
/// use tmir_sdk::{ClientConfig, TableClient};
///
/// # async fn run() -> tmir_sdk::Result<()> {
/// let client = TableClient::new(ClientConfig::default());
/// client.connect(Some("ws://localhost:8080/ws/room-1")).await?;
/// client.send(&serde_json::json!({ "type": "ready" }))?;
/// println!("phase: {}", client.read_table().phase);
/// client.leave().await;
/// # Ok(())
/// # }
/// ```
pub struct TableClient {
    session_id: Ulid,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    dispatcher: Arc<Dispatcher>,
    link: Mutex<Option<Link>>,
}

impl TableClient {
    /// Create a client that connects over WebSocket.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector::default()))
    }

    /// Create a client with a custom connector.
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(config.log_capacity));
        Self {
            session_id: Ulid::new(),
            config,
            connector,
            dispatcher,
            link: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> Ulid {
        self.session_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect to `url`, or to the configured URL when `None`.
    ///
    /// Any existing connection is torn down first, and its remaining events
    /// are drained before the new connection starts.
    pub async fn connect(&self, url: Option<&str>) -> Result<()> {
        self.disconnect().await;

        let Some(url) = url
            .map(str::to_owned)
            .or_else(|| self.config.ws_url.clone())
        else {
            self.dispatcher.record(SdkError::MissingUrl.to_string());
            tracing::warn!(target: LOG_TARGET, session = %self.session_id, "no URL to connect to");
            return Err(SdkError::MissingUrl);
        };

        tracing::info!(target: LOG_TARGET, session = %self.session_id, url = %url, "connecting");
        let (handle, mut events) =
            Transport::start(self.connector.clone(), url, self.config.backoff);

        let dispatcher = self.dispatcher.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                dispatcher.on_transport_event(event);
            }
        });

        let stale = self.link.lock().replace(Link { handle, pump });
        if let Some(stale) = stale {
            stale.handle.close();
        }
        Ok(())
    }

    /// Close the current connection, if any. No reconnect follows.
    pub async fn disconnect(&self) {
        let link = self.link.lock().take();
        if let Some(link) = link {
            tracing::info!(target: LOG_TARGET, session = %self.session_id, "disconnecting");
            link.shutdown().await;
        }
    }

    /// Disconnect and drop the client.
    pub async fn leave(self) {
        self.disconnect().await;
    }

    /// Serialize and send `payload`. `Ok(false)` means it was dropped because
    /// no connection is open.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<bool> {
        let handle = self.link.lock().as_ref().map(|link| link.handle.clone());
        self.dispatcher.send(handle.as_ref(), payload)
    }

    pub fn on(&self, observer: Observer) {
        self.dispatcher.on(observer);
    }

    pub fn off(&self, observer: &Observer) -> usize {
        self.dispatcher.off(observer)
    }

    /// A copy of the current table.
    pub fn table(&self) -> TableState {
        self.dispatcher.reconciler().read().state().clone()
    }

    /// Borrow the current table. Inbound frames wait while the guard is held.
    pub fn read_table(&self) -> MappedRwLockReadGuard<'_, TableState> {
        RwLockReadGuard::map(self.dispatcher.reconciler().read(), |r| r.state())
    }

    pub fn diagnostics(&self) -> Diagnostics {
        *self.dispatcher.reconciler().read().diagnostics()
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Message log, newest first.
    pub fn log_lines(&self) -> Vec<String> {
        self.dispatcher.log_lines()
    }

    pub fn is_connected(&self) -> bool {
        self.link
            .lock()
            .as_ref()
            .is_some_and(|link| link.handle.is_open())
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.link.lock().as_ref().map(|link| link.handle.state())
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl Drop for TableClient {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.handle.close();
        }
    }
}
