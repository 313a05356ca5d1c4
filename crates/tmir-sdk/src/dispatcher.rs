//! Inbound frame routing.
//!
//! The dispatcher decodes each frame, writes a log line, hands the event to
//! the reconciler and then fans the decoded message out to observers. It is
//! driven by a single pump task, so the reconciler has exactly one writer.

use crate::error::Result;
use crate::log::{self, MessageLog};
use crate::transport::{TransportEvent, TransportHandle};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tmir_state::{decode_frame, Decoded, Reconciler, TableEvent};

const LOG_TARGET: &str = "tmir_sdk::dispatcher";

/// What observers receive for every decoded frame.
pub type Inbound = Decoded;

/// Callback invoked after the reconciler has applied a frame.
pub type Observer = Arc<dyn Fn(&Inbound) + Send + Sync>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub frames_decoded: u64,
    pub decode_faults: u64,
    pub observer_faults: u64,
}

pub struct Dispatcher {
    reconciler: RwLock<Reconciler>,
    log: Mutex<MessageLog>,
    observers: RwLock<Vec<Observer>>,
    stats: Mutex<DispatchStats>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(log::DEFAULT_LOG_CAPACITY)
    }
}

impl Dispatcher {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            reconciler: RwLock::new(Reconciler::new()),
            log: Mutex::new(MessageLog::new(log_capacity)),
            observers: RwLock::new(Vec::new()),
            stats: Mutex::new(DispatchStats::default()),
        }
    }

    /// Register an observer. Registering the same `Arc` twice calls it twice.
    pub fn on(&self, observer: Observer) {
        self.observers.write().push(observer);
    }

    /// Remove every registration of `observer`. Returns how many were removed.
    pub fn off(&self, observer: &Observer) -> usize {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        before - observers.len()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Decode, log, reconcile and notify, in that order.
    ///
    /// Returns `false` when the frame could not be decoded; such frames are
    /// logged raw and go no further.
    pub fn handle_frame(&self, text: &str) -> bool {
        let inbound = match decode_frame(text) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, error = %err, "undecodable frame");
                self.log.lock().push(log::raw_line(text));
                self.stats.lock().decode_faults += 1;
                return false;
            }
        };

        self.log.lock().push(log::inbound_line(&inbound));
        self.stats.lock().frames_decoded += 1;

        if let TableEvent::ServerError(err) = &inbound.event {
            tracing::warn!(
                target: LOG_TARGET,
                server_message = ?err.message,
                code = ?err.code,
                "server reported an error"
            );
        }

        self.reconciler.write().apply(&inbound.event);
        self.notify(&inbound);
        true
    }

    fn notify(&self, inbound: &Inbound) {
        let observers: Vec<Observer> = self.observers.read().clone();
        for observer in observers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer(inbound)));
            if outcome.is_err() {
                self.stats.lock().observer_faults += 1;
                tracing::warn!(
                    target: LOG_TARGET,
                    kind = %inbound.kind,
                    "observer panicked; continuing with the rest"
                );
            }
        }
    }

    /// Feed one transport event through.
    pub fn on_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.record("WS connected"),
            TransportEvent::Closed => self.record("WS closed"),
            TransportEvent::Frame(text) => {
                self.handle_frame(&text);
            }
            TransportEvent::ReconnectScheduled { attempt, delay } => {
                tracing::debug!(
                    target: LOG_TARGET,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "waiting before reconnect attempt"
                );
            }
        }
    }

    /// Serialize `payload` and hand it to the transport.
    ///
    /// Without a transport nothing is logged and `Ok(false)` is returned. With
    /// one, the line is logged even if the connection then drops the frame.
    pub fn send<T: Serialize + ?Sized>(
        &self,
        transport: Option<&TransportHandle>,
        payload: &T,
    ) -> Result<bool> {
        let json = serde_json::to_string(payload)?;
        let Some(transport) = transport else {
            tracing::debug!(target: LOG_TARGET, "no transport; dropping outbound payload");
            return Ok(false);
        };
        self.log.lock().push(log::outbound_line(&json));
        Ok(transport.send(json))
    }

    pub fn record(&self, line: impl AsRef<str>) {
        self.log.lock().push(line);
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.log.lock().snapshot()
    }

    pub fn stats(&self) -> DispatchStats {
        *self.stats.lock()
    }

    pub fn reconciler(&self) -> &RwLock<Reconciler> {
        &self.reconciler
    }
}
