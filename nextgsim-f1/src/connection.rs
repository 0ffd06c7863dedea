//! F1-C connection handling
//!
//! One `F1cConnectionHandler` per association. It owns the transmit path
//! towards the peer and hands out a receive adapter tagged with the epoch it
//! was created in. The association goes `Idle -> Connected -> Disconnected`
//! and never back: a new handler is needed to reconnect.
//!
//! Loss of the association is signalled by dropping the receive adapter. The
//! adapter then tears the handler down and reports the loss to the engine,
//! unless the handler already moved to a newer epoch (explicit disconnect),
//! in which case the drop is a no-op. Messages arriving through an adapter of
//! an old epoch are discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use nextgsim_common::logging::{log_f1ap_message, Direction};
use nextgsim_f1ap::F1apMessage;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::F1Error;
use crate::F1Side;

/// Consumer of F1AP messages, used for both directions of an association
pub trait F1cMessageNotifier: Send + Sync {
    fn on_new_message(&self, msg: F1apMessage);
}

/// gNB-DU side connection establishment towards the gNB-CU
pub trait F1cConnectionClient: Send + Sync {
    /// Opens an association. `du_rx` receives the messages sent by the
    /// gNB-CU; dropping it signals the loss of the association.
    ///
    /// Returns the transmit path towards the gNB-CU, `None` if the connection
    /// could not be established.
    fn handle_du_connection_request(
        &self,
        du_rx: Box<dyn F1cMessageNotifier>,
    ) -> Option<Box<dyn F1cMessageNotifier>>;
}

/// Engine side of a connection: receives messages and the loss event
pub trait F1cEventHandler: Send + Sync {
    fn handle_message(&self, msg: F1apMessage);
    fn handle_connection_loss(&self);
}

/// Association state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never connected
    #[default]
    Idle,
    Connected,
    /// Terminal
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "Idle"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnected => write!(f, "Disconnected"),
        }
    }
}

struct HandlerInner {
    state: ConnectionState,
    tx: Option<Arc<dyn F1cMessageNotifier>>,
}

/// Connection handler of one F1-C association
pub struct F1cConnectionHandler {
    side: F1Side,
    inner: Mutex<HandlerInner>,
    epoch: AtomicU64,
}

impl F1cConnectionHandler {
    pub fn new(side: F1Side) -> Arc<Self> {
        Arc::new(Self {
            side,
            inner: Mutex::new(HandlerInner {
                state: ConnectionState::Idle,
                tx: None,
            }),
            epoch: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Connects through the client (gNB-DU side).
    ///
    /// Only succeeds from `Idle` and if the client returns a transmit path.
    pub fn connect(
        self: &Arc<Self>,
        client: &dyn F1cConnectionClient,
        events: Weak<dyn F1cEventHandler>,
    ) -> bool {
        if self.state() != ConnectionState::Idle {
            warn!("{} F1-C connection already used: state={}", self.side, self.state());
            return false;
        }

        let rx = self.rx_adapter(events);
        let Some(tx) = client.handle_du_connection_request(Box::new(rx)) else {
            warn!("{} F1-C connection request failed", self.side);
            // the client dropped the adapter without connecting; keep the handler usable
            return false;
        };

        let mut inner = self.inner.lock();
        inner.tx = Some(Arc::from(tx));
        inner.state = ConnectionState::Connected;
        info!("{} F1-C connection established: epoch={}", self.side, self.epoch());
        true
    }

    /// Attaches an accepted association (gNB-CU side) and returns its
    /// receive adapter.
    pub fn attach(
        self: &Arc<Self>,
        tx: Box<dyn F1cMessageNotifier>,
        events: Weak<dyn F1cEventHandler>,
    ) -> Option<Box<dyn F1cMessageNotifier>> {
        {
            let mut inner = self.inner.lock();
            if inner.state != ConnectionState::Idle {
                warn!("{} F1-C connection already used: state={}", self.side, inner.state);
                return None;
            }
            inner.tx = Some(Arc::from(tx));
            inner.state = ConnectionState::Connected;
        }
        info!("{} F1-C connection established: epoch={}", self.side, self.epoch());
        Some(Box::new(self.rx_adapter(events)))
    }

    fn rx_adapter(self: &Arc<Self>, events: Weak<dyn F1cEventHandler>) -> F1cRxAdapter {
        F1cRxAdapter {
            epoch: self.epoch(),
            handler: Arc::downgrade(self),
            events,
        }
    }

    /// Sends a message to the peer
    pub fn send(&self, msg: F1apMessage) -> Result<(), F1Error> {
        let tx = {
            let inner = self.inner.lock();
            match (&inner.state, &inner.tx) {
                (ConnectionState::Connected, Some(tx)) => tx.clone(),
                _ => {
                    warn!("{} Cannot send {}: F1-C not connected", self.side, msg.name());
                    return Err(F1Error::NotConnected);
                }
            }
        };

        log_f1ap_message(
            self.side.as_str(),
            Direction::Tx,
            msg.name(),
            self.side.local_ue_id(&msg),
        );
        tx.on_new_message(msg);
        Ok(())
    }

    /// Closes the association.
    ///
    /// Moves to a new epoch so that the drop of the old receive adapter is not
    /// reported as a loss. Returns false if the association was not connected.
    pub fn disconnect(&self) -> bool {
        let tx = {
            let mut inner = self.inner.lock();
            if inner.state != ConnectionState::Connected {
                return false;
            }
            inner.state = ConnectionState::Disconnected;
            self.epoch.fetch_add(1, Ordering::AcqRel);
            inner.tx.take()
        };
        info!("{} F1-C connection closed", self.side);
        // dropping the transmit path lets the peer see the association go away
        drop(tx);
        true
    }

    /// Same as `disconnect`, but only if `epoch` is still the current one
    fn disconnect_epoch(&self, epoch: u64) -> bool {
        let tx = {
            let mut inner = self.inner.lock();
            if inner.state != ConnectionState::Connected || self.epoch() != epoch {
                return false;
            }
            inner.state = ConnectionState::Disconnected;
            self.epoch.fetch_add(1, Ordering::AcqRel);
            inner.tx.take()
        };
        drop(tx);
        true
    }
}

/// Receive path of one epoch of an association
struct F1cRxAdapter {
    epoch: u64,
    handler: Weak<F1cConnectionHandler>,
    events: Weak<dyn F1cEventHandler>,
}

impl F1cMessageNotifier for F1cRxAdapter {
    fn on_new_message(&self, msg: F1apMessage) {
        let Some(handler) = self.handler.upgrade() else {
            return;
        };
        if handler.epoch() != self.epoch {
            debug!(
                "{} Discarding {} received on stale F1-C rx path: epoch={}, current={}",
                handler.side,
                msg.name(),
                self.epoch,
                handler.epoch()
            );
            return;
        }
        log_f1ap_message(
            handler.side.as_str(),
            Direction::Rx,
            msg.name(),
            handler.side.local_ue_id(&msg),
        );
        if let Some(events) = self.events.upgrade() {
            events.handle_message(msg);
        }
    }
}

impl Drop for F1cRxAdapter {
    fn drop(&mut self) {
        let Some(handler) = self.handler.upgrade() else {
            return;
        };
        if !handler.disconnect_epoch(self.epoch) {
            return;
        }
        warn!("{} F1-C association lost", handler.side);
        if let Some(events) = self.events.upgrade() {
            events.handle_connection_loss();
        }
    }
}
