//! In-memory F1-C association between an `F1apCu` and an `F1apDu`
//!
//! Each direction is a `Link` owned by the transmit path of the sending
//! engine. When an engine drops its transmit path the link goes away with the
//! peer's receive adapter, which the peer sees as the loss of the association.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use nextgsim_f1::{F1apCu, F1cConnectionClient, F1cMessageNotifier};
use nextgsim_f1ap::F1apMessage;
use parking_lot::Mutex;

struct Link {
    rx: Mutex<Option<Arc<dyn F1cMessageNotifier>>>,
    log: Arc<Mutex<Vec<F1apMessage>>>,
    muted: Arc<AtomicBool>,
}

/// Transmit path handed to an engine
struct LinkTx(Arc<Link>);

impl F1cMessageNotifier for LinkTx {
    fn on_new_message(&self, msg: F1apMessage) {
        if self.0.muted.load(Ordering::SeqCst) {
            return;
        }
        self.0.log.lock().push(msg.clone());
        // the receiver may answer synchronously over the other link
        let rx = self.0.rx.lock().clone();
        if let Some(rx) = rx {
            rx.on_new_message(msg);
        }
    }
}

/// DU-side connection client delivering straight into an `F1apCu`
pub struct LoopbackF1c {
    cu: Arc<F1apCu>,
    to_cu: Mutex<Weak<Link>>,
    to_du: Mutex<Weak<Link>>,
    to_cu_log: Arc<Mutex<Vec<F1apMessage>>>,
    to_du_log: Arc<Mutex<Vec<F1apMessage>>>,
    to_cu_muted: Arc<AtomicBool>,
    to_du_muted: Arc<AtomicBool>,
}

impl LoopbackF1c {
    pub fn new(cu: Arc<F1apCu>) -> Arc<Self> {
        Arc::new(Self {
            cu,
            to_cu: Mutex::new(Weak::new()),
            to_du: Mutex::new(Weak::new()),
            to_cu_log: Arc::default(),
            to_du_log: Arc::default(),
            to_cu_muted: Arc::default(),
            to_du_muted: Arc::default(),
        })
    }

    /// Messages the gNB-CU received
    pub fn sent_to_cu(&self) -> Vec<F1apMessage> {
        self.to_cu_log.lock().clone()
    }

    /// Messages the gNB-DU received
    pub fn sent_to_du(&self) -> Vec<F1apMessage> {
        self.to_du_log.lock().clone()
    }

    pub fn count_to_cu(&self, name: &str) -> usize {
        self.to_cu_log.lock().iter().filter(|m| m.name() == name).count()
    }

    pub fn count_to_du(&self, name: &str) -> usize {
        self.to_du_log.lock().iter().filter(|m| m.name() == name).count()
    }

    /// Silently drops everything sent to the gNB-CU while set
    pub fn mute_to_cu(&self, muted: bool) {
        self.to_cu_muted.store(muted, Ordering::SeqCst);
    }

    /// Silently drops everything sent to the gNB-DU while set
    pub fn mute_to_du(&self, muted: bool) {
        self.to_du_muted.store(muted, Ordering::SeqCst);
    }

    /// Tears the association down under both engines, as a transport
    /// failure would
    pub fn break_link(&self) {
        let take = |link: &Mutex<Weak<Link>>| {
            let link = link.lock().upgrade()?;
            let rx = link.rx.lock().take();
            rx
        };
        let to_du_rx = take(&self.to_du);
        let to_cu_rx = take(&self.to_cu);
        drop(to_du_rx);
        drop(to_cu_rx);
    }

    /// Delivers a message to the gNB-CU as if the gNB-DU had sent it
    pub fn inject_to_cu(&self, msg: impl Into<F1apMessage>) -> bool {
        Self::inject(&self.to_cu, msg.into())
    }

    /// Delivers a message to the gNB-DU as if the gNB-CU had sent it
    pub fn inject_to_du(&self, msg: impl Into<F1apMessage>) -> bool {
        Self::inject(&self.to_du, msg.into())
    }

    fn inject(link: &Mutex<Weak<Link>>, msg: F1apMessage) -> bool {
        let Some(link) = link.lock().upgrade() else {
            return false;
        };
        LinkTx(link).on_new_message(msg);
        true
    }

    /// Whether a link still exists in each direction (to CU, to DU)
    pub fn is_up(&self) -> (bool, bool) {
        let up = |link: &Mutex<Weak<Link>>| {
            let Some(link) = link.lock().upgrade() else {
                return false;
            };
            let has_rx = link.rx.lock().is_some();
            has_rx
        };
        (up(&self.to_cu), up(&self.to_du))
    }
}

impl F1cConnectionClient for LoopbackF1c {
    fn handle_du_connection_request(
        &self,
        du_rx: Box<dyn F1cMessageNotifier>,
    ) -> Option<Box<dyn F1cMessageNotifier>> {
        let to_du = Arc::new(Link {
            rx: Mutex::new(Some(Arc::from(du_rx))),
            log: self.to_du_log.clone(),
            muted: self.to_du_muted.clone(),
        });
        *self.to_du.lock() = Arc::downgrade(&to_du);

        let cu_rx = self.cu.handle_new_du_connection(Box::new(LinkTx(to_du)))?;
        let to_cu = Arc::new(Link {
            rx: Mutex::new(Some(Arc::from(cu_rx))),
            log: self.to_cu_log.clone(),
            muted: self.to_cu_muted.clone(),
        });
        *self.to_cu.lock() = Arc::downgrade(&to_cu);

        Some(Box::new(LinkTx(to_cu)))
    }
}
