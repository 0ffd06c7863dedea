//! UE-scoped procedure event sources
//!
//! UE-associated class 1 responses carry no transaction ID; they are
//! correlated by UE and procedure kind instead. A procedure subscribes before
//! sending its request and the dispatcher resolves the subscription when the
//! matching response or failure for that UE arrives. Each (UE, kind) pair is a
//! single-slot mailbox.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::transaction::{AbortReason, Completion, ProcedureOutcome, ProcedureResponse};
use crate::ue_context::UeIndex;

/// UE-associated procedures whose outcome is awaited through an event source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UeProcedureKind {
    /// UE Context Setup Response / Failure
    ContextSetup,
    /// UE Context Modification Response / Failure
    ContextModification,
    /// UE Context Release Complete
    ContextRelease,
    /// UE Context Modification Confirm / Refuse
    ModificationRequired,
}

impl std::fmt::Display for UeProcedureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UeProcedureKind::ContextSetup => write!(f, "UEContextSetup"),
            UeProcedureKind::ContextModification => write!(f, "UEContextModification"),
            UeProcedureKind::ContextRelease => write!(f, "UEContextRelease"),
            UeProcedureKind::ModificationRequired => write!(f, "UEContextModificationRequired"),
        }
    }
}

struct Slot {
    nonce: u64,
    tx: oneshot::Sender<Completion>,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<(UeIndex, UeProcedureKind), Slot>,
    next_nonce: u64,
}

/// Event sources of all UEs of one F1AP instance
#[derive(Clone, Default)]
pub struct UeEventSources {
    inner: Arc<Mutex<Inner>>,
}

impl UeEventSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the next outcome of `kind` for the UE.
    ///
    /// A previous subscription for the same pair is aborted: the slot only
    /// holds one waiter.
    pub fn subscribe(
        &self,
        ue_index: UeIndex,
        kind: UeProcedureKind,
        timeout: Duration,
    ) -> UeEventSubscription {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock();
        let nonce = inner.next_nonce;
        inner.next_nonce += 1;

        if let Some(previous) = inner.slots.insert((ue_index, kind), Slot { nonce, tx }) {
            warn!("{} outcome already awaited, aborting previous waiter: ue={}", kind, ue_index);
            let _ = previous.tx.send(Completion::Cancelled);
        }

        UeEventSubscription {
            key: (ue_index, kind),
            nonce,
            rx: Some(rx),
            deadline: Instant::now() + timeout,
            sources: self.inner.clone(),
        }
    }

    /// Resolves the subscription for the UE and kind.
    ///
    /// Returns false if nobody waits for it (late or unsolicited message).
    pub fn set(&self, ue_index: UeIndex, kind: UeProcedureKind, response: ProcedureResponse) -> bool {
        let slot = self.inner.lock().slots.remove(&(ue_index, kind));
        match slot {
            Some(slot) => slot.tx.send(Completion::Response(response)).is_ok(),
            None => {
                warn!("Discarding unexpected {} outcome: ue={}", kind, ue_index);
                false
            }
        }
    }

    pub fn is_pending(&self, ue_index: UeIndex, kind: UeProcedureKind) -> bool {
        self.inner.lock().slots.contains_key(&(ue_index, kind))
    }

    /// Aborts every subscription of a UE
    pub fn cancel_ue(&self, ue_index: UeIndex) {
        let cancelled: Vec<Slot> = {
            let mut inner = self.inner.lock();
            let keys: Vec<_> = inner
                .slots
                .keys()
                .filter(|(ue, _)| *ue == ue_index)
                .copied()
                .collect();
            keys.iter().filter_map(|k| inner.slots.remove(k)).collect()
        };
        for slot in cancelled {
            let _ = slot.tx.send(Completion::Cancelled);
        }
    }

    /// Aborts every subscription
    pub fn cancel_all(&self) {
        let cancelled: Vec<Slot> = self.inner.lock().slots.drain().map(|(_, s)| s).collect();
        if !cancelled.is_empty() {
            debug!("Cancelling UE procedure waiters: count={}", cancelled.len());
        }
        for slot in cancelled {
            let _ = slot.tx.send(Completion::Cancelled);
        }
    }

    pub fn nb_pending(&self) -> usize {
        self.inner.lock().slots.len()
    }
}

/// A pending subscription to a UE procedure outcome
pub struct UeEventSubscription {
    key: (UeIndex, UeProcedureKind),
    nonce: u64,
    rx: Option<oneshot::Receiver<Completion>>,
    deadline: Instant,
    sources: Arc<Mutex<Inner>>,
}

impl UeEventSubscription {
    /// Waits for the outcome, the deadline or a cancellation
    pub async fn wait(mut self) -> ProcedureOutcome {
        let Some(rx) = self.rx.take() else {
            return ProcedureOutcome::Invalid;
        };
        match tokio::time::timeout_at(self.deadline, rx).await {
            Ok(Ok(Completion::Response(response))) => ProcedureOutcome::Response(response),
            Ok(Ok(Completion::Cancelled)) | Ok(Err(_)) => {
                ProcedureOutcome::Aborted(AbortReason::Cancelled)
            }
            Err(_) => ProcedureOutcome::Aborted(AbortReason::Timeout),
        }
    }
}

impl Drop for UeEventSubscription {
    fn drop(&mut self) {
        let mut inner = self.sources.lock();
        if inner.slots.get(&self.key).map(|s| s.nonce) == Some(self.nonce) {
            inner.slots.remove(&self.key);
        }
    }
}
