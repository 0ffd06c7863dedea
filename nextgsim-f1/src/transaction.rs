//! F1AP transaction manager
//!
//! Correlates a non UE-associated request (F1 Setup, Reset, gNB-DU/CU
//! Configuration Update, F1 Removal) with its response through the F1AP
//! Transaction ID. A `Transaction` is created right before the request is sent
//! and consumed by exactly one waiter; the outcome is delivered through a
//! oneshot channel, so it can only ever be set once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use nextgsim_f1ap::{SuccessfulOutcome, TransactionId, UnsuccessfulOutcome};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Response to a class 1 procedure
pub type ProcedureResponse = Result<SuccessfulOutcome, UnsuccessfulOutcome>;

/// Why a wait ended without a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// No response within the deadline
    Timeout,
    /// Cancelled, e.g. on loss of the F1-C association
    Cancelled,
}

/// Outcome of waiting on a transaction or a UE event.
///
/// Callers check, in this order, whether the wait was valid, whether it was
/// aborted, and only then look at the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureOutcome {
    /// No transaction could be created, nothing was sent
    Invalid,
    Aborted(AbortReason),
    Response(ProcedureResponse),
}

impl ProcedureOutcome {
    pub fn is_valid(&self) -> bool {
        !matches!(self, ProcedureOutcome::Invalid)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, ProcedureOutcome::Aborted(_))
    }

    pub fn response(self) -> Option<ProcedureResponse> {
        match self {
            ProcedureOutcome::Response(r) => Some(r),
            _ => None,
        }
    }
}

/// What a waiter receives through its channel
#[derive(Debug)]
pub(crate) enum Completion {
    Response(ProcedureResponse),
    Cancelled,
}

struct PendingTransaction {
    nonce: u64,
    tx: oneshot::Sender<Completion>,
}

struct Inner {
    pending: HashMap<u8, PendingTransaction>,
    pool_size: u16,
    next_id: u16,
    next_nonce: u64,
}

/// Transaction ID pool with the pending transactions
#[derive(Clone)]
pub struct TransactionManager {
    inner: Arc<Mutex<Inner>>,
}

impl TransactionManager {
    /// Creates a manager handing out IDs `0..pool_size` (at most 256)
    pub fn new(pool_size: u16) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                pending: HashMap::new(),
                pool_size: pool_size.clamp(1, 256),
                next_id: 0,
                next_nonce: 0,
            })),
        }
    }

    /// Creates a transaction with a free ID and a deadline `timeout` from now.
    ///
    /// When every ID is taken the returned transaction is invalid: no request
    /// may be sent and waiting on it yields `ProcedureOutcome::Invalid`.
    pub fn create(&self, timeout: Duration) -> Transaction {
        let mut inner = self.inner.lock();
        let pool_size = inner.pool_size;

        for _ in 0..pool_size {
            let candidate = inner.next_id;
            inner.next_id = (inner.next_id + 1) % pool_size;
            let id = candidate as u8;
            if inner.pending.contains_key(&id) {
                continue;
            }

            let nonce = inner.next_nonce;
            inner.next_nonce += 1;
            let (tx, rx) = oneshot::channel();
            inner.pending.insert(id, PendingTransaction { nonce, tx });
            return Transaction {
                id: Some(TransactionId(id)),
                nonce,
                rx: Some(rx),
                deadline: Instant::now() + timeout,
                manager: Some(self.inner.clone()),
            };
        }

        warn!("Transaction pool exhausted: pending={}", inner.pending.len());
        Transaction::invalid()
    }

    /// Delivers a response to the transaction with the given ID.
    ///
    /// Returns false, and does nothing else, if no transaction with this ID is
    /// pending (late or duplicate response).
    pub fn set_response(&self, id: TransactionId, response: ProcedureResponse) -> bool {
        let pending = self.inner.lock().pending.remove(&id.0);
        match pending {
            Some(p) => {
                if p.tx.send(Completion::Response(response)).is_err() {
                    debug!("Transaction waiter gone: transaction_id={}", id);
                    return false;
                }
                true
            }
            None => {
                warn!("Response for unknown transaction discarded: transaction_id={}", id);
                false
            }
        }
    }

    /// Aborts every pending transaction
    pub fn cancel_all(&self) {
        let pending: Vec<PendingTransaction> =
            self.inner.lock().pending.drain().map(|(_, p)| p).collect();
        if !pending.is_empty() {
            debug!("Cancelling pending transactions: count={}", pending.len());
        }
        for p in pending {
            let _ = p.tx.send(Completion::Cancelled);
        }
    }

    pub fn nb_pending(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

/// A request awaiting its response
pub struct Transaction {
    id: Option<TransactionId>,
    nonce: u64,
    rx: Option<oneshot::Receiver<Completion>>,
    deadline: Instant,
    manager: Option<Arc<Mutex<Inner>>>,
}

impl Transaction {
    fn invalid() -> Self {
        Self {
            id: None,
            nonce: 0,
            rx: None,
            deadline: Instant::now(),
            manager: None,
        }
    }

    pub fn id(&self) -> Option<TransactionId> {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_some()
    }

    /// Waits for the response, the deadline or a cancellation.
    pub async fn wait(mut self) -> ProcedureOutcome {
        let Some(rx) = self.rx.take() else {
            return ProcedureOutcome::Invalid;
        };

        match tokio::time::timeout_at(self.deadline, rx).await {
            Ok(Ok(Completion::Response(response))) => ProcedureOutcome::Response(response),
            Ok(Ok(Completion::Cancelled)) | Ok(Err(_)) => {
                ProcedureOutcome::Aborted(AbortReason::Cancelled)
            }
            Err(_) => {
                debug!(
                    "Transaction timed out: transaction_id={}",
                    self.id.map(|id| id.0).unwrap_or_default()
                );
                ProcedureOutcome::Aborted(AbortReason::Timeout)
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        // Free the ID unless it was already reused by a newer transaction
        if let (Some(id), Some(manager)) = (self.id, self.manager.as_ref()) {
            let mut inner = manager.lock();
            if inner.pending.get(&id.0).map(|p| p.nonce) == Some(self.nonce) {
                inner.pending.remove(&id.0);
            }
        }
    }
}
