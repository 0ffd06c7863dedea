//! Peer UE F1AP ID binding
//!
//! Every UE-associated message carries the peer's UE F1AP ID. The first one
//! seen for a context is bound to it; later messages must carry the same ID.
//! A mismatch is answered with an Error Indication whose cause tells whether
//! the ID is unknown or belongs to another UE, and the message is dropped.

use nextgsim_f1ap::{F1apCause, RadioNetworkCause, UeF1apId};

use crate::ue_context::{UeContextStore, UeIndex};
use crate::F1Side;

/// Result of checking a received peer UE F1AP ID against a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerIdCheck {
    /// The context had no peer ID, the received one is now bound
    Bound,
    /// The received ID matches the bound one
    Matched,
    /// Mismatch, and no context holds the received ID
    UnknownId,
    /// Mismatch, the received ID is bound to another context
    AlreadyAllocated(UeIndex),
    /// The UE has no context
    NoContext,
}

impl PeerIdCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, PeerIdCheck::Bound | PeerIdCheck::Matched)
    }

    /// Cause of the Error Indication answering a failed check.
    ///
    /// `side` is the side that received the message: on the gNB-DU the
    /// received ID is a gNB-CU UE F1AP ID and vice versa.
    pub fn fault_cause(&self, side: F1Side) -> Option<F1apCause> {
        let cause = match self {
            PeerIdCheck::Bound | PeerIdCheck::Matched => return None,
            PeerIdCheck::UnknownId | PeerIdCheck::NoContext => {
                RadioNetworkCause::UnknownOrInconsistentPairOfUeF1apId
            }
            PeerIdCheck::AlreadyAllocated(_) => match side {
                F1Side::Du => RadioNetworkCause::UnknownOrAlreadyAllocatedGnbCuUeF1apId,
                F1Side::Cu => RadioNetworkCause::UnknownOrAlreadyAllocatedGnbDuUeF1apId,
            },
        };
        Some(F1apCause::RadioNetwork(cause))
    }
}

/// Checks, and binds on first use, the peer UE F1AP ID of a UE context
pub fn check_peer_id<L: UeF1apId, P: UeF1apId>(
    store: &mut UeContextStore<L, P>,
    ue_index: UeIndex,
    received: P,
) -> PeerIdCheck {
    let Some(ctx) = store.find(ue_index) else {
        return PeerIdCheck::NoContext;
    };

    match ctx.peer_id() {
        Some(bound) if bound == received => PeerIdCheck::Matched,
        Some(_) => match store.ue_index_by_peer_id(received) {
            Some(owner) => PeerIdCheck::AlreadyAllocated(owner),
            None => PeerIdCheck::UnknownId,
        },
        None => match store.ue_index_by_peer_id(received) {
            // another UE already owns the ID, binding it here would alias two UEs
            Some(owner) => PeerIdCheck::AlreadyAllocated(owner),
            None => {
                store.bind_peer_id(ue_index, received);
                PeerIdCheck::Bound
            }
        },
    }
}
