//! F1AP UE Context Management
//!
//! Each side of the F1-C interface keeps one context per UE holding the
//! UE F1AP ID it allocated itself (local), the one allocated by the peer, and
//! the release / RRC configuration state. Contexts live in a
//! generation-checked arena (`UeContextStore`) so that a procedure suspended on
//! a UE can keep a `UeContextRef` and find out on resumption whether the
//! context it started with is still there.

mod id_allocator;
mod store;

use std::fmt;

use nextgsim_f1ap::{GnbCuUeF1apId, GnbDuUeF1apId, NrCgi, UeF1apId};

pub use id_allocator::IdAllocator;
pub use store::{UeContextRef, UeContextStore};

/// Application-level UE index (DU UE index or CU UE index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UeIndex(pub u32);

impl fmt::Display for UeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Release state of a UE context. Never goes back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseState {
    #[default]
    Active,
    MarkedForRelease,
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseState::Active => write!(f, "Active"),
            ReleaseState::MarkedForRelease => write!(f, "MarkedForRelease"),
        }
    }
}

/// RRC configuration state, tracked by the gNB-DU only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RrcConfigState {
    /// No RRC configuration forwarded to the UE yet
    #[default]
    NoConfig,
    /// An RRC container was forwarded, the UE has not answered yet
    ConfigPending,
    /// The UE answered on SRB1 after the last forwarded configuration
    ConfigApplied,
}

impl fmt::Display for RrcConfigState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RrcConfigState::NoConfig => write!(f, "NoConfig"),
            RrcConfigState::ConfigPending => write!(f, "ConfigPending"),
            RrcConfigState::ConfigApplied => write!(f, "ConfigApplied"),
        }
    }
}

/// F1AP UE context.
///
/// `L` is the UE F1AP ID allocated by this side, `P` the one allocated by the
/// peer.
#[derive(Debug, Clone)]
pub struct UeContext<L, P> {
    /// Application-level UE index
    pub ue_index: UeIndex,
    /// UE F1AP ID allocated locally, immutable
    pub local_id: L,
    /// UE F1AP ID allocated by the peer, bound by the first message carrying it
    peer_id: Option<P>,
    release_state: ReleaseState,
    /// RRC configuration state (gNB-DU only)
    pub rrc_state: RrcConfigState,
    /// Old peer UE F1AP ID to include in the next DL message (reestablishment)
    pub pending_peer_id_to_relay: Option<P>,
    /// A UE Context Release Request was already sent for this UE
    pub release_requested: bool,
    /// C-RNTI of the UE in its PCell
    pub c_rnti: Option<u16>,
    /// PCell of the UE
    pub pcell: Option<NrCgi>,
}

/// UE context as kept by the gNB-CU
pub type CuUeContext = UeContext<GnbCuUeF1apId, GnbDuUeF1apId>;

/// UE context as kept by the gNB-DU
pub type DuUeContext = UeContext<GnbDuUeF1apId, GnbCuUeF1apId>;

impl<L: UeF1apId, P: UeF1apId> UeContext<L, P> {
    /// Creates a new context with no peer ID bound
    pub fn new(ue_index: UeIndex, local_id: L) -> Self {
        Self {
            ue_index,
            local_id,
            peer_id: None,
            release_state: ReleaseState::Active,
            rrc_state: RrcConfigState::NoConfig,
            pending_peer_id_to_relay: None,
            release_requested: false,
            c_rnti: None,
            pcell: None,
        }
    }

    pub fn peer_id(&self) -> Option<P> {
        self.peer_id
    }

    pub(crate) fn set_peer_id(&mut self, peer_id: Option<P>) {
        self.peer_id = peer_id;
    }

    pub fn release_state(&self) -> ReleaseState {
        self.release_state
    }

    pub fn is_marked_for_release(&self) -> bool {
        self.release_state == ReleaseState::MarkedForRelease
    }

    /// Marks the context for release.
    ///
    /// Returns false if it was already marked, in which case the caller must
    /// not start another release.
    pub fn mark_for_release(&mut self) -> bool {
        if self.is_marked_for_release() {
            return false;
        }
        self.release_state = ReleaseState::MarkedForRelease;
        true
    }

    /// An RRC container was forwarded to the UE. A new reconfiguration
    /// restarts the tracking from `ConfigPending`.
    pub fn on_rrc_config_forwarded(&mut self) {
        self.rrc_state = RrcConfigState::ConfigPending;
    }

    /// An UL RRC message was received on SRB1
    pub fn on_ul_srb1_message(&mut self) {
        if self.rrc_state == RrcConfigState::ConfigPending {
            self.rrc_state = RrcConfigState::ConfigApplied;
        }
    }

    /// Takes the old peer ID that has to be relayed, if any
    pub fn take_pending_peer_id(&mut self) -> Option<P> {
        self.pending_peer_id_to_relay.take()
    }
}
