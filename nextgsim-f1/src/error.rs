//! Error types of the F1AP protocol engine
//!
//! Protocol faults never surface here: they are answered on the wire. These
//! are the typed failures of a locally triggered operation.

use nextgsim_f1ap::{GnbCuUeF1apId, GnbDuUeF1apId};
use thiserror::Error;

use crate::ue_context::UeIndex;

/// Errors returned by the F1AP engine APIs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum F1Error {
    /// No F1-C association towards the peer
    #[error("F1-C interface not connected")]
    NotConnected,

    /// The association exists but F1 Setup has not completed
    #[error("F1 interface not set up")]
    NotSetUp,

    /// All transaction IDs are in use
    #[error("Transaction pool exhausted")]
    TransactionPoolExhausted,

    /// No UE F1AP ID could be allocated
    #[error("UE F1AP ID pool exhausted")]
    UeIdPoolExhausted,

    /// Unknown UE index
    #[error("UE not found: ue={0}")]
    UeNotFound(UeIndex),

    /// UE index already has a context
    #[error("UE already exists: ue={0}")]
    UeAlreadyExists(UeIndex),

    /// gNB-CU UE F1AP ID already used by another context
    #[error("gNB-CU UE F1AP ID {0} already in use")]
    CuUeIdInUse(GnbCuUeF1apId),

    /// gNB-DU UE F1AP ID already used by another context
    #[error("gNB-DU UE F1AP ID {0} already in use")]
    DuUeIdInUse(GnbDuUeF1apId),

    /// The UE context is being released
    #[error("UE is being released: ue={0}")]
    UeReleasing(UeIndex),

    /// The peer gNB-CU UE F1AP ID is not yet known for this UE
    #[error("Peer UE F1AP ID not bound: ue={0}")]
    PeerIdNotBound(UeIndex),

    /// The task queue that should run the procedure has stopped
    #[error("Task queue closed")]
    TaskQueueClosed,

    /// A locally supplied parameter is out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The engine configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
