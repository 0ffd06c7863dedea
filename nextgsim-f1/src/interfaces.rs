//! Collaborator interfaces shared by both sides of the engine

use async_trait::async_trait;
use nextgsim_f1ap::F1apCause;
use thiserror::Error;

use crate::error::F1Error;
use crate::transaction::AbortReason;
use crate::ue_context::UeIndex;

/// Performs the non-F1AP cleanup of a UE (radio resources, RRC, ...).
///
/// The engine awaits it before it considers a UE removed.
#[async_trait]
pub trait UeRemovalHandler: Send + Sync {
    async fn remove_ue(&self, ue_index: UeIndex);
}

/// Failure of a locally initiated class 1 procedure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcedureError {
    /// The peer answered with a failure
    #[error("Rejected by peer: cause={0}")]
    Rejected(F1apCause),

    /// No answer before the deadline, or the wait was cancelled
    #[error("Procedure aborted: {0:?}")]
    Aborted(AbortReason),

    /// The peer answered with a message of the wrong type
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(&'static str),

    /// The procedure could not be started
    #[error(transparent)]
    Engine(#[from] F1Error),
}
