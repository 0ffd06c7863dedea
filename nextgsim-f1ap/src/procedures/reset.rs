//! Reset Procedure
//!
//! TS 38.473 Section 8.2.1. Initializes or re-initializes the F1AP UE-related
//! contexts, either for the whole interface or for a list of UE-associated
//! logical F1 connections. Either node may initiate it.

use crate::cause::F1apCause;
use crate::ids::{GnbCuUeF1apId, GnbDuUeF1apId, TransactionId};
use crate::procedures::error_indication::CriticalityDiagnostics;

/// UE-associated logical F1-connection item
///
/// At least one of the two IDs is present in a request. In the acknowledge,
/// an item the receiver could not resolve is echoed back with the IDs it was
/// given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UeAssociatedLogicalF1ConnectionItem {
    pub gnb_cu_ue_f1ap_id: Option<GnbCuUeF1apId>,
    pub gnb_du_ue_f1ap_id: Option<GnbDuUeF1apId>,
}

/// Reset Type IE
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetType {
    /// Reset all UE-associated logical F1 connections
    F1Interface,
    /// Reset only the listed connections
    PartOfF1Interface(Vec<UeAssociatedLogicalF1ConnectionItem>),
}

/// RESET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reset {
    pub transaction_id: TransactionId,
    pub cause: F1apCause,
    pub reset_type: ResetType,
}

/// RESET ACKNOWLEDGE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetAcknowledge {
    pub transaction_id: TransactionId,
    /// Only present when answering a partial reset, in request order
    pub ue_associated_connections: Vec<UeAssociatedLogicalF1ConnectionItem>,
    pub criticality_diagnostics: Option<CriticalityDiagnostics>,
}
