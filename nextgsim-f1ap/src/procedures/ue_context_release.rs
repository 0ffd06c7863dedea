//! UE Context Release Procedures
//!
//! TS 38.473 Section 8.3.2 (UE Context Release Request, gNB-DU initiated,
//! Class 2) and Section 8.3.3 (UE Context Release, gNB-CU initiated, Class 1).

use bytes::Bytes;

use crate::cause::F1apCause;
use crate::ids::{GnbCuUeF1apId, GnbDuUeF1apId, SrbId};
use crate::procedures::error_indication::CriticalityDiagnostics;

/// UE CONTEXT RELEASE REQUEST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UeContextReleaseRequest {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub cause: F1apCause,
}

/// UE CONTEXT RELEASE COMMAND
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextReleaseCommand {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub cause: F1apCause,
    /// RRC Release to forward to the UE before the context is released
    pub rrc_container: Option<Bytes>,
    /// SRB over which `rrc_container` is sent
    pub srb_id: Option<SrbId>,
    pub old_gnb_du_ue_f1ap_id: Option<GnbDuUeF1apId>,
}

/// UE CONTEXT RELEASE COMPLETE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextReleaseComplete {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub criticality_diagnostics: Option<CriticalityDiagnostics>,
}
