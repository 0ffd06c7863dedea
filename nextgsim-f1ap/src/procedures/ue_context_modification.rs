//! UE Context Modification Procedures
//!
//! TS 38.473 Section 8.3.4 (gNB-CU initiated) and Section 8.3.5 (gNB-DU
//! initiated, UE Context Modification Required). Both are Class 1.

use bytes::Bytes;

use crate::cause::F1apCause;
use crate::ids::{DrbId, GnbCuUeF1apId, GnbDuUeF1apId, NrCgi, SrbId};
use crate::procedures::error_indication::CriticalityDiagnostics;
use crate::procedures::ue_context_setup::{DrbFailedItem, DrbSetupItem, DrbToBeSetupItem};

/// Transmission Action Indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionActionIndicator {
    /// Stop data transmission for the UE
    Stop,
    /// Restart data transmission for the UE
    Restart,
}

/// UE CONTEXT MODIFICATION REQUEST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextModificationRequest {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub sp_cell_id: Option<NrCgi>,
    pub cu_to_du_rrc_info: Option<Bytes>,
    pub transmission_action_indicator: Option<TransmissionActionIndicator>,
    /// RRC message to forward to the UE over SRB1 (e.g. RRC Reconfiguration)
    pub rrc_container: Option<Bytes>,
    pub srbs_to_be_setup_mod: Vec<SrbId>,
    pub drbs_to_be_setup_mod: Vec<DrbToBeSetupItem>,
    pub drbs_to_be_modified: Vec<DrbToBeSetupItem>,
    pub srbs_to_be_released: Vec<SrbId>,
    pub drbs_to_be_released: Vec<DrbId>,
    /// The UE reported RRC Reconfiguration Complete (true) or failure (false)
    pub rrc_reconfiguration_complete_indicator: Option<bool>,
}

impl UeContextModificationRequest {
    /// Empty request for the given UE; fields are filled by the caller
    pub fn new(gnb_cu_ue_f1ap_id: GnbCuUeF1apId, gnb_du_ue_f1ap_id: GnbDuUeF1apId) -> Self {
        Self {
            gnb_cu_ue_f1ap_id,
            gnb_du_ue_f1ap_id,
            sp_cell_id: None,
            cu_to_du_rrc_info: None,
            transmission_action_indicator: None,
            rrc_container: None,
            srbs_to_be_setup_mod: Vec::new(),
            drbs_to_be_setup_mod: Vec::new(),
            drbs_to_be_modified: Vec::new(),
            srbs_to_be_released: Vec::new(),
            drbs_to_be_released: Vec::new(),
            rrc_reconfiguration_complete_indicator: None,
        }
    }
}

/// UE CONTEXT MODIFICATION RESPONSE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextModificationResponse {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub du_to_cu_rrc_info: Option<Bytes>,
    pub drbs_setup_mod: Vec<DrbSetupItem>,
    pub drbs_modified: Vec<DrbSetupItem>,
    pub srbs_setup_mod: Vec<SrbId>,
    pub drbs_failed_to_be_setup_mod: Vec<DrbFailedItem>,
    pub drbs_failed_to_be_modified: Vec<DrbFailedItem>,
}

/// UE CONTEXT MODIFICATION FAILURE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextModificationFailure {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub cause: F1apCause,
    pub criticality_diagnostics: Option<CriticalityDiagnostics>,
}

/// UE CONTEXT MODIFICATION REQUIRED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextModificationRequired {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub du_to_cu_rrc_info: Option<Bytes>,
    pub drbs_required_to_be_released: Vec<DrbId>,
    pub cause: F1apCause,
}

/// UE CONTEXT MODIFICATION CONFIRM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextModificationConfirm {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    /// RRC message the gNB-DU forwards to the UE
    pub rrc_container: Option<Bytes>,
}

/// UE CONTEXT MODIFICATION REFUSE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextModificationRefuse {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub cause: F1apCause,
}
