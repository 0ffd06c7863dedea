//! UE Context Setup Procedure
//!
//! TS 38.473 Section 8.3.1. Initiated by the gNB-CU to establish the UE
//! context in the gNB-DU, including SRBs and DRBs. Class 1.

use std::net::IpAddr;

use bytes::Bytes;

use crate::cause::F1apCause;
use crate::ids::{DrbId, GnbCuUeF1apId, GnbDuUeF1apId, NrCgi, SrbId};
use crate::procedures::error_indication::CriticalityDiagnostics;

/// RLC mode of a DRB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlcMode {
    Am,
    UmBidirectional,
    UmUnidirectionalUl,
    UmUnidirectionalDl,
}

/// UP Transport Layer Information (GTP tunnel endpoint)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpTransportLayerInfo {
    pub transport_layer_address: IpAddr,
    pub gtp_teid: u32,
}

/// DRB to be setup item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrbToBeSetupItem {
    pub drb_id: DrbId,
    pub rlc_mode: RlcMode,
    /// UL tunnel endpoints at the gNB-CU-UP
    pub ul_up_tnl_info: Vec<UpTransportLayerInfo>,
    /// QoS flow information, opaque to the F1AP layer
    pub qos_info: Bytes,
}

/// DRB setup item returned by the gNB-DU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrbSetupItem {
    pub drb_id: DrbId,
    /// DL tunnel endpoints at the gNB-DU
    pub dl_up_tnl_info: Vec<UpTransportLayerInfo>,
}

/// Bearer that could not be setup or modified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrbFailedItem {
    pub drb_id: DrbId,
    pub cause: Option<F1apCause>,
}

/// UE CONTEXT SETUP REQUEST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextSetupRequest {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    /// Absent when the gNB-CU asks the gNB-DU to create a new UE context
    /// (e.g. inter-DU handover target)
    pub gnb_du_ue_f1ap_id: Option<GnbDuUeF1apId>,
    pub sp_cell_id: NrCgi,
    pub serv_cell_index: u8,
    /// CU to DU RRC Information (CG-ConfigInfo, UE capabilities)
    pub cu_to_du_rrc_info: Bytes,
    pub srbs_to_be_setup: Vec<SrbId>,
    pub drbs_to_be_setup: Vec<DrbToBeSetupItem>,
    /// RRC message to forward to the UE over SRB1 (e.g. Security Mode Command)
    pub rrc_container: Option<Bytes>,
    pub gnb_du_ue_ambr_ul: Option<u64>,
}

/// UE CONTEXT SETUP RESPONSE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextSetupResponse {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    /// DU to CU RRC Information (CellGroupConfig)
    pub du_to_cu_rrc_info: Bytes,
    /// C-RNTI allocated by the gNB-DU for a newly created UE context
    pub c_rnti: Option<u16>,
    pub srbs_setup: Vec<SrbId>,
    pub drbs_setup: Vec<DrbSetupItem>,
    pub drbs_failed_to_be_setup: Vec<DrbFailedItem>,
}

/// UE CONTEXT SETUP FAILURE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextSetupFailure {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: Option<GnbDuUeF1apId>,
    pub cause: F1apCause,
    pub criticality_diagnostics: Option<CriticalityDiagnostics>,
}
