//! Collaborator interfaces of the gNB-CU F1AP engine

use async_trait::async_trait;
use bytes::Bytes;
use nextgsim_f1ap::procedures::{
    CellToActivate, DrbToBeSetupItem, F1SetupRequest, GnbDuConfigurationUpdate,
    InitialUlRrcMessageTransfer, RrcDeliveryReport, UeContextModificationRequired,
};
use nextgsim_f1ap::{F1apCause, NrCgi, SrbId, TimeToWait};

use crate::ue_context::UeIndex;

/// Answer of the CU-CP to an F1 Setup Request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum F1SetupDecision {
    Accept {
        gnb_cu_name: Option<String>,
        cells_to_activate: Vec<CellToActivate>,
        gnb_cu_rrc_version: (u8, u8, u8),
    },
    Reject {
        cause: F1apCause,
        time_to_wait: Option<TimeToWait>,
    },
}

/// UE Context Setup requested by the CU-CP.
///
/// If `ue_index` has no F1AP context yet, one is created and the gNB-DU is
/// asked to create the UE (no gNB-DU UE F1AP ID in the request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuUeContextSetupRequest {
    pub ue_index: UeIndex,
    pub sp_cell_id: NrCgi,
    pub serv_cell_index: u8,
    pub cu_to_du_rrc_info: Bytes,
    pub srbs_to_be_setup: Vec<SrbId>,
    pub drbs_to_be_setup: Vec<DrbToBeSetupItem>,
    pub rrc_container: Option<Bytes>,
    pub gnb_du_ue_ambr_ul: Option<u64>,
}

/// CU-CP side of the gNB-CU F1AP engine
#[async_trait]
pub trait F1apCuCpNotifier: Send + Sync {
    async fn on_f1_setup_request(&self, request: &F1SetupRequest) -> F1SetupDecision;

    /// Returns the cells to activate, or the cause of a rejection
    async fn on_gnb_du_configuration_update(
        &self,
        update: &GnbDuConfigurationUpdate,
    ) -> Result<Vec<CellToActivate>, F1apCause>;

    /// A UE accessed the gNB-DU. Returns the index of the new UE, or None to
    /// drop the message.
    fn on_ue_creation_request(&self, msg: &InitialUlRrcMessageTransfer) -> Option<UeIndex>;

    /// RRC message received from the UE
    fn on_ul_rrc_message(&self, ue_index: UeIndex, srb_id: SrbId, pdu: Bytes);

    fn on_rrc_delivery_report(&self, ue_index: UeIndex, report: &RrcDeliveryReport);

    /// The gNB-DU asks for the release of a UE
    fn on_ue_context_release_request(&self, ue_index: UeIndex, cause: F1apCause);

    /// Returns the RRC container of the Confirm, or the cause of the Refuse
    async fn on_ue_context_modification_required(
        &self,
        ue_index: UeIndex,
        required: &UeContextModificationRequired,
    ) -> Result<Option<Bytes>, F1apCause>;

    /// The F1-C association went away (loss or F1 Removal)
    fn on_du_disconnected(&self) {}
}
