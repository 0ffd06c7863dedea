//! gNB-DU collaborators

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nextgsim_f1ap::procedures::{
    DrbFailedItem, DrbSetupItem, GnbCuConfigurationUpdate, Paging, UeContextModificationRequest,
    UeContextSetupRequest,
};
use nextgsim_f1ap::{F1apCause, NrCgi, SrbId};

use crate::bearer::BearerTxSink;
use crate::ue_context::UeIndex;

/// Resources the DU manager set up for a UE Context Setup Request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuUeContextSetupResult {
    /// CellGroupConfig for the gNB-CU
    pub du_to_cu_rrc_info: Bytes,
    pub c_rnti: Option<u16>,
    pub srbs_setup: Vec<SrbId>,
    pub drbs_setup: Vec<DrbSetupItem>,
    pub drbs_failed_to_be_setup: Vec<DrbFailedItem>,
}

/// Resources the DU manager changed for a UE Context Modification Request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuUeContextModResult {
    pub du_to_cu_rrc_info: Option<Bytes>,
    pub srbs_setup_mod: Vec<SrbId>,
    pub drbs_setup_mod: Vec<DrbSetupItem>,
    pub drbs_modified: Vec<DrbSetupItem>,
    pub drbs_failed_to_be_setup_mod: Vec<DrbFailedItem>,
    pub drbs_failed_to_be_modified: Vec<DrbFailedItem>,
}

/// DU manager: owns the radio resources the F1AP procedures ask for.
///
/// Every decision on cells, bearers and QoS is taken here; the F1AP engine
/// only carries requests and answers.
#[async_trait]
pub trait F1apDuManager: Send + Sync {
    /// Lower-layer sink of an SRB, `None` if the bearer does not exist
    fn srb_tx_sink(&self, ue_index: UeIndex, srb_id: SrbId) -> Option<Arc<dyn BearerTxSink>>;

    /// Creates a UE for a UE Context Setup Request that carries no gNB-DU UE
    /// F1AP ID (e.g. handover into this gNB-DU)
    async fn create_ue(&self, request: &UeContextSetupRequest) -> Option<UeIndex>;

    async fn setup_ue_context(
        &self,
        ue_index: UeIndex,
        request: &UeContextSetupRequest,
    ) -> Result<DuUeContextSetupResult, F1apCause>;

    async fn modify_ue_context(
        &self,
        ue_index: UeIndex,
        request: &UeContextModificationRequest,
    ) -> Result<DuUeContextModResult, F1apCause>;

    /// Stops scheduling and forwarding on the UE's DRBs; returns once they
    /// are quiescent
    async fn deactivate_ue_drbs(&self, ue_index: UeIndex);

    /// Applies a gNB-CU Configuration Update. Returns the cells that could not
    /// be activated.
    async fn handle_gnb_cu_configuration_update(
        &self,
        request: &GnbCuConfigurationUpdate,
    ) -> Result<Vec<(NrCgi, F1apCause)>, F1apCause>;

    fn handle_paging(&self, paging: &Paging);

    /// A DL RRC Message Transfer identified `old_ue_index` as the context the
    /// UE reestablished from
    fn handle_ue_reestablishment(&self, ue_index: UeIndex, old_ue_index: UeIndex);
}
