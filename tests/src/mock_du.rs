//! Recording gNB-DU collaborators
//!
//! `MockDuManager` hands out one `RecordingSink` per SRB and answers the UE
//! context procedures with scriptable results.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nextgsim_f1::{
    BearerTxSink, DuUeContextModResult, DuUeContextSetupResult, F1apDuManager, UeIndex,
    UeRemovalHandler,
};
use nextgsim_f1ap::procedures::{
    GnbCuConfigurationUpdate, Paging, UeContextModificationRequest, UeContextSetupRequest,
};
use nextgsim_f1ap::{F1apCause, NrCgi, SrbId};
use parking_lot::Mutex;

/// Lower-layer SRB entity recording the PDUs it is given
#[derive(Default)]
pub struct RecordingSink {
    pdus: Mutex<Vec<Bytes>>,
}

impl RecordingSink {
    pub fn pdus(&self) -> Vec<Bytes> {
        self.pdus.lock().clone()
    }
}

impl BearerTxSink for RecordingSink {
    fn on_new_pdu(&self, pdu: Bytes) {
        self.pdus.lock().push(pdu);
    }
}

pub struct MockDuManager {
    sinks: Mutex<HashMap<(UeIndex, SrbId), Arc<RecordingSink>>>,
    next_ue_index: AtomicU32,
    pub setup_result: Mutex<Result<DuUeContextSetupResult, F1apCause>>,
    pub mod_result: Mutex<Result<DuUeContextModResult, F1apCause>>,
    /// Refuse UE creation for UE Context Setup without gNB-DU UE F1AP ID
    pub refuse_ue_creation: Mutex<bool>,
    pub deactivated: Mutex<Vec<UeIndex>>,
    pub pagings: Mutex<Vec<Paging>>,
    pub reestablishments: Mutex<Vec<(UeIndex, UeIndex)>>,
    pub cu_config_updates: Mutex<Vec<GnbCuConfigurationUpdate>>,
}

impl Default for MockDuManager {
    fn default() -> Self {
        Self {
            sinks: Mutex::new(HashMap::new()),
            next_ue_index: AtomicU32::new(100),
            setup_result: Mutex::new(Ok(DuUeContextSetupResult {
                du_to_cu_rrc_info: Bytes::from_static(b"cell-group-config"),
                c_rnti: Some(0x4601),
                srbs_setup: vec![SrbId::Srb2],
                ..Default::default()
            })),
            mod_result: Mutex::new(Ok(DuUeContextModResult::default())),
            refuse_ue_creation: Mutex::new(false),
            deactivated: Mutex::new(Vec::new()),
            pagings: Mutex::new(Vec::new()),
            reestablishments: Mutex::new(Vec::new()),
            cu_config_updates: Mutex::new(Vec::new()),
        }
    }
}

impl MockDuManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sink of an SRB, if the engine asked for it
    pub fn sink(&self, ue_index: UeIndex, srb_id: SrbId) -> Option<Arc<RecordingSink>> {
        self.sinks.lock().get(&(ue_index, srb_id)).cloned()
    }

    /// PDUs sent on an SRB so far
    pub fn sent_pdus(&self, ue_index: UeIndex, srb_id: SrbId) -> Vec<Bytes> {
        self.sink(ue_index, srb_id)
            .map(|sink| sink.pdus())
            .unwrap_or_default()
    }
}

#[async_trait]
impl F1apDuManager for MockDuManager {
    fn srb_tx_sink(&self, ue_index: UeIndex, srb_id: SrbId) -> Option<Arc<dyn BearerTxSink>> {
        let sink = self
            .sinks
            .lock()
            .entry((ue_index, srb_id))
            .or_default()
            .clone();
        Some(sink)
    }

    async fn create_ue(&self, _request: &UeContextSetupRequest) -> Option<UeIndex> {
        if *self.refuse_ue_creation.lock() {
            return None;
        }
        Some(UeIndex(self.next_ue_index.fetch_add(1, Ordering::SeqCst)))
    }

    async fn setup_ue_context(
        &self,
        _ue_index: UeIndex,
        _request: &UeContextSetupRequest,
    ) -> Result<DuUeContextSetupResult, F1apCause> {
        self.setup_result.lock().clone()
    }

    async fn modify_ue_context(
        &self,
        _ue_index: UeIndex,
        _request: &UeContextModificationRequest,
    ) -> Result<DuUeContextModResult, F1apCause> {
        self.mod_result.lock().clone()
    }

    async fn deactivate_ue_drbs(&self, ue_index: UeIndex) {
        self.deactivated.lock().push(ue_index);
    }

    async fn handle_gnb_cu_configuration_update(
        &self,
        request: &GnbCuConfigurationUpdate,
    ) -> Result<Vec<(NrCgi, F1apCause)>, F1apCause> {
        self.cu_config_updates.lock().push(request.clone());
        Ok(Vec::new())
    }

    fn handle_paging(&self, paging: &Paging) {
        self.pagings.lock().push(paging.clone());
    }

    fn handle_ue_reestablishment(&self, ue_index: UeIndex, old_ue_index: UeIndex) {
        self.reestablishments.lock().push((ue_index, old_ue_index));
    }
}

/// UE removal handler recording the removed UEs, used on both sides
#[derive(Default)]
pub struct RecordingUeRemoval {
    removed: Mutex<Vec<UeIndex>>,
}

impl RecordingUeRemoval {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn removed(&self) -> Vec<UeIndex> {
        self.removed.lock().clone()
    }

    pub fn was_removed(&self, ue_index: UeIndex) -> bool {
        self.removed.lock().contains(&ue_index)
    }
}

#[async_trait]
impl UeRemovalHandler for RecordingUeRemoval {
    async fn remove_ue(&self, ue_index: UeIndex) {
        self.removed.lock().push(ue_index);
    }
}
