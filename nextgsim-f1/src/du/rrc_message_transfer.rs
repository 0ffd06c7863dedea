//! gNB-DU RRC Message Transfer procedures and SRB delivery tracking

use std::sync::Arc;

use bytes::Bytes;
use nextgsim_common::logging::HexDump;
use nextgsim_f1ap::procedures::{
    DlRrcMessageTransfer, InitialUlRrcMessageTransfer, RrcDeliveryReport, RrcDeliveryStatus,
    UlRrcMessageTransfer,
};
use nextgsim_f1ap::{GnbDuUeF1apId, NrCgi, SrbId};
use tracing::{debug, info, trace, warn};

use super::F1apDu;
use crate::bearer::{DeliveryAwait, SrbDeliveryTracker};
use crate::error::F1Error;
use crate::executor::TaskExecutor;
use crate::ue_context::UeIndex;

/// A UE's first RRC message, received on SRB0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuInitialUlRrcMessage {
    pub ue_index: UeIndex,
    pub nr_cgi: NrCgi,
    pub c_rnti: u16,
    /// CCCH message
    pub rrc_container: Bytes,
    /// CellGroupConfig of the UE
    pub du_to_cu_rrc_container: Option<Bytes>,
}

impl F1apDu {
    /// Creates the UE context and sends the Initial UL RRC Message Transfer.
    ///
    /// Returns the allocated gNB-DU UE F1AP ID. On failure no context is
    /// left behind.
    pub fn handle_initial_ul_rrc_message(
        &self,
        msg: DuInitialUlRrcMessage,
    ) -> Result<GnbDuUeF1apId, F1Error> {
        if !self.is_connected() {
            return Err(F1Error::NotConnected);
        }

        let du_ue_id = {
            let mut state = self.state.lock();
            if !state.f1.f1_setup {
                return Err(F1Error::NotSetUp);
            }
            if state.ues.contains(msg.ue_index) {
                return Err(F1Error::UeAlreadyExists(msg.ue_index));
            }
            let Some(du_ue_id) = state.ues.allocate_local_id() else {
                warn!("Initial UL RRC Message dropped, no gNB-DU UE F1AP ID available: ue={}", msg.ue_index);
                return Err(F1Error::UeIdPoolExhausted);
            };
            state.ues.add(msg.ue_index, du_ue_id)?;
            if let Some(ctx) = state.ues.find_mut(msg.ue_index) {
                ctx.c_rnti = Some(msg.c_rnti);
                ctx.pcell = Some(msg.nr_cgi);
            }
            du_ue_id
        };

        self.add_srb(msg.ue_index, SrbId::Srb0);
        self.add_srb(msg.ue_index, SrbId::Srb1);

        trace!("Initial UL RRC container: {}", HexDump(&msg.rrc_container));
        let sent = self.send(InitialUlRrcMessageTransfer {
            gnb_du_ue_f1ap_id: du_ue_id,
            nr_cgi: msg.nr_cgi,
            c_rnti: msg.c_rnti,
            rrc_container: msg.rrc_container,
            du_to_cu_rrc_container: msg.du_to_cu_rrc_container,
        });

        if let Err(e) = sent {
            let mut state = self.state.lock();
            state.srbs.remove(&msg.ue_index);
            state.ues.remove(msg.ue_index);
            return Err(e);
        }

        info!(
            "UE created: ue={}, du_ue_id={}, c_rnti={:#06x}",
            msg.ue_index, du_ue_id, msg.c_rnti
        );
        Ok(du_ue_id)
    }

    /// Sends an UL RRC message received on an SRB
    pub fn handle_ul_rrc_message(
        &self,
        ue_index: UeIndex,
        srb_id: SrbId,
        pdu: Bytes,
    ) -> Result<(), F1Error> {
        let msg = {
            let mut state = self.state.lock();
            let ctx = state
                .ues
                .find_mut(ue_index)
                .ok_or(F1Error::UeNotFound(ue_index))?;
            let cu_ue_id = ctx.peer_id().ok_or(F1Error::PeerIdNotBound(ue_index))?;
            if srb_id == SrbId::Srb1 {
                ctx.on_ul_srb1_message();
            }
            UlRrcMessageTransfer {
                gnb_cu_ue_f1ap_id: cu_ue_id,
                gnb_du_ue_f1ap_id: ctx.local_id,
                srb_id,
                rrc_container: pdu,
                new_gnb_du_ue_f1ap_id: None,
            }
        };
        self.send(msg)
    }

    /// Watermark report of the lower layers for an SRB
    pub fn handle_srb_notification(
        &self,
        ue_index: UeIndex,
        srb_id: SrbId,
        kind: DeliveryAwait,
        highest_sn: u32,
    ) -> bool {
        match self.srb_tracker(ue_index, srb_id) {
            Some(tracker) => tracker.notify(kind, highest_sn),
            None => {
                debug!("Discarding SRB notification: ue={}, srb={}", ue_index, srb_id);
                false
            }
        }
    }

    pub(super) fn srb_tracker(
        &self,
        ue_index: UeIndex,
        srb_id: SrbId,
    ) -> Option<Arc<SrbDeliveryTracker>> {
        self.state
            .lock()
            .srbs
            .get(&ue_index)
            .and_then(|srbs| srbs.get(&srb_id))
            .cloned()
    }

    pub fn has_srb(&self, ue_index: UeIndex, srb_id: SrbId) -> bool {
        self.srb_tracker(ue_index, srb_id).is_some()
    }

    /// Sets up the delivery tracker of an SRB, if the lower layers have it
    pub(super) fn add_srb(&self, ue_index: UeIndex, srb_id: SrbId) -> bool {
        if self.srb_tracker(ue_index, srb_id).is_some() {
            return true;
        }
        let Some(sink) = self.du_mng.srb_tx_sink(ue_index, srb_id) else {
            warn!("No lower-layer bearer for SRB: ue={}, srb={}", ue_index, srb_id);
            return false;
        };

        let owner: Arc<dyn TaskExecutor> = Arc::new(self.srb_queue.clone());
        let tracker = Arc::new(SrbDeliveryTracker::new(
            ue_index,
            srb_id,
            sink,
            self.delivery_reporter.clone(),
            owner,
        ));

        let mut state = self.state.lock();
        if !state.ues.contains(ue_index) {
            return false;
        }
        state.srbs.entry(ue_index).or_default().insert(srb_id, tracker);
        true
    }

    pub(super) fn remove_srb(&self, ue_index: UeIndex, srb_id: SrbId) {
        if let Some(srbs) = self.state.lock().srbs.get_mut(&ue_index) {
            srbs.remove(&srb_id);
        }
    }

    /// DL RRC Message Transfer. Runs on the UE's task queue.
    pub(super) fn handle_dl_rrc_message_transfer(&self, ue_index: UeIndex, msg: DlRrcMessageTransfer) {
        if let Some(old_du_ue_id) = msg.old_gnb_du_ue_f1ap_id {
            match self.ue_index_by_du_ue_id(old_du_ue_id) {
                Some(old_ue_index) if old_ue_index != ue_index => {
                    info!(
                        "UE reestablishment: ue={}, old_ue={}, old_du_ue_id={}",
                        ue_index, old_ue_index, old_du_ue_id
                    );
                    self.du_mng.handle_ue_reestablishment(ue_index, old_ue_index);
                }
                _ => warn!(
                    "DL RRC Message Transfer with unknown old gNB-DU UE F1AP ID: ue={}, old_du_ue_id={}",
                    ue_index, old_du_ue_id
                ),
            }
        }

        let Some(tracker) = self.srb_tracker(ue_index, msg.srb_id) else {
            warn!(
                "Discarding DL RRC Message Transfer, SRB not set up: ue={}, srb={}",
                ue_index, msg.srb_id
            );
            return;
        };

        let sn = tracker.send(msg.rrc_container, msg.rrc_delivery_status_request);
        if msg.rrc_delivery_status_request && sn.is_none() {
            warn!(
                "RRC delivery status requested for a PDU without PDCP SN: ue={}, srb={}",
                ue_index, msg.srb_id
            );
        }
        trace!("DL RRC message forwarded: ue={}, srb={}, sn={:?}", ue_index, msg.srb_id, sn);
    }

    pub(super) fn send_rrc_delivery_report(
        &self,
        ue_index: UeIndex,
        srb_id: SrbId,
        status: RrcDeliveryStatus,
    ) {
        let ids = self
            .state
            .lock()
            .ues
            .find(ue_index)
            .and_then(|ctx| ctx.peer_id().map(|cu_ue_id| (cu_ue_id, ctx.local_id)));
        let Some((cu_ue_id, du_ue_id)) = ids else {
            debug!("Discarding RRC Delivery Report of unknown UE: ue={}", ue_index);
            return;
        };

        let report = RrcDeliveryReport {
            gnb_cu_ue_f1ap_id: cu_ue_id,
            gnb_du_ue_f1ap_id: du_ue_id,
            rrc_delivery_status: status,
            srb_id,
        };
        if let Err(e) = self.send(report) {
            warn!("Failed to send RRC Delivery Report: ue={}, {}", ue_index, e);
        }
    }
}
