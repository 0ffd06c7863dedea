//! gNB-CU RRC Message Transfer procedures

use std::sync::Arc;

use bytes::Bytes;
use nextgsim_common::logging::HexDump;
use nextgsim_f1ap::procedures::{
    DlRrcMessageTransfer, InitialUlRrcMessageTransfer, RrcDeliveryReport, UlRrcMessageTransfer,
};
use nextgsim_f1ap::{
    F1apCause, ProcedureCode, RadioNetworkCause, SrbId, TriggeringMessage, UeF1apIdPair,
};
use tracing::{debug, info, trace, warn};

use super::F1apCu;
use crate::error::F1Error;
use crate::ue_context::UeIndex;

impl F1apCu {
    /// Initial UL RRC Message Transfer: creates the UE. Runs on the common
    /// task queue.
    pub(super) async fn handle_initial_ul_rrc_message(
        self: &Arc<Self>,
        msg: InitialUlRrcMessageTransfer,
    ) {
        let du_ue_id = msg.gnb_du_ue_f1ap_id;
        if !self.is_f1_setup() {
            warn!("Initial UL RRC Message Transfer before F1 Setup: du_ue_id={}", du_ue_id);
            return;
        }

        let owner = self.state.lock().ues.ue_index_by_peer_id(du_ue_id);
        if let Some(owner) = owner {
            warn!(
                "Initial UL RRC Message Transfer with gNB-DU UE F1AP ID in use: du_ue_id={}, ue={}",
                du_ue_id, owner
            );
            self.send_error_indication(
                UeF1apIdPair {
                    cu: None,
                    du: Some(du_ue_id),
                },
                F1apCause::RadioNetwork(RadioNetworkCause::UnknownOrAlreadyAllocatedGnbDuUeF1apId),
                Some((
                    ProcedureCode::InitialUlRrcMessageTransfer,
                    TriggeringMessage::InitiatingMessage,
                )),
            );
            return;
        }

        let Some(ue_index) = self.cu_cp.on_ue_creation_request(&msg) else {
            info!("CU-CP refused UE creation: du_ue_id={}, c_rnti={:#06x}", du_ue_id, msg.c_rnti);
            return;
        };

        let created = {
            let mut state = self.state.lock();
            let added = state
                .ues
                .allocate_local_id()
                .ok_or(F1Error::UeIdPoolExhausted)
                .and_then(|cu_ue_id| state.ues.add(ue_index, cu_ue_id).map(|_| cu_ue_id));
            if added.is_ok() {
                state.ues.bind_peer_id(ue_index, du_ue_id);
                if let Some(ctx) = state.ues.find_mut(ue_index) {
                    ctx.c_rnti = Some(msg.c_rnti);
                    ctx.pcell = Some(msg.nr_cgi);
                }
            }
            added
        };

        let cu_ue_id = match created {
            Ok(cu_ue_id) => cu_ue_id,
            Err(e) => {
                warn!("Cannot create UE context: ue={}, du_ue_id={}, {}", ue_index, du_ue_id, e);
                self.ue_removal.remove_ue(ue_index).await;
                return;
            }
        };

        info!(
            "UE created: ue={}, cu_ue_id={}, du_ue_id={}, c_rnti={:#06x}",
            ue_index, cu_ue_id, du_ue_id, msg.c_rnti
        );
        trace!("Initial UL RRC container: {}", HexDump(&msg.rrc_container));
        self.cu_cp
            .on_ul_rrc_message(ue_index, SrbId::Srb0, msg.rrc_container);
    }

    pub(super) fn handle_ul_rrc_message_transfer(&self, ue_index: UeIndex, msg: UlRrcMessageTransfer) {
        if let Some(new_du_ue_id) = msg.new_gnb_du_ue_f1ap_id {
            let rebound = self.state.lock().ues.rebind_peer_id(ue_index, new_du_ue_id);
            if rebound {
                info!(
                    "gNB-DU UE F1AP ID changed: ue={}, old={}, new={}",
                    ue_index, msg.gnb_du_ue_f1ap_id, new_du_ue_id
                );
            } else {
                warn!(
                    "Cannot rebind gNB-DU UE F1AP ID, already in use: ue={}, new={}",
                    ue_index, new_du_ue_id
                );
            }
        }
        trace!("UL RRC message: ue={}, srb={}, len={}", ue_index, msg.srb_id, msg.rrc_container.len());
        self.cu_cp
            .on_ul_rrc_message(ue_index, msg.srb_id, msg.rrc_container);
    }

    pub(super) fn handle_rrc_delivery_report(&self, ue_index: UeIndex, report: &RrcDeliveryReport) {
        debug!(
            "RRC Delivery Report: ue={}, srb={}, delivered={}",
            ue_index, report.srb_id, report.rrc_delivery_status.delivery_status
        );
        self.cu_cp.on_rrc_delivery_report(ue_index, report);
    }

    /// Sends an RRC message to the UE.
    ///
    /// A pending old gNB-DU UE F1AP ID (reestablishment) is relayed with the
    /// first DL message and then cleared.
    pub fn handle_dl_rrc_message_transfer(
        &self,
        ue_index: UeIndex,
        srb_id: SrbId,
        rrc_container: Bytes,
        rrc_delivery_status_request: bool,
    ) -> Result<(), F1Error> {
        let msg = {
            let mut state = self.state.lock();
            let ctx = state
                .ues
                .find_mut(ue_index)
                .ok_or(F1Error::UeNotFound(ue_index))?;
            let du_ue_id = ctx.peer_id().ok_or(F1Error::PeerIdNotBound(ue_index))?;
            DlRrcMessageTransfer {
                gnb_cu_ue_f1ap_id: ctx.local_id,
                gnb_du_ue_f1ap_id: du_ue_id,
                old_gnb_du_ue_f1ap_id: ctx.take_pending_peer_id(),
                srb_id,
                rrc_container,
                rrc_delivery_status_request,
            }
        };
        self.send(msg)
    }

    /// The UE reestablished its connection on a new context: the gNB-DU UE
    /// F1AP ID of the old context is relayed with the next DL RRC message.
    pub fn handle_ue_reestablishment(&self, ue_index: UeIndex, old_ue_index: UeIndex) -> bool {
        let mut state = self.state.lock();
        let Some(old_du_ue_id) = state.ues.find(old_ue_index).and_then(|ctx| ctx.peer_id()) else {
            warn!("Reestablishment from unknown UE: ue={}, old_ue={}", ue_index, old_ue_index);
            return false;
        };
        match state.ues.find_mut(ue_index) {
            Some(ctx) => {
                info!(
                    "UE reestablishment: ue={}, old_ue={}, old_du_ue_id={}",
                    ue_index, old_ue_index, old_du_ue_id
                );
                ctx.pending_peer_id_to_relay = Some(old_du_ue_id);
                true
            }
            None => false,
        }
    }
}
