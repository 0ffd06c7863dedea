//! gNB-CU interface management: F1 Setup, gNB-DU/gNB-CU Configuration
//! Update, F1 Removal, Reset, Paging and Error Indication

use std::sync::Arc;

use nextgsim_f1ap::procedures::{
    ErrorIndication, F1RemovalRequest, F1RemovalResponse, F1SetupFailure, F1SetupRequest,
    F1SetupResponse, GnbCuConfigurationUpdate, GnbCuConfigurationUpdateAcknowledge,
    GnbDuConfigurationUpdate, GnbDuConfigurationUpdateAcknowledge,
    GnbDuConfigurationUpdateFailure, Paging, Reset, ResetAcknowledge, ResetType,
    UeAssociatedLogicalF1ConnectionItem,
};
use nextgsim_f1ap::{
    F1apCause, GnbCuUeF1apId, GnbDuUeF1apId, ProtocolCause, SuccessfulOutcome,
    UnsuccessfulOutcome,
};
use tracing::{debug, error, info, warn};

use super::{CuF1Context, F1SetupDecision, F1apCu};
use crate::error::F1Error;
use crate::interfaces::ProcedureError;
use crate::reset::resolve_reset_items;
use crate::transaction::ProcedureOutcome;
use crate::ue_context::UeIndex;

fn cu_reset_item(
    cu_ue_id: GnbCuUeF1apId,
    du_ue_id: Option<GnbDuUeF1apId>,
) -> UeAssociatedLogicalF1ConnectionItem {
    UeAssociatedLogicalF1ConnectionItem {
        gnb_cu_ue_f1ap_id: Some(cu_ue_id),
        gnb_du_ue_f1ap_id: du_ue_id,
    }
}

fn cu_split(
    item: &UeAssociatedLogicalF1ConnectionItem,
) -> (Option<GnbCuUeF1apId>, Option<GnbDuUeF1apId>) {
    (item.gnb_cu_ue_f1ap_id, item.gnb_du_ue_f1ap_id)
}

impl F1apCu {
    /// F1 Setup responder
    pub(super) async fn handle_f1_setup_request(self: &Arc<Self>, request: F1SetupRequest) {
        info!(
            "F1 Setup Request: gnb_du_id={}, gnb_du_name={:?}, cells={}",
            request.gnb_du_id,
            request.gnb_du_name,
            request.served_cells.len()
        );

        if !request.gnb_du_id.is_valid() {
            warn!("F1 Setup Request with invalid gNB-DU ID: {}", request.gnb_du_id);
            self.send_f1_setup_failure(&request, F1apCause::Protocol(ProtocolCause::SemanticError), None);
            return;
        }

        // a repeated F1 Setup starts the interface over
        let previous_ues = {
            let state = self.state.lock();
            if state.f1.f1_setup {
                state.ues.ue_indexes()
            } else {
                Vec::new()
            }
        };
        if !previous_ues.is_empty() {
            info!("F1 Setup on an established interface, removing UEs: count={}", previous_ues.len());
            self.remove_ues(previous_ues).await;
        }

        match self.cu_cp.on_f1_setup_request(&request).await {
            F1SetupDecision::Accept {
                gnb_cu_name,
                cells_to_activate,
                gnb_cu_rrc_version,
            } => {
                self.state.lock().f1 = CuF1Context {
                    gnb_du_id: Some(request.gnb_du_id),
                    gnb_du_name: request.gnb_du_name.clone(),
                    served_cells: request.served_cells.clone(),
                    active_cells: cells_to_activate.iter().map(|cell| cell.nr_cgi).collect(),
                    f1_setup: true,
                };
                info!(
                    "F1 Setup accepted: gnb_du_id={}, active_cells={}",
                    request.gnb_du_id,
                    cells_to_activate.len()
                );
                let response = F1SetupResponse {
                    transaction_id: request.transaction_id,
                    gnb_cu_name,
                    cells_to_activate,
                    gnb_cu_rrc_version,
                };
                if let Err(e) = self.send(response) {
                    warn!("Failed to send F1 Setup Response: {}", e);
                }
            }
            F1SetupDecision::Reject {
                cause,
                time_to_wait,
            } => {
                warn!("F1 Setup rejected: gnb_du_id={}, cause={}", request.gnb_du_id, cause);
                self.state.lock().f1.f1_setup = false;
                self.send_f1_setup_failure(&request, cause, time_to_wait);
            }
        }
    }

    fn send_f1_setup_failure(
        &self,
        request: &F1SetupRequest,
        cause: F1apCause,
        time_to_wait: Option<nextgsim_f1ap::TimeToWait>,
    ) {
        let failure = F1SetupFailure {
            transaction_id: request.transaction_id,
            cause,
            time_to_wait,
            criticality_diagnostics: None,
        };
        if let Err(e) = self.send(failure) {
            warn!("Failed to send F1 Setup Failure: {}", e);
        }
    }

    /// gNB-DU Configuration Update responder
    pub(super) async fn handle_gnb_du_configuration_update(&self, update: GnbDuConfigurationUpdate) {
        let transaction_id = update.transaction_id;
        if !self.is_f1_setup() {
            warn!("gNB-DU Configuration Update before F1 Setup");
            let failure = GnbDuConfigurationUpdateFailure {
                transaction_id,
                cause: F1apCause::Protocol(ProtocolCause::MessageNotCompatibleWithReceiverState),
                time_to_wait: None,
            };
            let _ = self.send(failure);
            return;
        }

        let sent = match self.cu_cp.on_gnb_du_configuration_update(&update).await {
            Ok(cells_to_activate) => {
                {
                    let mut state = self.state.lock();
                    let f1 = &mut state.f1;
                    let deleted = &update.served_cells_to_delete;
                    f1.served_cells.retain(|cell| !deleted.contains(&cell.nr_cgi));
                    f1.active_cells.retain(|cgi| !deleted.contains(cgi));
                    for modified in &update.served_cells_to_modify {
                        f1.served_cells.retain(|cell| cell.nr_cgi != modified.old_nr_cgi);
                        f1.served_cells.push(modified.served_cell_info.clone());
                    }
                    f1.served_cells
                        .extend(update.served_cells_to_add.iter().cloned());
                    for cell in &cells_to_activate {
                        if !f1.active_cells.contains(&cell.nr_cgi) {
                            f1.active_cells.push(cell.nr_cgi);
                        }
                    }
                }
                info!(
                    "gNB-DU Configuration Update acknowledged: added={}, modified={}, deleted={}",
                    update.served_cells_to_add.len(),
                    update.served_cells_to_modify.len(),
                    update.served_cells_to_delete.len()
                );
                self.send(GnbDuConfigurationUpdateAcknowledge {
                    transaction_id,
                    cells_to_activate,
                })
            }
            Err(cause) => {
                warn!("gNB-DU Configuration Update rejected: cause={}", cause);
                self.send(GnbDuConfigurationUpdateFailure {
                    transaction_id,
                    cause,
                    time_to_wait: None,
                })
            }
        };
        if let Err(e) = sent {
            warn!("Failed to answer gNB-DU Configuration Update: {}", e);
        }
    }

    /// Runs a gNB-CU Configuration Update on the common task queue
    pub async fn handle_gnb_cu_configuration_update(
        self: &Arc<Self>,
        update: GnbCuConfigurationUpdate,
    ) -> Result<GnbCuConfigurationUpdateAcknowledge, ProcedureError> {
        let this = self.clone();
        self.ctrl_queue
            .run(async move { this.run_gnb_cu_configuration_update(update).await })
            .await
            .unwrap_or(Err(F1Error::TaskQueueClosed.into()))
    }

    async fn run_gnb_cu_configuration_update(
        &self,
        mut update: GnbCuConfigurationUpdate,
    ) -> Result<GnbCuConfigurationUpdateAcknowledge, ProcedureError> {
        if !self.is_f1_setup() {
            return Err(F1Error::NotSetUp.into());
        }

        let transaction = self.transactions.create(self.cfg.procedure_timeout());
        let Some(transaction_id) = transaction.id() else {
            error!("gNB-CU Configuration Update failed: no transaction ID available");
            return Err(F1Error::TransactionPoolExhausted.into());
        };
        update.transaction_id = transaction_id;
        self.send(update.clone())?;

        match transaction.wait().await {
            ProcedureOutcome::Invalid => Err(F1Error::TransactionPoolExhausted.into()),
            ProcedureOutcome::Aborted(reason) => {
                warn!("gNB-CU Configuration Update got no answer: {:?}", reason);
                Err(ProcedureError::Aborted(reason))
            }
            ProcedureOutcome::Response(Ok(SuccessfulOutcome::GnbCuConfigurationUpdateAcknowledge(
                ack,
            ))) => {
                {
                    let mut state = self.state.lock();
                    let f1 = &mut state.f1;
                    f1.active_cells
                        .retain(|cgi| !update.cells_to_deactivate.contains(cgi));
                    for cell in &update.cells_to_activate {
                        let failed = ack
                            .cells_failed_to_activate
                            .iter()
                            .any(|(cgi, _)| *cgi == cell.nr_cgi);
                        if !failed && !f1.active_cells.contains(&cell.nr_cgi) {
                            f1.active_cells.push(cell.nr_cgi);
                        }
                    }
                }
                info!(
                    "gNB-CU Configuration Update acknowledged: failed_cells={}",
                    ack.cells_failed_to_activate.len()
                );
                Ok(ack)
            }
            ProcedureOutcome::Response(Err(
                UnsuccessfulOutcome::GnbCuConfigurationUpdateFailure(failure),
            )) => {
                warn!("gNB-CU Configuration Update failed: cause={}", failure.cause);
                Err(ProcedureError::Rejected(failure.cause))
            }
            ProcedureOutcome::Response(Ok(other)) => {
                Err(ProcedureError::UnexpectedResponse(other.name()))
            }
            ProcedureOutcome::Response(Err(other)) => {
                Err(ProcedureError::UnexpectedResponse(other.name()))
            }
        }
    }

    /// F1 Removal responder. The association is closed once answered.
    pub(super) async fn handle_f1_removal_request(self: &Arc<Self>, request: F1RemovalRequest) {
        info!("F1 Removal Request received, closing F1-C association");
        let response = F1RemovalResponse {
            transaction_id: request.transaction_id,
        };
        if let Err(e) = self.send(response) {
            warn!("Failed to send F1 Removal Response: {}", e);
        }

        let connection = self.connection.lock().clone();
        if let Some(connection) = connection {
            connection.disconnect();
        }
        self.on_connection_lost().await;
    }

    /// Reset responder
    pub(super) async fn handle_reset_request(self: &Arc<Self>, request: Reset) {
        info!("Reset received: cause={}", request.cause);

        let (ues, items) = match &request.reset_type {
            ResetType::F1Interface => (self.state.lock().ues.ue_indexes(), Vec::new()),
            ResetType::PartOfF1Interface(requested) => {
                let resolution =
                    resolve_reset_items(&self.state.lock().ues, requested, cu_split, cu_reset_item);
                (resolution.ues, resolution.items)
            }
        };

        if !ues.is_empty() {
            debug!("Reset removes UEs: {:?}", ues);
            self.remove_ues(ues).await;
        }

        let ack = ResetAcknowledge {
            transaction_id: request.transaction_id,
            ue_associated_connections: items,
            criticality_diagnostics: None,
        };
        if let Err(e) = self.send(ack) {
            warn!("Failed to send Reset Acknowledge: {}", e);
        }
    }

    /// Runs a Reset towards the gNB-DU and removes the UE contexts concerned
    pub async fn handle_reset(
        self: &Arc<Self>,
        cause: F1apCause,
        reset_type: ResetType,
    ) -> Result<ResetAcknowledge, ProcedureError> {
        let this = self.clone();
        self.ctrl_queue
            .run(async move { this.run_reset(cause, reset_type).await })
            .await
            .unwrap_or(Err(F1Error::TaskQueueClosed.into()))
    }

    async fn run_reset(
        self: &Arc<Self>,
        cause: F1apCause,
        reset_type: ResetType,
    ) -> Result<ResetAcknowledge, ProcedureError> {
        let transaction = self.transactions.create(self.cfg.procedure_timeout());
        let Some(transaction_id) = transaction.id() else {
            error!("Reset failed: no transaction ID available");
            return Err(F1Error::TransactionPoolExhausted.into());
        };

        let ues: Vec<UeIndex> = match &reset_type {
            ResetType::F1Interface => self.state.lock().ues.ue_indexes(),
            ResetType::PartOfF1Interface(items) => {
                resolve_reset_items(&self.state.lock().ues, items, cu_split, cu_reset_item).ues
            }
        };

        info!("Sending Reset: cause={}, ues={}", cause, ues.len());
        self.send(Reset {
            transaction_id,
            cause,
            reset_type,
        })?;
        self.remove_ues(ues).await;

        match transaction.wait().await {
            ProcedureOutcome::Invalid => Err(F1Error::TransactionPoolExhausted.into()),
            ProcedureOutcome::Aborted(reason) => {
                error!("Reset not acknowledged: {:?}", reason);
                Err(ProcedureError::Aborted(reason))
            }
            ProcedureOutcome::Response(Ok(SuccessfulOutcome::ResetAcknowledge(ack))) => Ok(ack),
            ProcedureOutcome::Response(Ok(other)) => {
                Err(ProcedureError::UnexpectedResponse(other.name()))
            }
            ProcedureOutcome::Response(Err(other)) => {
                Err(ProcedureError::UnexpectedResponse(other.name()))
            }
        }
    }

    /// Sends a Paging towards the gNB-DU
    pub fn handle_paging(&self, paging: Paging) -> Result<(), F1Error> {
        if !self.is_f1_setup() {
            return Err(F1Error::NotSetUp);
        }
        debug!(
            "Sending Paging: identity={:?}, cells={}",
            paging.paging_identity,
            paging.paging_cells.len()
        );
        self.send(paging)
    }

    pub(super) fn handle_error_indication(&self, indication: &ErrorIndication) {
        let ue_index = indication
            .gnb_cu_ue_f1ap_id
            .and_then(|id| self.ue_index_by_cu_ue_id(id));
        warn!(
            "Error Indication received: cause={:?}, ue={:?}, cu_ue_id={:?}, du_ue_id={:?}",
            indication.cause,
            ue_index,
            indication.gnb_cu_ue_f1ap_id,
            indication.gnb_du_ue_f1ap_id
        );
    }
}
