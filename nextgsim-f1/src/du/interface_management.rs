//! gNB-DU interface management procedures: gNB-DU/gNB-CU Configuration
//! Update, F1 Removal, Reset, Paging and Error Indication

use std::sync::Arc;

use nextgsim_f1ap::procedures::{
    ErrorIndication, F1RemovalRequest, GnbCuConfigurationUpdate,
    GnbCuConfigurationUpdateAcknowledge, GnbCuConfigurationUpdateFailure,
    GnbDuConfigurationUpdate, GnbDuConfigurationUpdateAcknowledge, Paging, Reset,
    ResetAcknowledge, ResetType, UeAssociatedLogicalF1ConnectionItem,
};
use nextgsim_f1ap::{F1apCause, NrCgi, SuccessfulOutcome, UnsuccessfulOutcome};
use tracing::{debug, error, info, warn};

use super::F1apDu;
use crate::error::F1Error;
use crate::interfaces::ProcedureError;
use crate::reset::resolve_reset_items;
use crate::transaction::ProcedureOutcome;
use crate::ue_context::UeIndex;

fn du_reset_item(
    du_ue_id: nextgsim_f1ap::GnbDuUeF1apId,
    cu_ue_id: Option<nextgsim_f1ap::GnbCuUeF1apId>,
) -> UeAssociatedLogicalF1ConnectionItem {
    UeAssociatedLogicalF1ConnectionItem {
        gnb_cu_ue_f1ap_id: cu_ue_id,
        gnb_du_ue_f1ap_id: Some(du_ue_id),
    }
}

impl F1apDu {
    /// Runs a gNB-DU Configuration Update on the common task queue
    pub async fn handle_gnb_du_configuration_update(
        self: &Arc<Self>,
        update: GnbDuConfigurationUpdate,
    ) -> Result<GnbDuConfigurationUpdateAcknowledge, ProcedureError> {
        let this = self.clone();
        self.ctrl_queue
            .run(async move { this.run_gnb_du_configuration_update(update).await })
            .await
            .unwrap_or(Err(F1Error::TaskQueueClosed.into()))
    }

    async fn run_gnb_du_configuration_update(
        &self,
        mut update: GnbDuConfigurationUpdate,
    ) -> Result<GnbDuConfigurationUpdateAcknowledge, ProcedureError> {
        if !self.is_f1_setup() {
            return Err(F1Error::NotSetUp.into());
        }

        let transaction = self.transactions.create(self.cfg.procedure_timeout());
        let Some(transaction_id) = transaction.id() else {
            error!("gNB-DU Configuration Update failed: no transaction ID available");
            return Err(F1Error::TransactionPoolExhausted.into());
        };
        update.transaction_id = transaction_id;
        self.send(update.clone())?;

        match transaction.wait().await {
            ProcedureOutcome::Invalid => Err(F1Error::TransactionPoolExhausted.into()),
            ProcedureOutcome::Aborted(reason) => {
                warn!("gNB-DU Configuration Update got no answer: {:?}", reason);
                Err(ProcedureError::Aborted(reason))
            }
            ProcedureOutcome::Response(Ok(SuccessfulOutcome::GnbDuConfigurationUpdateAcknowledge(
                ack,
            ))) => {
                self.apply_gnb_du_configuration_update(&update, &ack.cells_to_activate);
                info!("gNB-DU Configuration Update acknowledged");
                Ok(ack)
            }
            ProcedureOutcome::Response(Err(
                UnsuccessfulOutcome::GnbDuConfigurationUpdateFailure(failure),
            )) => {
                warn!("gNB-DU Configuration Update failed: cause={}", failure.cause);
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

    fn apply_gnb_du_configuration_update(
        &self,
        update: &GnbDuConfigurationUpdate,
        cells_to_activate: &[nextgsim_f1ap::procedures::CellToActivate],
    ) {
        let mut state = self.state.lock();
        let f1 = &mut state.f1;

        let deleted = |cgi: &NrCgi| update.served_cells_to_delete.contains(cgi);
        f1.served_cells.retain(|cell| !deleted(&cell.nr_cgi));
        f1.active_cells.retain(|cgi| !deleted(cgi));

        for modified in &update.served_cells_to_modify {
            if let Some(cell) = f1
                .served_cells
                .iter_mut()
                .find(|cell| cell.nr_cgi == modified.old_nr_cgi)
            {
                *cell = modified.served_cell_info.clone();
            }
        }
        f1.served_cells
            .extend(update.served_cells_to_add.iter().cloned());

        for cell in cells_to_activate {
            if !f1.active_cells.contains(&cell.nr_cgi) {
                f1.active_cells.push(cell.nr_cgi);
            }
        }
    }

    /// gNB-CU Configuration Update responder
    pub(super) async fn handle_gnb_cu_configuration_update(&self, request: GnbCuConfigurationUpdate) {
        let transaction_id = request.transaction_id;
        let result = self.du_mng.handle_gnb_cu_configuration_update(&request).await;

        let sent = match result {
            Ok(cells_failed_to_activate) => {
                {
                    let mut state = self.state.lock();
                    let f1 = &mut state.f1;
                    f1.active_cells
                        .retain(|cgi| !request.cells_to_deactivate.contains(cgi));
                    for cell in &request.cells_to_activate {
                        let failed = cells_failed_to_activate
                            .iter()
                            .any(|(cgi, _)| *cgi == cell.nr_cgi);
                        if !failed && !f1.active_cells.contains(&cell.nr_cgi) {
                            f1.active_cells.push(cell.nr_cgi);
                        }
                    }
                }
                info!(
                    "gNB-CU Configuration Update applied: failed_cells={}",
                    cells_failed_to_activate.len()
                );
                self.send(GnbCuConfigurationUpdateAcknowledge {
                    transaction_id,
                    cells_failed_to_activate,
                })
            }
            Err(cause) => {
                warn!("gNB-CU Configuration Update rejected: cause={}", cause);
                self.send(GnbCuConfigurationUpdateFailure {
                    transaction_id,
                    cause,
                    time_to_wait: None,
                })
            }
        };
        if let Err(e) = sent {
            warn!("Failed to answer gNB-CU Configuration Update: {}", e);
        }
    }

    /// Runs the F1 Removal procedure. On success the association is closed
    /// and every UE removed.
    pub async fn handle_f1_removal(self: &Arc<Self>) -> Result<(), ProcedureError> {
        let this = self.clone();
        self.ctrl_queue
            .run(async move { this.run_f1_removal().await })
            .await
            .unwrap_or(Err(F1Error::TaskQueueClosed.into()))
    }

    async fn run_f1_removal(self: &Arc<Self>) -> Result<(), ProcedureError> {
        let transaction = self.transactions.create(self.cfg.procedure_timeout());
        let Some(transaction_id) = transaction.id() else {
            error!("F1 Removal failed: no transaction ID available");
            return Err(F1Error::TransactionPoolExhausted.into());
        };
        self.send(F1RemovalRequest { transaction_id })?;

        match transaction.wait().await {
            ProcedureOutcome::Invalid => Err(F1Error::TransactionPoolExhausted.into()),
            ProcedureOutcome::Aborted(reason) => {
                warn!("F1 Removal Request got no answer: {:?}", reason);
                Err(ProcedureError::Aborted(reason))
            }
            ProcedureOutcome::Response(Ok(SuccessfulOutcome::F1RemovalResponse(_))) => {
                info!("F1 Removal accepted, closing F1-C association");
                let connection = self.connection.lock().clone();
                if let Some(connection) = connection {
                    connection.disconnect();
                }
                self.on_connection_lost().await;
                Ok(())
            }
            ProcedureOutcome::Response(Err(UnsuccessfulOutcome::F1RemovalFailure(failure))) => {
                warn!("F1 Removal rejected: cause={}", failure.cause);
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

    /// Reset responder
    pub(super) async fn handle_reset_request(self: &Arc<Self>, request: Reset) {
        info!("Reset received: cause={}", request.cause);

        let (ues, items) = match &request.reset_type {
            ResetType::F1Interface => (self.state.lock().ues.ue_indexes(), Vec::new()),
            ResetType::PartOfF1Interface(requested) => {
                let resolution = resolve_reset_items(
                    &self.state.lock().ues,
                    requested,
                    |item| (item.gnb_du_ue_f1ap_id, item.gnb_cu_ue_f1ap_id),
                    du_reset_item,
                );
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

    /// Runs a Reset towards the gNB-CU. The UE contexts concerned are removed
    /// locally as well.
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
                resolve_reset_items(
                    &self.state.lock().ues,
                    items,
                    |item| (item.gnb_du_ue_f1ap_id, item.gnb_cu_ue_f1ap_id),
                    du_reset_item,
                )
                .ues
            }
        };

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

    pub(super) fn handle_paging(&self, paging: Paging) {
        debug!(
            "Paging received: identity={:?}, cells={}",
            paging.paging_identity,
            paging.paging_cells.len()
        );
        self.du_mng.handle_paging(&paging);
    }

    pub(super) fn handle_error_indication(&self, indication: &ErrorIndication) {
        let ue_index = indication
            .gnb_du_ue_f1ap_id
            .and_then(|id| self.ue_index_by_du_ue_id(id));
        warn!(
            "Error Indication received: cause={:?}, ue={:?}, cu_ue_id={:?}, du_ue_id={:?}",
            indication.cause,
            ue_index,
            indication.gnb_cu_ue_f1ap_id,
            indication.gnb_du_ue_f1ap_id
        );
    }
}
