//! gNB-DU UE context management procedures
//!
//! UE Context Setup and Modification responders, the UE Context Release
//! responder, and the gNB-DU initiated UE Context Release Request and UE
//! Context Modification Required.

use std::sync::Arc;

use bytes::Bytes;
use nextgsim_f1ap::procedures::{
    UeContextModificationConfirm, UeContextModificationFailure, UeContextModificationRequest,
    UeContextModificationRequired, UeContextModificationResponse, UeContextReleaseCommand,
    UeContextReleaseComplete, UeContextReleaseRequest, UeContextSetupFailure,
    UeContextSetupRequest, UeContextSetupResponse,
};
use nextgsim_f1ap::{
    DrbId, F1apCause, MiscCause, RadioNetworkCause, SrbId, SuccessfulOutcome, UeF1apIdPair,
    UnsuccessfulOutcome,
};
use tracing::{debug, error, info, warn};

use super::F1apDu;
use crate::bearer::DeliveryAwait;
use crate::error::F1Error;
use crate::event_source::UeProcedureKind;
use crate::interfaces::ProcedureError;
use crate::transaction::ProcedureOutcome;
use crate::ue_context::UeIndex;

/// Content of a UE Context Modification Required
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuModificationRequired {
    pub du_to_cu_rrc_info: Option<Bytes>,
    pub drbs_required_to_be_released: Vec<DrbId>,
    pub cause: F1apCause,
}

impl F1apDu {
    /// UE Context Setup Request without gNB-DU UE F1AP ID: the UE is created
    /// here. Runs on the common task queue.
    pub(super) async fn handle_ue_creation_request(self: &Arc<Self>, request: UeContextSetupRequest) {
        let cu_ue_id = request.gnb_cu_ue_f1ap_id;

        let owner = self.state.lock().ues.ue_index_by_peer_id(cu_ue_id);
        if let Some(owner) = owner {
            warn!(
                "UE Context Setup Request with gNB-CU UE F1AP ID in use: cu_ue_id={}, ue={}",
                cu_ue_id, owner
            );
            self.send_error_indication(
                UeF1apIdPair {
                    cu: Some(cu_ue_id),
                    du: None,
                },
                F1apCause::RadioNetwork(RadioNetworkCause::UnknownOrAlreadyAllocatedGnbCuUeF1apId),
                None,
            );
            return;
        }

        let Some(ue_index) = self.du_mng.create_ue(&request).await else {
            warn!("UE Context Setup Request: DU manager could not create UE: cu_ue_id={}", cu_ue_id);
            self.send_ue_context_setup_failure(
                &request,
                None,
                F1apCause::RadioNetwork(RadioNetworkCause::NoRadioResourcesAvailable),
            );
            return;
        };

        let created = {
            let mut state = self.state.lock();
            let added = state
                .ues
                .allocate_local_id()
                .ok_or(F1Error::UeIdPoolExhausted)
                .and_then(|du_ue_id| state.ues.add(ue_index, du_ue_id));
            if added.is_ok() {
                state.ues.bind_peer_id(ue_index, cu_ue_id);
                if let Some(ctx) = state.ues.find_mut(ue_index) {
                    ctx.pcell = Some(request.sp_cell_id);
                }
            }
            added
        };

        if let Err(e) = created {
            warn!("UE Context Setup Request: cannot create UE context: ue={}, {}", ue_index, e);
            self.ue_removal.remove_ue(ue_index).await;
            self.send_ue_context_setup_failure(
                &request,
                None,
                F1apCause::Misc(MiscCause::ControlProcessingOverload),
            );
            return;
        }

        info!("UE created by UE Context Setup Request: ue={}, cu_ue_id={}", ue_index, cu_ue_id);
        let this = self.clone();
        self.schedule_ue(ue_index, async move {
            this.handle_ue_context_setup_request(ue_index, request, true)
                .await
        });
    }

    fn send_ue_context_setup_failure(
        &self,
        request: &UeContextSetupRequest,
        du_ue_id: Option<nextgsim_f1ap::GnbDuUeF1apId>,
        cause: F1apCause,
    ) {
        let failure = UeContextSetupFailure {
            gnb_cu_ue_f1ap_id: request.gnb_cu_ue_f1ap_id,
            gnb_du_ue_f1ap_id: du_ue_id,
            cause,
            criticality_diagnostics: None,
        };
        if let Err(e) = self.send(failure) {
            warn!("Failed to send UE Context Setup Failure: {}", e);
        }
    }

    /// Sends an RRC container to the UE over SRB1 and records that a new
    /// configuration is pending
    fn forward_rrc_config(&self, ue_index: UeIndex, container: Bytes) {
        let Some(tracker) = self.srb_tracker(ue_index, SrbId::Srb1) else {
            warn!("Cannot forward RRC container, SRB1 not set up: ue={}", ue_index);
            return;
        };
        tracker.send(container, false);
        if let Some(ctx) = self.state.lock().ues.find_mut(ue_index) {
            ctx.on_rrc_config_forwarded();
        }
    }

    /// UE Context Setup responder. Runs on the UE's task queue.
    pub(super) async fn handle_ue_context_setup_request(
        &self,
        ue_index: UeIndex,
        request: UeContextSetupRequest,
        new_ue: bool,
    ) {
        let Some(du_ue_id) = self.state.lock().ues.find(ue_index).map(|ctx| ctx.local_id) else {
            debug!("UE Context Setup Request for removed UE: ue={}", ue_index);
            return;
        };

        match self.du_mng.setup_ue_context(ue_index, &request).await {
            Ok(result) => {
                for srb_id in &result.srbs_setup {
                    self.add_srb(ue_index, *srb_id);
                }
                if let Some(container) = request.rrc_container.clone() {
                    self.forward_rrc_config(ue_index, container);
                }
                if let Some(ctx) = self.state.lock().ues.find_mut(ue_index) {
                    ctx.c_rnti = result.c_rnti.or(ctx.c_rnti);
                    ctx.pcell = Some(request.sp_cell_id);
                }

                info!(
                    "UE Context Setup done: ue={}, srbs={:?}, drbs={}, drbs_failed={}",
                    ue_index,
                    result.srbs_setup,
                    result.drbs_setup.len(),
                    result.drbs_failed_to_be_setup.len()
                );
                let response = UeContextSetupResponse {
                    gnb_cu_ue_f1ap_id: request.gnb_cu_ue_f1ap_id,
                    gnb_du_ue_f1ap_id: du_ue_id,
                    du_to_cu_rrc_info: result.du_to_cu_rrc_info,
                    c_rnti: result.c_rnti,
                    srbs_setup: result.srbs_setup,
                    drbs_setup: result.drbs_setup,
                    drbs_failed_to_be_setup: result.drbs_failed_to_be_setup,
                };
                if let Err(e) = self.send(response) {
                    warn!("Failed to send UE Context Setup Response: ue={}, {}", ue_index, e);
                }
            }
            Err(cause) => {
                warn!("UE Context Setup failed: ue={}, cause={}", ue_index, cause);
                self.send_ue_context_setup_failure(&request, Some(du_ue_id), cause);
                if new_ue {
                    self.remove_ue_context(ue_index).await;
                }
            }
        }
    }

    /// UE Context Modification responder. Runs on the UE's task queue.
    pub(super) async fn handle_ue_context_modification_request(
        &self,
        ue_index: UeIndex,
        request: UeContextModificationRequest,
    ) {
        if !self.state.lock().ues.contains(ue_index) {
            debug!("UE Context Modification Request for removed UE: ue={}", ue_index);
            return;
        }

        match self.du_mng.modify_ue_context(ue_index, &request).await {
            Ok(result) => {
                for srb_id in &request.srbs_to_be_released {
                    self.remove_srb(ue_index, *srb_id);
                }
                for srb_id in &result.srbs_setup_mod {
                    self.add_srb(ue_index, *srb_id);
                }
                if let Some(container) = request.rrc_container.clone() {
                    self.forward_rrc_config(ue_index, container);
                }

                debug!(
                    "UE Context Modification done: ue={}, drbs_setup={}, drbs_modified={}",
                    ue_index,
                    result.drbs_setup_mod.len(),
                    result.drbs_modified.len()
                );
                let response = UeContextModificationResponse {
                    gnb_cu_ue_f1ap_id: request.gnb_cu_ue_f1ap_id,
                    gnb_du_ue_f1ap_id: request.gnb_du_ue_f1ap_id,
                    du_to_cu_rrc_info: result.du_to_cu_rrc_info,
                    drbs_setup_mod: result.drbs_setup_mod,
                    drbs_modified: result.drbs_modified,
                    srbs_setup_mod: result.srbs_setup_mod,
                    drbs_failed_to_be_setup_mod: result.drbs_failed_to_be_setup_mod,
                    drbs_failed_to_be_modified: result.drbs_failed_to_be_modified,
                };
                if let Err(e) = self.send(response) {
                    warn!("Failed to send UE Context Modification Response: ue={}, {}", ue_index, e);
                }
            }
            Err(cause) => {
                warn!("UE Context Modification failed: ue={}, cause={}", ue_index, cause);
                let failure = UeContextModificationFailure {
                    gnb_cu_ue_f1ap_id: request.gnb_cu_ue_f1ap_id,
                    gnb_du_ue_f1ap_id: request.gnb_du_ue_f1ap_id,
                    cause,
                    criticality_diagnostics: None,
                };
                if let Err(e) = self.send(failure) {
                    warn!("Failed to send UE Context Modification Failure: ue={}, {}", ue_index, e);
                }
            }
        }
    }

    /// UE Context Release responder. Runs on the UE's task queue; the context
    /// was marked for release when the command arrived.
    pub(super) async fn handle_ue_context_release_command(
        self: &Arc<Self>,
        ue_index: UeIndex,
        command: UeContextReleaseCommand,
    ) {
        info!("UE Context Release Command: ue={}, cause={}", ue_index, command.cause);

        self.du_mng.deactivate_ue_drbs(ue_index).await;

        if let Some(container) = command.rrc_container.clone() {
            let srb_id = command.srb_id.unwrap_or(SrbId::Srb1);
            match self.srb_tracker(ue_index, srb_id) {
                Some(tracker) => {
                    let delivered = tracker
                        .send_and_await(
                            container,
                            DeliveryAwait::Delivery,
                            false,
                            self.cfg.rrc_delivery_timeout(),
                        )
                        .await;
                    if !delivered {
                        warn!(
                            "RRC Release delivery not confirmed, releasing anyway: ue={}, srb={}",
                            ue_index, srb_id
                        );
                    }
                }
                None => warn!(
                    "Cannot forward RRC Release, SRB not set up: ue={}, srb={}",
                    ue_index, srb_id
                ),
            }
        }

        let old_ue_removal = command
            .old_gnb_du_ue_f1ap_id
            .and_then(|id| self.ue_index_by_du_ue_id(id))
            .filter(|old| *old != ue_index)
            .map(|old| self.schedule_ue_removal(old));

        let ids = self
            .state
            .lock()
            .ues
            .find(ue_index)
            .map(|ctx| (ctx.local_id, ctx.peer_id()));
        self.remove_ue_context(ue_index).await;
        if let Some(removal) = old_ue_removal {
            removal.await;
        }

        match ids {
            Some((du_ue_id, Some(cu_ue_id)))
                if du_ue_id == command.gnb_du_ue_f1ap_id && cu_ue_id == command.gnb_cu_ue_f1ap_id =>
            {
                let complete = UeContextReleaseComplete {
                    gnb_cu_ue_f1ap_id: cu_ue_id,
                    gnb_du_ue_f1ap_id: du_ue_id,
                    criticality_diagnostics: None,
                };
                if let Err(e) = self.send(complete) {
                    warn!("Failed to send UE Context Release Complete: ue={}, {}", ue_index, e);
                }
            }
            other => error!(
                "UE Context Release: inconsistent UE F1AP IDs, no Release Complete sent: ue={}, local={:?}, command=({}, {})",
                ue_index, other, command.gnb_cu_ue_f1ap_id, command.gnb_du_ue_f1ap_id
            ),
        }
    }

    /// Asks the gNB-CU to release a UE (e.g. radio link failure).
    ///
    /// Returns false when no request was sent: unknown UE, gNB-CU UE F1AP
    /// ID not known yet, release already requested or in progress.
    pub fn handle_ue_context_release_request(&self, ue_index: UeIndex, cause: F1apCause) -> bool {
        let request = {
            let mut state = self.state.lock();
            let Some(ctx) = state.ues.find_mut(ue_index) else {
                warn!("UE Context Release Request for unknown UE: ue={}", ue_index);
                return false;
            };
            if ctx.is_marked_for_release() || ctx.release_requested {
                debug!("UE Context Release already ongoing, ignoring request: ue={}", ue_index);
                return false;
            }
            let Some(cu_ue_id) = ctx.peer_id() else {
                warn!("Cannot request UE Context Release before the gNB-CU UE F1AP ID is known: ue={}", ue_index);
                return false;
            };
            ctx.release_requested = true;
            UeContextReleaseRequest {
                gnb_cu_ue_f1ap_id: cu_ue_id,
                gnb_du_ue_f1ap_id: ctx.local_id,
                cause,
            }
        };

        info!("Requesting UE Context Release: ue={}, cause={}", ue_index, cause);
        match self.send(request) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send UE Context Release Request: ue={}, {}", ue_index, e);
                false
            }
        }
    }

    /// Runs a UE Context Modification Required on the UE's task queue
    pub async fn handle_ue_context_modification_required(
        self: &Arc<Self>,
        ue_index: UeIndex,
        required: DuModificationRequired,
    ) -> Result<UeContextModificationConfirm, ProcedureError> {
        if !self.state.lock().ues.contains(ue_index) {
            return Err(F1Error::UeNotFound(ue_index).into());
        }
        let this = self.clone();
        self.ue_queues
            .executor(ue_index)
            .run(async move { this.run_modification_required(ue_index, required).await })
            .await
            .unwrap_or(Err(F1Error::TaskQueueClosed.into()))
    }

    async fn run_modification_required(
        &self,
        ue_index: UeIndex,
        required: DuModificationRequired,
    ) -> Result<UeContextModificationConfirm, ProcedureError> {
        let msg = {
            let state = self.state.lock();
            let ctx = state.ues.find(ue_index).ok_or(F1Error::UeNotFound(ue_index))?;
            if ctx.is_marked_for_release() {
                return Err(F1Error::UeReleasing(ue_index).into());
            }
            let cu_ue_id = ctx.peer_id().ok_or(F1Error::PeerIdNotBound(ue_index))?;
            UeContextModificationRequired {
                gnb_cu_ue_f1ap_id: cu_ue_id,
                gnb_du_ue_f1ap_id: ctx.local_id,
                du_to_cu_rrc_info: required.du_to_cu_rrc_info,
                drbs_required_to_be_released: required.drbs_required_to_be_released,
                cause: required.cause,
            }
        };

        let subscription = self.ue_events.subscribe(
            ue_index,
            UeProcedureKind::ModificationRequired,
            self.cfg.ue_procedure_timeout(),
        );
        self.send(msg)?;

        match subscription.wait().await {
            ProcedureOutcome::Invalid => Err(F1Error::TaskQueueClosed.into()),
            ProcedureOutcome::Aborted(reason) => {
                warn!("UE Context Modification Required got no answer: ue={}, {:?}", ue_index, reason);
                Err(ProcedureError::Aborted(reason))
            }
            ProcedureOutcome::Response(Ok(SuccessfulOutcome::UeContextModificationConfirm(confirm))) => {
                if let Some(container) = confirm.rrc_container.clone() {
                    self.forward_rrc_config(ue_index, container);
                }
                Ok(confirm)
            }
            ProcedureOutcome::Response(Err(UnsuccessfulOutcome::UeContextModificationRefuse(refuse))) => {
                warn!("UE Context Modification Required refused: ue={}, cause={}", ue_index, refuse.cause);
                Err(ProcedureError::Rejected(refuse.cause))
            }
            ProcedureOutcome::Response(Ok(other)) => Err(ProcedureError::UnexpectedResponse(other.name())),
            ProcedureOutcome::Response(Err(other)) => Err(ProcedureError::UnexpectedResponse(other.name())),
        }
    }
}
