//! gNB-CU UE context management procedures
//!
//! UE Context Setup, Modification and Release initiators, and the responders
//! for the gNB-DU initiated UE Context Release Request and UE Context
//! Modification Required.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use nextgsim_f1ap::procedures::{
    UeContextModificationConfirm, UeContextModificationRefuse, UeContextModificationRequest,
    UeContextModificationRequired, UeContextModificationResponse, UeContextReleaseCommand,
    UeContextSetupRequest, UeContextSetupResponse,
};
use nextgsim_f1ap::{F1apCause, SrbId, SuccessfulOutcome, UnsuccessfulOutcome};
use tracing::{debug, error, info, warn};

use super::{CuUeContextSetupRequest, F1apCu};
use crate::error::F1Error;
use crate::event_source::UeProcedureKind;
use crate::interfaces::ProcedureError;
use crate::transaction::ProcedureOutcome;
use crate::ue_context::UeIndex;

impl F1apCu {
    /// Runs a UE Context Setup on the UE's task queue.
    ///
    /// A UE without F1AP context gets one here, and loses it again if the
    /// gNB-DU does not set the UE up.
    pub async fn handle_ue_context_setup(
        self: &Arc<Self>,
        request: CuUeContextSetupRequest,
    ) -> Result<UeContextSetupResponse, ProcedureError> {
        if !self.is_f1_setup() {
            return Err(F1Error::NotSetUp.into());
        }
        let ue_index = request.ue_index;

        let (msg, new_ue) = {
            let mut state = self.state.lock();
            let (cu_ue_id, du_ue_id, new_ue) = match state.ues.find(ue_index) {
                Some(ctx) if ctx.is_marked_for_release() => {
                    return Err(F1Error::UeReleasing(ue_index).into())
                }
                Some(ctx) => {
                    let du_ue_id = ctx.peer_id().ok_or(F1Error::PeerIdNotBound(ue_index))?;
                    (ctx.local_id, Some(du_ue_id), false)
                }
                None => {
                    let cu_ue_id = state
                        .ues
                        .allocate_local_id()
                        .ok_or(F1Error::UeIdPoolExhausted)?;
                    state.ues.add(ue_index, cu_ue_id)?;
                    if let Some(ctx) = state.ues.find_mut(ue_index) {
                        ctx.pcell = Some(request.sp_cell_id);
                    }
                    (cu_ue_id, None, true)
                }
            };
            let msg = UeContextSetupRequest {
                gnb_cu_ue_f1ap_id: cu_ue_id,
                gnb_du_ue_f1ap_id: du_ue_id,
                sp_cell_id: request.sp_cell_id,
                serv_cell_index: request.serv_cell_index,
                cu_to_du_rrc_info: request.cu_to_du_rrc_info,
                srbs_to_be_setup: request.srbs_to_be_setup,
                drbs_to_be_setup: request.drbs_to_be_setup,
                rrc_container: request.rrc_container,
                gnb_du_ue_ambr_ul: request.gnb_du_ue_ambr_ul,
            };
            (msg, new_ue)
        };

        if new_ue {
            info!("UE context created for UE Context Setup: ue={}, cu_ue_id={}", ue_index, msg.gnb_cu_ue_f1ap_id);
        }
        let this = self.clone();
        let result = self
            .ue_queues
            .executor(ue_index)
            .run(async move { this.run_ue_context_setup(ue_index, msg, new_ue).await })
            .await;
        match result {
            Some(result) => result,
            None => {
                warn!("UE Context Setup not run, UE task queue closed: ue={}", ue_index);
                if new_ue {
                    self.remove_ue_context(ue_index).await;
                }
                Err(F1Error::TaskQueueClosed.into())
            }
        }
    }

    async fn run_ue_context_setup(
        &self,
        ue_index: UeIndex,
        msg: UeContextSetupRequest,
        new_ue: bool,
    ) -> Result<UeContextSetupResponse, ProcedureError> {
        let subscription = self.ue_events.subscribe(
            ue_index,
            UeProcedureKind::ContextSetup,
            self.cfg.ue_procedure_timeout(),
        );

        let result = match self.send(msg) {
            Err(e) => Err(e.into()),
            Ok(()) => match subscription.wait().await {
                ProcedureOutcome::Invalid => Err(F1Error::TaskQueueClosed.into()),
                ProcedureOutcome::Aborted(reason) => {
                    warn!("UE Context Setup got no answer: ue={}, {:?}", ue_index, reason);
                    Err(ProcedureError::Aborted(reason))
                }
                ProcedureOutcome::Response(Ok(SuccessfulOutcome::UeContextSetupResponse(response))) => {
                    Ok(response)
                }
                ProcedureOutcome::Response(Err(UnsuccessfulOutcome::UeContextSetupFailure(failure))) => {
                    warn!("UE Context Setup failed: ue={}, cause={}", ue_index, failure.cause);
                    Err(ProcedureError::Rejected(failure.cause))
                }
                ProcedureOutcome::Response(Ok(other)) => {
                    Err(ProcedureError::UnexpectedResponse(other.name()))
                }
                ProcedureOutcome::Response(Err(other)) => {
                    Err(ProcedureError::UnexpectedResponse(other.name()))
                }
            },
        };

        match &result {
            Ok(response) => {
                if let Some(ctx) = self.state.lock().ues.find_mut(ue_index) {
                    ctx.c_rnti = response.c_rnti.or(ctx.c_rnti);
                }
                info!(
                    "UE Context Setup done: ue={}, du_ue_id={}, drbs={}, drbs_failed={}",
                    ue_index,
                    response.gnb_du_ue_f1ap_id,
                    response.drbs_setup.len(),
                    response.drbs_failed_to_be_setup.len()
                );
            }
            Err(_) if new_ue => self.remove_ue_context(ue_index).await,
            Err(_) => {}
        }
        result
    }

    /// Runs a UE Context Modification on the UE's task queue. The UE F1AP IDs
    /// of `request` are taken from the UE context.
    pub async fn handle_ue_context_modification(
        self: &Arc<Self>,
        ue_index: UeIndex,
        mut request: UeContextModificationRequest,
    ) -> Result<UeContextModificationResponse, ProcedureError> {
        {
            let state = self.state.lock();
            let ctx = state.ues.find(ue_index).ok_or(F1Error::UeNotFound(ue_index))?;
            if ctx.is_marked_for_release() {
                return Err(F1Error::UeReleasing(ue_index).into());
            }
            request.gnb_cu_ue_f1ap_id = ctx.local_id;
            request.gnb_du_ue_f1ap_id = ctx.peer_id().ok_or(F1Error::PeerIdNotBound(ue_index))?;
        }

        let this = self.clone();
        self.ue_queues
            .executor(ue_index)
            .run(async move { this.run_ue_context_modification(ue_index, request).await })
            .await
            .unwrap_or(Err(F1Error::TaskQueueClosed.into()))
    }

    async fn run_ue_context_modification(
        &self,
        ue_index: UeIndex,
        request: UeContextModificationRequest,
    ) -> Result<UeContextModificationResponse, ProcedureError> {
        let subscription = self.ue_events.subscribe(
            ue_index,
            UeProcedureKind::ContextModification,
            self.cfg.ue_procedure_timeout(),
        );
        self.send(request)?;

        match subscription.wait().await {
            ProcedureOutcome::Invalid => Err(F1Error::TaskQueueClosed.into()),
            ProcedureOutcome::Aborted(reason) => {
                warn!("UE Context Modification got no answer: ue={}, {:?}", ue_index, reason);
                Err(ProcedureError::Aborted(reason))
            }
            ProcedureOutcome::Response(Ok(SuccessfulOutcome::UeContextModificationResponse(
                response,
            ))) => {
                debug!(
                    "UE Context Modification done: ue={}, drbs_setup={}, drbs_modified={}",
                    ue_index,
                    response.drbs_setup_mod.len(),
                    response.drbs_modified.len()
                );
                Ok(response)
            }
            ProcedureOutcome::Response(Err(UnsuccessfulOutcome::UeContextModificationFailure(
                failure,
            ))) => {
                warn!("UE Context Modification failed: ue={}, cause={}", ue_index, failure.cause);
                Err(ProcedureError::Rejected(failure.cause))
            }
            ProcedureOutcome::Response(Ok(other)) => Err(ProcedureError::UnexpectedResponse(other.name())),
            ProcedureOutcome::Response(Err(other)) => Err(ProcedureError::UnexpectedResponse(other.name())),
        }
    }

    /// Releases a UE: sends the UE Context Release Command, waits for the
    /// Release Complete and removes the context.
    ///
    /// The context is marked for release when this is called, before the
    /// returned future is polled. Resolves to `None` if the UE is unknown or
    /// already being released, otherwise to the released UE once its context
    /// is gone.
    pub fn handle_ue_context_release_command(
        self: &Arc<Self>,
        ue_index: UeIndex,
        cause: F1apCause,
        rrc_container: Option<Bytes>,
        srb_id: Option<SrbId>,
    ) -> impl Future<Output = Option<UeIndex>> + Send + 'static {
        let marked = self
            .state
            .lock()
            .ues
            .find_mut(ue_index)
            .map(|ctx| ctx.mark_for_release());
        let this = self.clone();

        async move {
            match marked {
                None => {
                    warn!("UE Context Release for unknown UE: ue={}", ue_index);
                    return None;
                }
                Some(false) => {
                    debug!("UE Context Release already in progress: ue={}", ue_index);
                    return None;
                }
                Some(true) => {}
            }

            let queue = this.ue_queues.executor(ue_index);
            queue
                .run(async move {
                    this.run_ue_context_release(ue_index, cause, rrc_container, srb_id)
                        .await
                })
                .await
        }
    }

    async fn run_ue_context_release(
        &self,
        ue_index: UeIndex,
        cause: F1apCause,
        rrc_container: Option<Bytes>,
        srb_id: Option<SrbId>,
    ) -> UeIndex {
        let ids = self
            .state
            .lock()
            .ues
            .find(ue_index)
            .map(|ctx| (ctx.local_id, ctx.peer_id()));

        let (cu_ue_id, du_ue_id) = match ids {
            Some((cu_ue_id, Some(du_ue_id))) => (cu_ue_id, du_ue_id),
            Some((cu_ue_id, None)) => {
                info!("UE unknown to the DU, releasing locally: ue={}, cu_ue_id={}", ue_index, cu_ue_id);
                self.remove_ue_context(ue_index).await;
                return ue_index;
            }
            None => {
                debug!("UE removed before its release ran: ue={}", ue_index);
                return ue_index;
            }
        };

        info!("Sending UE Context Release Command: ue={}, cause={}", ue_index, cause);
        // the gNB-DU answers only after its RRC Release delivery wait
        let subscription = self.ue_events.subscribe(
            ue_index,
            UeProcedureKind::ContextRelease,
            self.cfg.ue_procedure_timeout() + self.cfg.rrc_delivery_timeout(),
        );
        let command = UeContextReleaseCommand {
            gnb_cu_ue_f1ap_id: cu_ue_id,
            gnb_du_ue_f1ap_id: du_ue_id,
            cause,
            rrc_container,
            srb_id,
            old_gnb_du_ue_f1ap_id: None,
        };

        match self.send(command) {
            Err(e) => warn!("Failed to send UE Context Release Command: ue={}, {}", ue_index, e),
            Ok(()) => match subscription.wait().await {
                ProcedureOutcome::Response(Ok(SuccessfulOutcome::UeContextReleaseComplete(complete))) => {
                    if complete.gnb_du_ue_f1ap_id != du_ue_id {
                        error!(
                            "UE Context Release Complete with wrong gNB-DU UE F1AP ID: ue={}, expected={}, received={}",
                            ue_index, du_ue_id, complete.gnb_du_ue_f1ap_id
                        );
                    } else {
                        debug!("UE Context Release Complete: ue={}", ue_index);
                    }
                }
                ProcedureOutcome::Aborted(reason) => {
                    warn!("UE Context Release Complete not received: ue={}, {:?}", ue_index, reason)
                }
                other => warn!("Unexpected UE Context Release outcome: ue={}, {:?}", ue_index, other),
            },
        }

        self.remove_ue_context(ue_index).await;
        ue_index
    }

    /// UE Context Release Request from the gNB-DU
    pub(super) fn handle_ue_context_release_request(&self, ue_index: UeIndex, cause: F1apCause) {
        let marked = self
            .state
            .lock()
            .ues
            .find(ue_index)
            .is_some_and(|ctx| ctx.is_marked_for_release());
        if marked {
            debug!("Ignoring UE Context Release Request, release in progress: ue={}", ue_index);
            return;
        }
        info!("UE Context Release Request: ue={}, cause={}", ue_index, cause);
        self.cu_cp.on_ue_context_release_request(ue_index, cause);
    }

    /// UE Context Modification Required responder. Runs on the UE's task
    /// queue.
    pub(super) async fn handle_ue_context_modification_required(
        &self,
        ue_index: UeIndex,
        required: UeContextModificationRequired,
    ) {
        debug!(
            "UE Context Modification Required: ue={}, cause={}, drbs_to_release={}",
            ue_index,
            required.cause,
            required.drbs_required_to_be_released.len()
        );

        let sent = match self
            .cu_cp
            .on_ue_context_modification_required(ue_index, &required)
            .await
        {
            Ok(rrc_container) => self.send(UeContextModificationConfirm {
                gnb_cu_ue_f1ap_id: required.gnb_cu_ue_f1ap_id,
                gnb_du_ue_f1ap_id: required.gnb_du_ue_f1ap_id,
                rrc_container,
            }),
            Err(cause) => {
                warn!("UE Context Modification Required refused: ue={}, cause={}", ue_index, cause);
                self.send(UeContextModificationRefuse {
                    gnb_cu_ue_f1ap_id: required.gnb_cu_ue_f1ap_id,
                    gnb_du_ue_f1ap_id: required.gnb_du_ue_f1ap_id,
                    cause,
                })
            }
        };
        if let Err(e) = sent {
            warn!("Failed to answer UE Context Modification Required: ue={}, {}", ue_index, e);
        }
    }
}
