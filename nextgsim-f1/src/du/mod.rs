//! gNB-DU side of the F1AP engine
//!
//! `F1apDu` connects to the gNB-CU, runs the F1 Setup and the other interface
//! management procedures on its common task queue, and the UE-associated
//! procedures on one task queue per UE.
//!
//! Responses are never queued: the dispatcher hands them to the transaction
//! manager or the UE event sources right away, since the procedure waiting
//! for them occupies the queue.

mod f1_setup;
mod interface_management;
mod interfaces;
mod rrc_message_transfer;
mod ue_context;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};

use nextgsim_f1ap::procedures::{ErrorIndication, ServedCellInfo};
use nextgsim_f1ap::{
    F1apCause, F1apMessage, GnbCuUeF1apId, GnbDuId, GnbDuUeF1apId, InitiatingMessage, NrCgi,
    ProcedureCode, ProtocolCause, RadioNetworkCause, SrbId, SuccessfulOutcome, TransactionId,
    TriggeringMessage, UeF1apIdPair, UnsuccessfulOutcome,
};
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, info, warn};

use crate::bearer::{DeliveryReportNotifier, SrbDeliveryTracker};
use crate::connection::{F1cConnectionClient, F1cConnectionHandler, F1cEventHandler};
use crate::error::F1Error;
use crate::event_source::{UeEventSources, UeProcedureKind};
use crate::executor::{FifoTaskQueue, UeTaskScheduler, DEFAULT_TASK_QUEUE_CAPACITY};
use crate::id_binding::check_peer_id;
use crate::interfaces::UeRemovalHandler;
use crate::transaction::{ProcedureResponse, TransactionManager};
use crate::ue_context::{DuUeContext, UeContextStore, UeIndex};
use crate::{F1Side, F1apConfig};

pub use f1_setup::{F1SetupFailureReason, F1SetupRequestParams};
pub use interfaces::{DuUeContextModResult, DuUeContextSetupResult, F1apDuManager};
pub use rrc_message_transfer::DuInitialUlRrcMessage;
pub use ue_context::DuModificationRequired;

/// Interface-level state of the gNB-DU
#[derive(Debug, Clone, Default)]
pub struct DuF1Context {
    /// gNB-DU ID sent in the last accepted F1 Setup
    pub gnb_du_id: Option<GnbDuId>,
    pub gnb_du_name: Option<String>,
    pub served_cells: Vec<ServedCellInfo>,
    /// Cells the gNB-CU asked to activate
    pub active_cells: Vec<NrCgi>,
    pub gnb_cu_name: Option<String>,
    pub gnb_cu_rrc_version: Option<(u8, u8, u8)>,
    pub f1_setup: bool,
}

struct DuState {
    ues: UeContextStore<GnbDuUeF1apId, GnbCuUeF1apId>,
    srbs: HashMap<UeIndex, HashMap<SrbId, Arc<SrbDeliveryTracker>>>,
    f1: DuF1Context,
}

/// gNB-DU F1AP engine
pub struct F1apDu {
    cfg: F1apConfig,
    weak_self: Weak<F1apDu>,
    connection: Mutex<Option<Arc<F1cConnectionHandler>>>,
    state: Mutex<DuState>,
    transactions: TransactionManager,
    ue_events: UeEventSources,
    /// Interface-wide procedures
    ctrl_queue: FifoTaskQueue,
    ue_queues: UeTaskScheduler,
    /// Owner of the SRB delivery trackers
    srb_queue: FifoTaskQueue,
    delivery_reporter: Arc<dyn DeliveryReportNotifier>,
    /// Woken on association loss, for waits that are not transactions
    association_lost: Notify,
    du_mng: Arc<dyn F1apDuManager>,
    ue_removal: Arc<dyn UeRemovalHandler>,
}

/// Turns tracker delivery reports into RRC Delivery Reports
struct DuDeliveryReporter {
    du: Weak<F1apDu>,
}

impl DeliveryReportNotifier for DuDeliveryReporter {
    fn on_delivery_report(
        &self,
        ue_index: UeIndex,
        srb_id: SrbId,
        status: nextgsim_f1ap::procedures::RrcDeliveryStatus,
    ) {
        if let Some(du) = self.du.upgrade() {
            du.send_rrc_delivery_report(ue_index, srb_id, status);
        }
    }
}

impl F1apDu {
    /// Creates the engine. Must be called from within a tokio runtime.
    ///
    /// Fails if `cfg` does not validate.
    pub fn new(
        cfg: F1apConfig,
        du_mng: Arc<dyn F1apDuManager>,
        ue_removal: Arc<dyn UeRemovalHandler>,
    ) -> Result<Arc<Self>, F1Error> {
        cfg.validate().map_err(|e| F1Error::InvalidConfig(e.to_string()))?;
        Ok(Arc::new_cyclic(|weak_self: &Weak<F1apDu>| F1apDu {
            state: Mutex::new(DuState {
                ues: UeContextStore::new(cfg.max_ues, cfg.ue_id_min, cfg.ue_id_max),
                srbs: HashMap::new(),
                f1: DuF1Context::default(),
            }),
            transactions: TransactionManager::new(cfg.transaction_pool_size),
            ue_events: UeEventSources::new(),
            ctrl_queue: FifoTaskQueue::spawn("du-f1ap"),
            ue_queues: UeTaskScheduler::new("du-f1ap", DEFAULT_TASK_QUEUE_CAPACITY),
            srb_queue: FifoTaskQueue::spawn("du-srb"),
            delivery_reporter: Arc::new(DuDeliveryReporter {
                du: weak_self.clone(),
            }),
            association_lost: Notify::new(),
            weak_self: weak_self.clone(),
            connection: Mutex::new(None),
            cfg,
            du_mng,
            ue_removal,
        }))
    }

    pub fn config(&self) -> &F1apConfig {
        &self.cfg
    }

    /// Opens a new F1-C association towards the gNB-CU.
    ///
    /// Fails if an association is still up or the client refuses.
    pub fn connect_to_cu(&self, client: &dyn F1cConnectionClient) -> bool {
        if self.is_connected() {
            warn!("F1-C connection to CU already established");
            return false;
        }

        let handler = F1cConnectionHandler::new(F1Side::Du);
        let events: Weak<dyn F1cEventHandler> = self.weak_self.clone();
        if !handler.connect(client, events) {
            return false;
        }
        *self.connection.lock() = Some(handler);
        true
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .is_some_and(|c| c.is_connected())
    }

    pub fn is_f1_setup(&self) -> bool {
        self.state.lock().f1.f1_setup
    }

    pub fn nb_ues(&self) -> usize {
        self.state.lock().ues.len()
    }

    pub fn f1_context(&self) -> DuF1Context {
        self.state.lock().f1.clone()
    }

    /// Snapshot of a UE context
    pub fn ue_context(&self, ue_index: UeIndex) -> Option<DuUeContext> {
        self.state.lock().ues.find(ue_index).cloned()
    }

    pub fn ue_index_by_du_ue_id(&self, du_ue_id: GnbDuUeF1apId) -> Option<UeIndex> {
        self.state.lock().ues.ue_index_by_local_id(du_ue_id)
    }

    fn arc(&self) -> Option<Arc<F1apDu>> {
        self.weak_self.upgrade()
    }

    fn send(&self, msg: impl Into<F1apMessage>) -> Result<(), F1Error> {
        let connection = self.connection.lock().clone();
        match connection {
            Some(connection) => connection.send(msg.into()),
            None => Err(F1Error::NotConnected),
        }
    }

    /// Queues an interface-wide procedure
    fn schedule_ctrl<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.ctrl_queue.schedule(fut) {
            warn!("Discarding F1AP procedure, common task queue unavailable");
        }
    }

    /// Queues a UE procedure
    fn schedule_ue<F>(&self, ue_index: UeIndex, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.ue_queues.schedule(ue_index, fut) {
            warn!("Discarding F1AP procedure, UE task queue unavailable: ue={}", ue_index);
        }
    }

    // ---------------------------------------------------------------------
    // Message dispatch
    // ---------------------------------------------------------------------

    fn dispatch(self: &Arc<Self>, msg: F1apMessage) {
        let ue_ids = msg.ue_ids();
        let transaction_id = msg.transaction_id();

        match msg {
            F1apMessage::InitiatingMessage(msg) => self.dispatch_initiating_message(msg),
            F1apMessage::SuccessfulOutcome(msg) => {
                self.dispatch_outcome(Ok(msg), transaction_id, ue_ids)
            }
            F1apMessage::UnsuccessfulOutcome(msg) => {
                self.dispatch_outcome(Err(msg), transaction_id, ue_ids)
            }
        }
    }

    fn dispatch_outcome(
        &self,
        response: ProcedureResponse,
        transaction_id: Option<TransactionId>,
        ue_ids: Option<UeF1apIdPair>,
    ) {
        let kind = match &response {
            Ok(SuccessfulOutcome::UeContextModificationConfirm(_))
            | Err(UnsuccessfulOutcome::UeContextModificationRefuse(_)) => {
                Some(UeProcedureKind::ModificationRequired)
            }
            _ => None,
        };

        match (kind, ue_ids, transaction_id) {
            (Some(kind), Some(ids), _) => {
                let (name, code, msg_type) = outcome_info(&response);
                if let Some(ue_index) = self.resolve_ue(name, code, msg_type, ids) {
                    self.ue_events.set(ue_index, kind, response);
                }
            }
            (None, _, Some(transaction_id)) => {
                self.transactions.set_response(transaction_id, response);
            }
            _ => {
                let (name, _, _) = outcome_info(&response);
                warn!("Discarding unexpected {}", name);
            }
        }
    }

    fn dispatch_initiating_message(self: &Arc<Self>, msg: InitiatingMessage) {
        match msg {
            InitiatingMessage::GnbCuConfigurationUpdate(request) => {
                let this = self.clone();
                self.schedule_ctrl(async move {
                    this.handle_gnb_cu_configuration_update(request).await
                });
            }
            InitiatingMessage::Reset(request) => {
                let this = self.clone();
                self.schedule_ctrl(async move { this.handle_reset_request(request).await });
            }
            InitiatingMessage::Paging(paging) => {
                let this = self.clone();
                self.schedule_ctrl(async move { this.handle_paging(paging) });
            }
            InitiatingMessage::ErrorIndication(indication) => {
                self.handle_error_indication(&indication)
            }
            InitiatingMessage::UeContextSetupRequest(request) => {
                match request.gnb_du_ue_f1ap_id {
                    Some(du_ue_id) => {
                        let ids = UeF1apIdPair::new(request.gnb_cu_ue_f1ap_id, du_ue_id);
                        let Some(ue_index) = self.resolve_ue(
                            "UEContextSetupRequest",
                            ProcedureCode::UeContextSetup,
                            TriggeringMessage::InitiatingMessage,
                            ids,
                        ) else {
                            return;
                        };
                        let this = self.clone();
                        self.schedule_ue(ue_index, async move {
                            this.handle_ue_context_setup_request(ue_index, request, false)
                                .await
                        });
                    }
                    None => {
                        let this = self.clone();
                        self.schedule_ctrl(async move {
                            this.handle_ue_creation_request(request).await
                        });
                    }
                }
            }
            InitiatingMessage::UeContextModificationRequest(request) => {
                let ids = UeF1apIdPair::new(request.gnb_cu_ue_f1ap_id, request.gnb_du_ue_f1ap_id);
                let Some(ue_index) = self.resolve_ue(
                    "UEContextModificationRequest",
                    ProcedureCode::UeContextModification,
                    TriggeringMessage::InitiatingMessage,
                    ids,
                ) else {
                    return;
                };
                let this = self.clone();
                self.schedule_ue(ue_index, async move {
                    this.handle_ue_context_modification_request(ue_index, request)
                        .await
                });
            }
            InitiatingMessage::UeContextReleaseCommand(command) => {
                let ids = UeF1apIdPair::new(command.gnb_cu_ue_f1ap_id, command.gnb_du_ue_f1ap_id);
                let Some(ue_index) = self.resolve_ue(
                    "UEContextReleaseCommand",
                    ProcedureCode::UeContextRelease,
                    TriggeringMessage::InitiatingMessage,
                    ids,
                ) else {
                    return;
                };
                // marked before anything else, lower-layer release triggers are ignored from here on
                let marked = self
                    .state
                    .lock()
                    .ues
                    .find_mut(ue_index)
                    .is_some_and(|ctx| ctx.mark_for_release());
                if !marked {
                    warn!("UE context release already in progress, discarding command: ue={}", ue_index);
                    return;
                }
                let this = self.clone();
                self.schedule_ue(ue_index, async move {
                    this.handle_ue_context_release_command(ue_index, command)
                        .await
                });
            }
            InitiatingMessage::DlRrcMessageTransfer(msg) => {
                let ids = UeF1apIdPair::new(msg.gnb_cu_ue_f1ap_id, msg.gnb_du_ue_f1ap_id);
                let Some(ue_index) = self.resolve_ue(
                    "DLRRCMessageTransfer",
                    ProcedureCode::DlRrcMessageTransfer,
                    TriggeringMessage::InitiatingMessage,
                    ids,
                ) else {
                    return;
                };
                let this = self.clone();
                self.schedule_ue(ue_index, async move {
                    this.handle_dl_rrc_message_transfer(ue_index, msg)
                });
            }
            other => {
                warn!("Unexpected {} received by the DU", other.name());
                let cause = F1apCause::Protocol(ProtocolCause::MessageNotCompatibleWithReceiverState);
                let indication = ErrorIndication::non_ue(TransactionId::default(), cause)
                    .with_diagnostics(other.procedure_code(), TriggeringMessage::InitiatingMessage);
                let _ = self.send(indication);
            }
        }
    }

    /// Finds the UE a message is addressed to and applies the peer ID binding
    /// rule. Faults are answered with an Error Indication.
    fn resolve_ue(
        &self,
        msg_name: &str,
        procedure_code: ProcedureCode,
        msg_type: TriggeringMessage,
        ids: UeF1apIdPair,
    ) -> Option<UeIndex> {
        let fault = {
            let mut state = self.state.lock();
            let ue_index = ids.du.and_then(|id| state.ues.ue_index_by_local_id(id));
            match (ue_index, ids.cu) {
                (None, _) => Some(F1apCause::RadioNetwork(
                    RadioNetworkCause::UnknownOrAlreadyAllocatedGnbDuUeF1apId,
                )),
                (Some(ue_index), Some(cu_ue_id)) => {
                    let check = check_peer_id(&mut state.ues, ue_index, cu_ue_id);
                    match check.fault_cause(F1Side::Du) {
                        None => return Some(ue_index),
                        Some(cause) => {
                            warn!(
                                "{} with inconsistent gNB-CU UE F1AP ID: ue={}, cu_ue_id={}, check={:?}",
                                msg_name, ue_index, cu_ue_id, check
                            );
                            Some(cause)
                        }
                    }
                }
                (Some(ue_index), None) => return Some(ue_index),
            }
        };

        if let Some(cause) = fault {
            if ids.du.is_some() {
                debug!("{} for unknown gNB-DU UE F1AP ID: du_ue_id={:?}", msg_name, ids.du);
            }
            self.send_error_indication(ids, cause, Some((procedure_code, msg_type)));
        }
        None
    }

    fn send_error_indication(
        &self,
        ids: UeF1apIdPair,
        cause: F1apCause,
        diagnostics: Option<(ProcedureCode, TriggeringMessage)>,
    ) {
        let mut indication = ErrorIndication::for_ue(TransactionId::default(), ids.cu, ids.du, cause);
        if let Some((code, msg_type)) = diagnostics {
            indication = indication.with_diagnostics(code, msg_type);
        }
        if let Err(e) = self.send(indication) {
            warn!("Failed to send Error Indication: {}", e);
        }
    }

    // ---------------------------------------------------------------------
    // UE removal and connection loss
    // ---------------------------------------------------------------------

    /// Queues the removal of a UE behind the procedures already queued for it.
    ///
    /// The returned future completes once the UE is gone.
    fn schedule_ue_removal(
        self: &Arc<Self>,
        ue_index: UeIndex,
    ) -> impl Future<Output = ()> + Send + 'static {
        self.ue_events.cancel_ue(ue_index);

        let (done_tx, done_rx) = oneshot::channel();
        let this = self.clone();
        let scheduled = self.ue_queues.schedule(ue_index, async move {
            this.remove_ue_context(ue_index).await;
            let _ = done_tx.send(());
        });
        if !scheduled {
            warn!("Cannot schedule UE removal: ue={}", ue_index);
        }
        async move {
            let _ = done_rx.await;
        }
    }

    /// Removes a UE. Must run as the last task on the UE's queue.
    async fn remove_ue_context(&self, ue_index: UeIndex) {
        // membership may have changed since the removal was scheduled
        if !self.state.lock().ues.contains(ue_index) {
            debug!("UE already removed: ue={}", ue_index);
            self.ue_queues.remove_ue(ue_index);
            return;
        }

        self.ue_removal.remove_ue(ue_index).await;

        let removed = {
            let mut state = self.state.lock();
            state.srbs.remove(&ue_index);
            state.ues.remove(ue_index)
        };
        self.ue_events.cancel_ue(ue_index);
        self.ue_queues.remove_ue(ue_index);

        if let Some(ctx) = removed {
            info!(
                "UE context removed: ue={}, du_ue_id={}, cu_ue_id={:?}",
                ue_index,
                ctx.local_id,
                ctx.peer_id().map(|id| id.0)
            );
        }
    }

    /// Removes the given UEs and waits until all of them are gone
    async fn remove_ues(self: &Arc<Self>, ues: Vec<UeIndex>) {
        let removals: Vec<_> = ues
            .into_iter()
            .map(|ue_index| self.schedule_ue_removal(ue_index))
            .collect();
        futures::future::join_all(removals).await;
    }

    /// Loss or closure of the association
    async fn on_connection_lost(self: &Arc<Self>) {
        self.state.lock().f1.f1_setup = false;
        self.transactions.cancel_all();
        self.ue_events.cancel_all();

        let ues = self.state.lock().ues.ue_indexes();
        if !ues.is_empty() {
            info!("Removing UEs of the lost F1-C association: count={}", ues.len());
        }
        self.remove_ues(ues).await;
    }
}

impl F1cEventHandler for F1apDu {
    fn handle_message(&self, msg: F1apMessage) {
        if let Some(this) = self.arc() {
            this.dispatch(msg);
        }
    }

    fn handle_connection_loss(&self) {
        let Some(this) = self.arc() else {
            return;
        };
        warn!("F1-C association to CU lost");
        // procedures blocking the queues are released now, not at their deadline
        self.transactions.cancel_all();
        self.ue_events.cancel_all();
        self.association_lost.notify_waiters();
        self.schedule_ctrl(async move { this.on_connection_lost().await });
    }
}

fn outcome_info(response: &ProcedureResponse) -> (&'static str, ProcedureCode, TriggeringMessage) {
    match response {
        Ok(msg) => (msg.name(), msg.procedure_code(), TriggeringMessage::SuccessfulOutcome),
        Err(msg) => (msg.name(), msg.procedure_code(), TriggeringMessage::UnsuccessfulOutcome),
    }
}
