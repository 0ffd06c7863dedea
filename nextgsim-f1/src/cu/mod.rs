//! gNB-CU side of the F1AP engine
//!
//! `F1apCu` accepts one F1-C association from a gNB-DU, answers its F1 Setup
//! and runs the UE context procedures towards it. Interface-wide procedures
//! run on the common task queue, UE-associated ones on the UE's queue.

mod interface_management;
mod interfaces;
mod rrc_message_transfer;
mod ue_context;

use std::future::Future;
use std::sync::{Arc, Weak};

use nextgsim_f1ap::procedures::{ErrorIndication, ServedCellInfo};
use nextgsim_f1ap::{
    F1apCause, F1apMessage, GnbCuUeF1apId, GnbDuId, GnbDuUeF1apId, InitiatingMessage, NrCgi,
    ProcedureCode, ProtocolCause, RadioNetworkCause, SuccessfulOutcome, TransactionId,
    TriggeringMessage, UeF1apIdPair, UnsuccessfulOutcome,
};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::connection::{F1cConnectionHandler, F1cEventHandler, F1cMessageNotifier};
use crate::error::F1Error;
use crate::event_source::{UeEventSources, UeProcedureKind};
use crate::executor::{FifoTaskQueue, UeTaskScheduler, DEFAULT_TASK_QUEUE_CAPACITY};
use crate::id_binding::check_peer_id;
use crate::interfaces::UeRemovalHandler;
use crate::transaction::{ProcedureResponse, TransactionManager};
use crate::ue_context::{CuUeContext, UeContextStore, UeIndex};
use crate::{F1Side, F1apConfig};

pub use interfaces::{CuUeContextSetupRequest, F1SetupDecision, F1apCuCpNotifier};

/// State of the F1 interface towards the gNB-DU
#[derive(Debug, Clone, Default)]
pub struct CuF1Context {
    pub gnb_du_id: Option<GnbDuId>,
    pub gnb_du_name: Option<String>,
    pub served_cells: Vec<ServedCellInfo>,
    pub active_cells: Vec<NrCgi>,
    pub f1_setup: bool,
}

struct CuState {
    ues: UeContextStore<GnbCuUeF1apId, GnbDuUeF1apId>,
    f1: CuF1Context,
}

/// gNB-CU F1AP engine
pub struct F1apCu {
    cfg: F1apConfig,
    weak_self: Weak<F1apCu>,
    connection: Mutex<Option<Arc<F1cConnectionHandler>>>,
    state: Mutex<CuState>,
    transactions: TransactionManager,
    ue_events: UeEventSources,
    ctrl_queue: FifoTaskQueue,
    ue_queues: UeTaskScheduler,
    cu_cp: Arc<dyn F1apCuCpNotifier>,
    ue_removal: Arc<dyn UeRemovalHandler>,
}

impl F1apCu {
    /// Creates the engine. Must be called from within a tokio runtime.
    ///
    /// Fails if `cfg` does not validate.
    pub fn new(
        cfg: F1apConfig,
        cu_cp: Arc<dyn F1apCuCpNotifier>,
        ue_removal: Arc<dyn UeRemovalHandler>,
    ) -> Result<Arc<Self>, F1Error> {
        cfg.validate().map_err(|e| F1Error::InvalidConfig(e.to_string()))?;
        Ok(Arc::new_cyclic(|weak_self: &Weak<F1apCu>| F1apCu {
            state: Mutex::new(CuState {
                ues: UeContextStore::new(cfg.max_ues, cfg.ue_id_min, cfg.ue_id_max),
                f1: CuF1Context::default(),
            }),
            transactions: TransactionManager::new(cfg.transaction_pool_size),
            ue_events: UeEventSources::new(),
            ctrl_queue: FifoTaskQueue::spawn("cu-f1ap"),
            ue_queues: UeTaskScheduler::new("cu-f1ap", DEFAULT_TASK_QUEUE_CAPACITY),
            weak_self: weak_self.clone(),
            connection: Mutex::new(None),
            cfg,
            cu_cp,
            ue_removal,
        }))
    }

    pub fn config(&self) -> &F1apConfig {
        &self.cfg
    }

    /// Accepts a new F1-C association from a gNB-DU.
    ///
    /// `du_tx` is the path towards the gNB-DU; the returned notifier is where
    /// the gNB-DU's messages must be delivered. Refused while an association
    /// is up.
    pub fn handle_new_du_connection(
        &self,
        du_tx: Box<dyn F1cMessageNotifier>,
    ) -> Option<Box<dyn F1cMessageNotifier>> {
        if self.is_connected() {
            warn!("Rejecting DU connection, an F1-C association is already up");
            return None;
        }

        let handler = F1cConnectionHandler::new(F1Side::Cu);
        let events: Weak<dyn F1cEventHandler> = self.weak_self.clone();
        let rx = handler.attach(du_tx, events)?;
        *self.connection.lock() = Some(handler);
        Some(rx)
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

    pub fn f1_context(&self) -> CuF1Context {
        self.state.lock().f1.clone()
    }

    pub fn ue_context(&self, ue_index: UeIndex) -> Option<CuUeContext> {
        self.state.lock().ues.find(ue_index).cloned()
    }

    pub fn ue_index_by_cu_ue_id(&self, cu_ue_id: GnbCuUeF1apId) -> Option<UeIndex> {
        self.state.lock().ues.ue_index_by_local_id(cu_ue_id)
    }

    pub fn ue_index_by_du_ue_id(&self, du_ue_id: GnbDuUeF1apId) -> Option<UeIndex> {
        self.state.lock().ues.ue_index_by_peer_id(du_ue_id)
    }

    fn arc(&self) -> Option<Arc<F1apCu>> {
        self.weak_self.upgrade()
    }

    fn send(&self, msg: impl Into<F1apMessage>) -> Result<(), F1Error> {
        let connection = self.connection.lock().clone();
        match connection {
            Some(connection) => connection.send(msg.into()),
            None => Err(F1Error::NotConnected),
        }
    }

    fn schedule_ctrl<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.ctrl_queue.schedule(fut) {
            warn!("Discarding F1AP procedure, common task queue unavailable");
        }
    }

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
            Ok(SuccessfulOutcome::UeContextSetupResponse(_))
            | Err(UnsuccessfulOutcome::UeContextSetupFailure(_)) => Some(UeProcedureKind::ContextSetup),
            Ok(SuccessfulOutcome::UeContextModificationResponse(_))
            | Err(UnsuccessfulOutcome::UeContextModificationFailure(_)) => {
                Some(UeProcedureKind::ContextModification)
            }
            Ok(SuccessfulOutcome::UeContextReleaseComplete(_)) => Some(UeProcedureKind::ContextRelease),
            _ => None,
        };

        match (kind, ue_ids, transaction_id) {
            (Some(kind), Some(mut ids), _) => {
                // the release procedure checks the gNB-DU UE F1AP ID itself
                if kind == UeProcedureKind::ContextRelease {
                    ids.du = None;
                }
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
            InitiatingMessage::F1SetupRequest(request) => {
                let this = self.clone();
                self.schedule_ctrl(async move { this.handle_f1_setup_request(request).await });
            }
            InitiatingMessage::GnbDuConfigurationUpdate(update) => {
                let this = self.clone();
                self.schedule_ctrl(async move {
                    this.handle_gnb_du_configuration_update(update).await
                });
            }
            InitiatingMessage::Reset(request) => {
                let this = self.clone();
                self.schedule_ctrl(async move { this.handle_reset_request(request).await });
            }
            InitiatingMessage::F1RemovalRequest(request) => {
                let this = self.clone();
                self.schedule_ctrl(async move { this.handle_f1_removal_request(request).await });
            }
            InitiatingMessage::ErrorIndication(indication) => {
                self.handle_error_indication(&indication)
            }
            InitiatingMessage::InitialUlRrcMessageTransfer(msg) => {
                let this = self.clone();
                self.schedule_ctrl(async move { this.handle_initial_ul_rrc_message(msg).await });
            }
            InitiatingMessage::UlRrcMessageTransfer(msg) => {
                let ids = UeF1apIdPair::new(msg.gnb_cu_ue_f1ap_id, msg.gnb_du_ue_f1ap_id);
                if let Some(ue_index) = self.resolve_ue(
                    "ULRRCMessageTransfer",
                    ProcedureCode::UlRrcMessageTransfer,
                    TriggeringMessage::InitiatingMessage,
                    ids,
                ) {
                    self.handle_ul_rrc_message_transfer(ue_index, msg);
                }
            }
            InitiatingMessage::RrcDeliveryReport(report) => {
                let ids = UeF1apIdPair::new(report.gnb_cu_ue_f1ap_id, report.gnb_du_ue_f1ap_id);
                if let Some(ue_index) = self.resolve_ue(
                    "RRCDeliveryReport",
                    ProcedureCode::RrcDeliveryReport,
                    TriggeringMessage::InitiatingMessage,
                    ids,
                ) {
                    self.handle_rrc_delivery_report(ue_index, &report);
                }
            }
            InitiatingMessage::UeContextReleaseRequest(request) => {
                let ids = UeF1apIdPair::new(request.gnb_cu_ue_f1ap_id, request.gnb_du_ue_f1ap_id);
                if let Some(ue_index) = self.resolve_ue(
                    "UEContextReleaseRequest",
                    ProcedureCode::UeContextReleaseRequest,
                    TriggeringMessage::InitiatingMessage,
                    ids,
                ) {
                    self.handle_ue_context_release_request(ue_index, request.cause);
                }
            }
            InitiatingMessage::UeContextModificationRequired(required) => {
                let ids = UeF1apIdPair::new(required.gnb_cu_ue_f1ap_id, required.gnb_du_ue_f1ap_id);
                let Some(ue_index) = self.resolve_ue(
                    "UEContextModificationRequired",
                    ProcedureCode::UeContextModificationRequired,
                    TriggeringMessage::InitiatingMessage,
                    ids,
                ) else {
                    return;
                };
                let this = self.clone();
                self.schedule_ue(ue_index, async move {
                    this.handle_ue_context_modification_required(ue_index, required)
                        .await
                });
            }
            other => {
                warn!("Unexpected {} received by the CU", other.name());
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
        let cause = {
            let mut state = self.state.lock();
            let ue_index = ids.cu.and_then(|id| state.ues.ue_index_by_local_id(id));
            match (ue_index, ids.du) {
                (None, _) => {
                    debug!("{} for unknown gNB-CU UE F1AP ID: cu_ue_id={:?}", msg_name, ids.cu);
                    F1apCause::RadioNetwork(RadioNetworkCause::UnknownOrAlreadyAllocatedGnbCuUeF1apId)
                }
                (Some(ue_index), None) => return Some(ue_index),
                (Some(ue_index), Some(du_ue_id)) => {
                    let check = check_peer_id(&mut state.ues, ue_index, du_ue_id);
                    match check.fault_cause(F1Side::Cu) {
                        None => return Some(ue_index),
                        Some(cause) => {
                            warn!(
                                "{} with inconsistent gNB-DU UE F1AP ID: ue={}, du_ue_id={}, check={:?}",
                                msg_name, ue_index, du_ue_id, check
                            );
                            cause
                        }
                    }
                }
            }
        };

        self.send_error_indication(ids, cause, Some((procedure_code, msg_type)));
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

    /// Queues the removal of a UE behind the procedures already queued for it
    fn schedule_ue_removal(
        self: &Arc<Self>,
        ue_index: UeIndex,
    ) -> impl Future<Output = ()> + Send + 'static {
        self.ue_events.cancel_ue(ue_index);

        let (done_tx, done_rx) = oneshot::channel();
        let this = self.clone();
        if !self.ue_queues.schedule(ue_index, async move {
            this.remove_ue_context(ue_index).await;
            let _ = done_tx.send(());
        }) {
            warn!("Cannot schedule UE removal: ue={}", ue_index);
        }
        async move {
            let _ = done_rx.await;
        }
    }

    /// Removes a UE. Must run as the last task on the UE's queue.
    async fn remove_ue_context(&self, ue_index: UeIndex) {
        if !self.state.lock().ues.contains(ue_index) {
            debug!("UE already removed: ue={}", ue_index);
            self.ue_queues.remove_ue(ue_index);
            return;
        }

        self.ue_removal.remove_ue(ue_index).await;

        let removed = self.state.lock().ues.remove(ue_index);
        self.ue_events.cancel_ue(ue_index);
        self.ue_queues.remove_ue(ue_index);

        if let Some(ctx) = removed {
            info!(
                "UE context removed: ue={}, cu_ue_id={}, du_ue_id={:?}",
                ue_index,
                ctx.local_id,
                ctx.peer_id().map(|id| id.0)
            );
        }
    }

    async fn remove_ues(self: &Arc<Self>, ues: Vec<UeIndex>) {
        let removals: Vec<_> = ues
            .into_iter()
            .map(|ue_index| self.schedule_ue_removal(ue_index))
            .collect();
        futures::future::join_all(removals).await;
    }

    async fn on_connection_lost(self: &Arc<Self>) {
        self.state.lock().f1 = CuF1Context::default();
        self.transactions.cancel_all();
        self.ue_events.cancel_all();
        self.cu_cp.on_du_disconnected();

        let ues = self.state.lock().ues.ue_indexes();
        if !ues.is_empty() {
            info!("Removing UEs of the lost F1-C association: count={}", ues.len());
        }
        self.remove_ues(ues).await;
    }
}

impl F1cEventHandler for F1apCu {
    fn handle_message(&self, msg: F1apMessage) {
        if let Some(this) = self.arc() {
            this.dispatch(msg);
        }
    }

    fn handle_connection_loss(&self) {
        let Some(this) = self.arc() else {
            return;
        };
        warn!("F1-C association to DU lost");
        // procedures blocking the queues are released now, not at their deadline
        self.transactions.cancel_all();
        self.ue_events.cancel_all();
        self.schedule_ctrl(async move { this.on_connection_lost().await });
    }
}

fn outcome_info(response: &ProcedureResponse) -> (&'static str, ProcedureCode, TriggeringMessage) {
    match response {
        Ok(msg) => (msg.name(), msg.procedure_code(), TriggeringMessage::SuccessfulOutcome),
        Err(msg) => (msg.name(), msg.procedure_code(), TriggeringMessage::UnsuccessfulOutcome),
    }
}
