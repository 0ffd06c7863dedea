//! F1AP protocol engine for the nextgsim CU/DU split
//!
//! Runs the F1AP (TS 38.473) procedures on decoded messages from
//! `nextgsim-f1ap`:
//!
//! - `F1apDu`: gNB-DU side (F1 Setup initiator, UE context responders, SRB
//!   delivery tracking, ...)
//! - `F1apCu`: gNB-CU side (F1 Setup responder, UE context initiators, ...)
//!
//! Each engine owns one common task queue for interface-wide procedures and a
//! task queue per UE. Non UE-associated responses are correlated through the
//! transaction manager, UE-associated ones through the UE event sources.
//!
//! # Example
//!
//! ```ignore
//! use nextgsim_f1::{F1apConfig, F1apDu};
//!
//! let du = F1apDu::new(F1apConfig::default(), du_manager, ue_removal)?;
//! du.connect_to_cu(&client);
//! let response = du.handle_f1_setup_request(setup_params).await?;
//! ```

pub mod bearer;
pub mod connection;
pub mod cu;
pub mod du;
pub mod error;
pub mod event_source;
pub mod executor;
pub mod id_binding;
pub mod interfaces;
mod reset;
pub mod transaction;
pub mod ue_context;

use std::fmt;

use nextgsim_f1ap::{F1apMessage, UeF1apId};

pub use bearer::{
    BearerTxSink, DeliveryAwait, DeliveryReportNotifier, SnExtractor, SrbDeliveryTracker,
    SrbPdcpSnExtractor,
};
pub use connection::{
    ConnectionState, F1cConnectionClient, F1cConnectionHandler, F1cEventHandler,
    F1cMessageNotifier,
};
pub use cu::{CuUeContextSetupRequest, F1apCu, F1apCuCpNotifier, F1SetupDecision};
pub use du::{
    DuInitialUlRrcMessage, DuModificationRequired, DuUeContextModResult, DuUeContextSetupResult,
    F1SetupFailureReason, F1SetupRequestParams, F1apDu, F1apDuManager,
};
pub use error::F1Error;
pub use event_source::{UeEventSources, UeEventSubscription, UeProcedureKind};
pub use executor::{FifoTaskQueue, TaskExecutor, UeTaskScheduler};
pub use id_binding::{check_peer_id, PeerIdCheck};
pub use interfaces::{ProcedureError, UeRemovalHandler};
pub use nextgsim_common::F1apConfig;
pub use transaction::{
    AbortReason, ProcedureOutcome, ProcedureResponse, Transaction, TransactionManager,
};
pub use ue_context::{
    CuUeContext, DuUeContext, ReleaseState, RrcConfigState, UeContext, UeContextStore, UeIndex,
};

/// Side of the F1 interface an engine runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum F1Side {
    Cu,
    Du,
}

impl F1Side {
    pub fn as_str(self) -> &'static str {
        match self {
            F1Side::Cu => "CU",
            F1Side::Du => "DU",
        }
    }

    /// UE F1AP ID allocated by this side, as carried by a message
    pub(crate) fn local_ue_id(self, msg: &F1apMessage) -> Option<u32> {
        match self {
            F1Side::Cu => msg.gnb_cu_ue_f1ap_id().map(UeF1apId::value),
            F1Side::Du => msg.gnb_du_ue_f1ap_id().map(UeF1apId::value),
        }
    }
}

impl fmt::Display for F1Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
