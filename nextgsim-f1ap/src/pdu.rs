//! F1AP PDU envelope
//!
//! The F1AP-PDU CHOICE (TS 38.473 Section 9.4.4): an initiating message, a
//! successful outcome or an unsuccessful outcome, each discriminated by the
//! procedure code. The helpers here give the protocol engine what it needs for
//! dispatch without looking at the payload: procedure code, message name,
//! transaction ID and the pair of UE F1AP IDs.

use crate::error::F1apError;
use crate::ids::{GnbCuUeF1apId, GnbDuUeF1apId, TransactionId, UeF1apIdPair};
use crate::procedures::*;

/// Elementary procedure codes (TS 38.473 Section 9.4.7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcedureCode {
    Reset,
    F1Setup,
    ErrorIndication,
    GnbDuConfigurationUpdate,
    GnbCuConfigurationUpdate,
    UeContextSetup,
    UeContextRelease,
    UeContextModification,
    UeContextModificationRequired,
    UeContextReleaseRequest,
    InitialUlRrcMessageTransfer,
    DlRrcMessageTransfer,
    UlRrcMessageTransfer,
    Paging,
    RrcDeliveryReport,
    F1Removal,
}

impl ProcedureCode {
    /// ProcedureCode value on the wire
    pub fn value(self) -> u8 {
        match self {
            ProcedureCode::Reset => 0,
            ProcedureCode::F1Setup => 1,
            ProcedureCode::ErrorIndication => 2,
            ProcedureCode::GnbDuConfigurationUpdate => 3,
            ProcedureCode::GnbCuConfigurationUpdate => 4,
            ProcedureCode::UeContextSetup => 5,
            ProcedureCode::UeContextRelease => 6,
            ProcedureCode::UeContextModification => 7,
            ProcedureCode::UeContextModificationRequired => 8,
            ProcedureCode::UeContextReleaseRequest => 10,
            ProcedureCode::InitialUlRrcMessageTransfer => 11,
            ProcedureCode::DlRrcMessageTransfer => 12,
            ProcedureCode::UlRrcMessageTransfer => 13,
            ProcedureCode::Paging => 18,
            ProcedureCode::RrcDeliveryReport => 25,
            ProcedureCode::F1Removal => 26,
        }
    }

    /// Procedure criticality from the elementary procedure definitions
    pub fn criticality(self) -> Criticality {
        match self {
            ProcedureCode::Reset
            | ProcedureCode::F1Setup
            | ProcedureCode::GnbDuConfigurationUpdate
            | ProcedureCode::GnbCuConfigurationUpdate
            | ProcedureCode::UeContextSetup
            | ProcedureCode::UeContextRelease
            | ProcedureCode::UeContextModification
            | ProcedureCode::UeContextModificationRequired
            | ProcedureCode::F1Removal => Criticality::Reject,
            ProcedureCode::ErrorIndication
            | ProcedureCode::UeContextReleaseRequest
            | ProcedureCode::InitialUlRrcMessageTransfer
            | ProcedureCode::DlRrcMessageTransfer
            | ProcedureCode::UlRrcMessageTransfer
            | ProcedureCode::Paging
            | ProcedureCode::RrcDeliveryReport => Criticality::Ignore,
        }
    }
}

/// Criticality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    Reject,
    Ignore,
    Notify,
}

/// Triggering message type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggeringMessage {
    InitiatingMessage,
    SuccessfulOutcome,
    UnsuccessfulOutcome,
}

/// Initiating messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiatingMessage {
    F1SetupRequest(F1SetupRequest),
    GnbDuConfigurationUpdate(GnbDuConfigurationUpdate),
    GnbCuConfigurationUpdate(GnbCuConfigurationUpdate),
    Reset(Reset),
    ErrorIndication(ErrorIndication),
    F1RemovalRequest(F1RemovalRequest),
    InitialUlRrcMessageTransfer(InitialUlRrcMessageTransfer),
    UlRrcMessageTransfer(UlRrcMessageTransfer),
    DlRrcMessageTransfer(DlRrcMessageTransfer),
    RrcDeliveryReport(RrcDeliveryReport),
    UeContextSetupRequest(UeContextSetupRequest),
    UeContextModificationRequest(UeContextModificationRequest),
    UeContextModificationRequired(UeContextModificationRequired),
    UeContextReleaseRequest(UeContextReleaseRequest),
    UeContextReleaseCommand(UeContextReleaseCommand),
    Paging(Paging),
}

/// Successful outcomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessfulOutcome {
    F1SetupResponse(F1SetupResponse),
    GnbDuConfigurationUpdateAcknowledge(GnbDuConfigurationUpdateAcknowledge),
    GnbCuConfigurationUpdateAcknowledge(GnbCuConfigurationUpdateAcknowledge),
    ResetAcknowledge(ResetAcknowledge),
    F1RemovalResponse(F1RemovalResponse),
    UeContextSetupResponse(UeContextSetupResponse),
    UeContextModificationResponse(UeContextModificationResponse),
    UeContextModificationConfirm(UeContextModificationConfirm),
    UeContextReleaseComplete(UeContextReleaseComplete),
}

/// Unsuccessful outcomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsuccessfulOutcome {
    F1SetupFailure(F1SetupFailure),
    GnbDuConfigurationUpdateFailure(GnbDuConfigurationUpdateFailure),
    GnbCuConfigurationUpdateFailure(GnbCuConfigurationUpdateFailure),
    F1RemovalFailure(F1RemovalFailure),
    UeContextSetupFailure(UeContextSetupFailure),
    UeContextModificationFailure(UeContextModificationFailure),
    UeContextModificationRefuse(UeContextModificationRefuse),
}

/// F1AP-PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum F1apMessage {
    InitiatingMessage(InitiatingMessage),
    SuccessfulOutcome(SuccessfulOutcome),
    UnsuccessfulOutcome(UnsuccessfulOutcome),
}

impl InitiatingMessage {
    pub fn procedure_code(&self) -> ProcedureCode {
        match self {
            InitiatingMessage::F1SetupRequest(_) => ProcedureCode::F1Setup,
            InitiatingMessage::GnbDuConfigurationUpdate(_) => ProcedureCode::GnbDuConfigurationUpdate,
            InitiatingMessage::GnbCuConfigurationUpdate(_) => ProcedureCode::GnbCuConfigurationUpdate,
            InitiatingMessage::Reset(_) => ProcedureCode::Reset,
            InitiatingMessage::ErrorIndication(_) => ProcedureCode::ErrorIndication,
            InitiatingMessage::F1RemovalRequest(_) => ProcedureCode::F1Removal,
            InitiatingMessage::InitialUlRrcMessageTransfer(_) => {
                ProcedureCode::InitialUlRrcMessageTransfer
            }
            InitiatingMessage::UlRrcMessageTransfer(_) => ProcedureCode::UlRrcMessageTransfer,
            InitiatingMessage::DlRrcMessageTransfer(_) => ProcedureCode::DlRrcMessageTransfer,
            InitiatingMessage::RrcDeliveryReport(_) => ProcedureCode::RrcDeliveryReport,
            InitiatingMessage::UeContextSetupRequest(_) => ProcedureCode::UeContextSetup,
            InitiatingMessage::UeContextModificationRequest(_) => ProcedureCode::UeContextModification,
            InitiatingMessage::UeContextModificationRequired(_) => {
                ProcedureCode::UeContextModificationRequired
            }
            InitiatingMessage::UeContextReleaseRequest(_) => ProcedureCode::UeContextReleaseRequest,
            InitiatingMessage::UeContextReleaseCommand(_) => ProcedureCode::UeContextRelease,
            InitiatingMessage::Paging(_) => ProcedureCode::Paging,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InitiatingMessage::F1SetupRequest(_) => "F1SetupRequest",
            InitiatingMessage::GnbDuConfigurationUpdate(_) => "GNBDUConfigurationUpdate",
            InitiatingMessage::GnbCuConfigurationUpdate(_) => "GNBCUConfigurationUpdate",
            InitiatingMessage::Reset(_) => "Reset",
            InitiatingMessage::ErrorIndication(_) => "ErrorIndication",
            InitiatingMessage::F1RemovalRequest(_) => "F1RemovalRequest",
            InitiatingMessage::InitialUlRrcMessageTransfer(_) => "InitialULRRCMessageTransfer",
            InitiatingMessage::UlRrcMessageTransfer(_) => "ULRRCMessageTransfer",
            InitiatingMessage::DlRrcMessageTransfer(_) => "DLRRCMessageTransfer",
            InitiatingMessage::RrcDeliveryReport(_) => "RRCDeliveryReport",
            InitiatingMessage::UeContextSetupRequest(_) => "UEContextSetupRequest",
            InitiatingMessage::UeContextModificationRequest(_) => "UEContextModificationRequest",
            InitiatingMessage::UeContextModificationRequired(_) => "UEContextModificationRequired",
            InitiatingMessage::UeContextReleaseRequest(_) => "UEContextReleaseRequest",
            InitiatingMessage::UeContextReleaseCommand(_) => "UEContextReleaseCommand",
            InitiatingMessage::Paging(_) => "Paging",
        }
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            InitiatingMessage::F1SetupRequest(m) => Some(m.transaction_id),
            InitiatingMessage::GnbDuConfigurationUpdate(m) => Some(m.transaction_id),
            InitiatingMessage::GnbCuConfigurationUpdate(m) => Some(m.transaction_id),
            InitiatingMessage::Reset(m) => Some(m.transaction_id),
            InitiatingMessage::ErrorIndication(m) => Some(m.transaction_id),
            InitiatingMessage::F1RemovalRequest(m) => Some(m.transaction_id),
            _ => None,
        }
    }

    fn ue_ids(&self) -> Option<UeF1apIdPair> {
        match self {
            InitiatingMessage::InitialUlRrcMessageTransfer(m) => Some(UeF1apIdPair {
                cu: None,
                du: Some(m.gnb_du_ue_f1ap_id),
            }),
            InitiatingMessage::UlRrcMessageTransfer(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            InitiatingMessage::DlRrcMessageTransfer(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            InitiatingMessage::RrcDeliveryReport(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            InitiatingMessage::UeContextSetupRequest(m) => Some(UeF1apIdPair {
                cu: Some(m.gnb_cu_ue_f1ap_id),
                du: m.gnb_du_ue_f1ap_id,
            }),
            InitiatingMessage::UeContextModificationRequest(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            InitiatingMessage::UeContextModificationRequired(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            InitiatingMessage::UeContextReleaseRequest(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            InitiatingMessage::UeContextReleaseCommand(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            InitiatingMessage::ErrorIndication(m)
                if m.gnb_cu_ue_f1ap_id.is_some() || m.gnb_du_ue_f1ap_id.is_some() =>
            {
                Some(UeF1apIdPair {
                    cu: m.gnb_cu_ue_f1ap_id,
                    du: m.gnb_du_ue_f1ap_id,
                })
            }
            _ => None,
        }
    }
}

impl SuccessfulOutcome {
    pub fn procedure_code(&self) -> ProcedureCode {
        match self {
            SuccessfulOutcome::F1SetupResponse(_) => ProcedureCode::F1Setup,
            SuccessfulOutcome::GnbDuConfigurationUpdateAcknowledge(_) => {
                ProcedureCode::GnbDuConfigurationUpdate
            }
            SuccessfulOutcome::GnbCuConfigurationUpdateAcknowledge(_) => {
                ProcedureCode::GnbCuConfigurationUpdate
            }
            SuccessfulOutcome::ResetAcknowledge(_) => ProcedureCode::Reset,
            SuccessfulOutcome::F1RemovalResponse(_) => ProcedureCode::F1Removal,
            SuccessfulOutcome::UeContextSetupResponse(_) => ProcedureCode::UeContextSetup,
            SuccessfulOutcome::UeContextModificationResponse(_) => {
                ProcedureCode::UeContextModification
            }
            SuccessfulOutcome::UeContextModificationConfirm(_) => {
                ProcedureCode::UeContextModificationRequired
            }
            SuccessfulOutcome::UeContextReleaseComplete(_) => ProcedureCode::UeContextRelease,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SuccessfulOutcome::F1SetupResponse(_) => "F1SetupResponse",
            SuccessfulOutcome::GnbDuConfigurationUpdateAcknowledge(_) => {
                "GNBDUConfigurationUpdateAcknowledge"
            }
            SuccessfulOutcome::GnbCuConfigurationUpdateAcknowledge(_) => {
                "GNBCUConfigurationUpdateAcknowledge"
            }
            SuccessfulOutcome::ResetAcknowledge(_) => "ResetAcknowledge",
            SuccessfulOutcome::F1RemovalResponse(_) => "F1RemovalResponse",
            SuccessfulOutcome::UeContextSetupResponse(_) => "UEContextSetupResponse",
            SuccessfulOutcome::UeContextModificationResponse(_) => "UEContextModificationResponse",
            SuccessfulOutcome::UeContextModificationConfirm(_) => "UEContextModificationConfirm",
            SuccessfulOutcome::UeContextReleaseComplete(_) => "UEContextReleaseComplete",
        }
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            SuccessfulOutcome::F1SetupResponse(m) => Some(m.transaction_id),
            SuccessfulOutcome::GnbDuConfigurationUpdateAcknowledge(m) => Some(m.transaction_id),
            SuccessfulOutcome::GnbCuConfigurationUpdateAcknowledge(m) => Some(m.transaction_id),
            SuccessfulOutcome::ResetAcknowledge(m) => Some(m.transaction_id),
            SuccessfulOutcome::F1RemovalResponse(m) => Some(m.transaction_id),
            _ => None,
        }
    }

    fn ue_ids(&self) -> Option<UeF1apIdPair> {
        match self {
            SuccessfulOutcome::UeContextSetupResponse(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            SuccessfulOutcome::UeContextModificationResponse(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            SuccessfulOutcome::UeContextModificationConfirm(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            SuccessfulOutcome::UeContextReleaseComplete(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            _ => None,
        }
    }
}

impl UnsuccessfulOutcome {
    pub fn procedure_code(&self) -> ProcedureCode {
        match self {
            UnsuccessfulOutcome::F1SetupFailure(_) => ProcedureCode::F1Setup,
            UnsuccessfulOutcome::GnbDuConfigurationUpdateFailure(_) => {
                ProcedureCode::GnbDuConfigurationUpdate
            }
            UnsuccessfulOutcome::GnbCuConfigurationUpdateFailure(_) => {
                ProcedureCode::GnbCuConfigurationUpdate
            }
            UnsuccessfulOutcome::F1RemovalFailure(_) => ProcedureCode::F1Removal,
            UnsuccessfulOutcome::UeContextSetupFailure(_) => ProcedureCode::UeContextSetup,
            UnsuccessfulOutcome::UeContextModificationFailure(_) => {
                ProcedureCode::UeContextModification
            }
            UnsuccessfulOutcome::UeContextModificationRefuse(_) => {
                ProcedureCode::UeContextModificationRequired
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnsuccessfulOutcome::F1SetupFailure(_) => "F1SetupFailure",
            UnsuccessfulOutcome::GnbDuConfigurationUpdateFailure(_) => {
                "GNBDUConfigurationUpdateFailure"
            }
            UnsuccessfulOutcome::GnbCuConfigurationUpdateFailure(_) => {
                "GNBCUConfigurationUpdateFailure"
            }
            UnsuccessfulOutcome::F1RemovalFailure(_) => "F1RemovalFailure",
            UnsuccessfulOutcome::UeContextSetupFailure(_) => "UEContextSetupFailure",
            UnsuccessfulOutcome::UeContextModificationFailure(_) => "UEContextModificationFailure",
            UnsuccessfulOutcome::UeContextModificationRefuse(_) => "UEContextModificationRefuse",
        }
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            UnsuccessfulOutcome::F1SetupFailure(m) => Some(m.transaction_id),
            UnsuccessfulOutcome::GnbDuConfigurationUpdateFailure(m) => Some(m.transaction_id),
            UnsuccessfulOutcome::GnbCuConfigurationUpdateFailure(m) => Some(m.transaction_id),
            UnsuccessfulOutcome::F1RemovalFailure(m) => Some(m.transaction_id),
            _ => None,
        }
    }

    fn ue_ids(&self) -> Option<UeF1apIdPair> {
        match self {
            UnsuccessfulOutcome::UeContextSetupFailure(m) => Some(UeF1apIdPair {
                cu: Some(m.gnb_cu_ue_f1ap_id),
                du: m.gnb_du_ue_f1ap_id,
            }),
            UnsuccessfulOutcome::UeContextModificationFailure(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            UnsuccessfulOutcome::UeContextModificationRefuse(m) => {
                Some(pair(m.gnb_cu_ue_f1ap_id, m.gnb_du_ue_f1ap_id))
            }
            _ => None,
        }
    }
}

fn pair(cu: GnbCuUeF1apId, du: GnbDuUeF1apId) -> UeF1apIdPair {
    UeF1apIdPair::new(cu, du)
}

impl F1apMessage {
    /// Procedure code of the message
    pub fn procedure_code(&self) -> ProcedureCode {
        match self {
            F1apMessage::InitiatingMessage(m) => m.procedure_code(),
            F1apMessage::SuccessfulOutcome(m) => m.procedure_code(),
            F1apMessage::UnsuccessfulOutcome(m) => m.procedure_code(),
        }
    }

    /// Message name as used in logs, e.g. "UEContextSetupRequest"
    pub fn name(&self) -> &'static str {
        match self {
            F1apMessage::InitiatingMessage(m) => m.name(),
            F1apMessage::SuccessfulOutcome(m) => m.name(),
            F1apMessage::UnsuccessfulOutcome(m) => m.name(),
        }
    }

    /// Which of the three PDU choices this is
    pub fn message_type(&self) -> TriggeringMessage {
        match self {
            F1apMessage::InitiatingMessage(_) => TriggeringMessage::InitiatingMessage,
            F1apMessage::SuccessfulOutcome(_) => TriggeringMessage::SuccessfulOutcome,
            F1apMessage::UnsuccessfulOutcome(_) => TriggeringMessage::UnsuccessfulOutcome,
        }
    }

    /// Transaction ID, for non UE-associated messages
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            F1apMessage::InitiatingMessage(m) => m.transaction_id(),
            F1apMessage::SuccessfulOutcome(m) => m.transaction_id(),
            F1apMessage::UnsuccessfulOutcome(m) => m.transaction_id(),
        }
    }

    /// UE F1AP IDs, for UE-associated messages
    pub fn ue_ids(&self) -> Option<UeF1apIdPair> {
        match self {
            F1apMessage::InitiatingMessage(m) => m.ue_ids(),
            F1apMessage::SuccessfulOutcome(m) => m.ue_ids(),
            F1apMessage::UnsuccessfulOutcome(m) => m.ue_ids(),
        }
    }

    /// gNB-CU UE F1AP ID, if the message carries one
    pub fn gnb_cu_ue_f1ap_id(&self) -> Option<GnbCuUeF1apId> {
        self.ue_ids().and_then(|ids| ids.cu)
    }

    /// gNB-DU UE F1AP ID, if the message carries one
    pub fn gnb_du_ue_f1ap_id(&self) -> Option<GnbDuUeF1apId> {
        self.ue_ids().and_then(|ids| ids.du)
    }

    pub fn is_ue_associated(&self) -> bool {
        self.ue_ids().is_some()
    }
}

macro_rules! impl_pdu_conversions {
    ($choice:ident, $($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for $choice {
                fn from(msg: $variant) -> Self {
                    $choice::$variant(msg)
                }
            }

            impl From<$variant> for F1apMessage {
                fn from(msg: $variant) -> Self {
                    F1apMessage::$choice($choice::$variant(msg))
                }
            }

            impl TryFrom<$choice> for $variant {
                type Error = F1apError;

                fn try_from(msg: $choice) -> Result<Self, Self::Error> {
                    match msg {
                        $choice::$variant(m) => Ok(m),
                        #[allow(unreachable_patterns)]
                        other => Err(F1apError::UnexpectedMessage {
                            expected: stringify!($variant),
                            actual: other.name(),
                        }),
                    }
                }
            }
        )+
    };
}

impl_pdu_conversions!(
    InitiatingMessage,
    F1SetupRequest,
    GnbDuConfigurationUpdate,
    GnbCuConfigurationUpdate,
    Reset,
    ErrorIndication,
    F1RemovalRequest,
    InitialUlRrcMessageTransfer,
    UlRrcMessageTransfer,
    DlRrcMessageTransfer,
    RrcDeliveryReport,
    UeContextSetupRequest,
    UeContextModificationRequest,
    UeContextModificationRequired,
    UeContextReleaseRequest,
    UeContextReleaseCommand,
    Paging,
);

impl_pdu_conversions!(
    SuccessfulOutcome,
    F1SetupResponse,
    GnbDuConfigurationUpdateAcknowledge,
    GnbCuConfigurationUpdateAcknowledge,
    ResetAcknowledge,
    F1RemovalResponse,
    UeContextSetupResponse,
    UeContextModificationResponse,
    UeContextModificationConfirm,
    UeContextReleaseComplete,
);

impl_pdu_conversions!(
    UnsuccessfulOutcome,
    F1SetupFailure,
    GnbDuConfigurationUpdateFailure,
    GnbCuConfigurationUpdateFailure,
    F1RemovalFailure,
    UeContextSetupFailure,
    UeContextModificationFailure,
    UeContextModificationRefuse,
);

impl From<InitiatingMessage> for F1apMessage {
    fn from(msg: InitiatingMessage) -> Self {
        F1apMessage::InitiatingMessage(msg)
    }
}

impl From<SuccessfulOutcome> for F1apMessage {
    fn from(msg: SuccessfulOutcome) -> Self {
        F1apMessage::SuccessfulOutcome(msg)
    }
}

impl From<UnsuccessfulOutcome> for F1apMessage {
    fn from(msg: UnsuccessfulOutcome) -> Self {
        F1apMessage::UnsuccessfulOutcome(msg)
    }
}
