//! Error Indication Procedure
//!
//! TS 38.473 Section 8.2.2. Reports errors detected in an incoming message
//! that cannot be reported by an appropriate failure message. Class 2
//! procedure (no response expected).

use crate::cause::F1apCause;
use crate::ids::{GnbCuUeF1apId, GnbDuUeF1apId, TransactionId};
use crate::pdu::{Criticality, ProcedureCode, TriggeringMessage};

/// Criticality Diagnostics IE (TS 38.473 Section 9.3.1.3)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CriticalityDiagnostics {
    /// Procedure code of the message that caused the error
    pub procedure_code: Option<ProcedureCode>,
    /// Triggering message type
    pub triggering_message: Option<TriggeringMessage>,
    /// Criticality of the procedure
    pub procedure_criticality: Option<Criticality>,
    /// Transaction ID of the erroneous message
    pub transaction_id: Option<TransactionId>,
    /// IEs that caused the error
    pub ies_criticality_diagnostics: Vec<IeCriticalityDiagnostics>,
}

/// Type of error for an IE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOfError {
    NotUnderstood,
    Missing,
}

/// IE criticality diagnostics item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IeCriticalityDiagnostics {
    pub ie_criticality: Criticality,
    pub ie_id: u16,
    pub type_of_error: TypeOfError,
}

/// ERROR INDICATION
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorIndication {
    pub transaction_id: TransactionId,
    /// Present when the erroneous message was UE-associated
    pub gnb_cu_ue_f1ap_id: Option<GnbCuUeF1apId>,
    pub gnb_du_ue_f1ap_id: Option<GnbDuUeF1apId>,
    pub cause: Option<F1apCause>,
    pub criticality_diagnostics: Option<CriticalityDiagnostics>,
}

impl ErrorIndication {
    /// Error Indication that is not tied to a UE
    pub fn non_ue(transaction_id: TransactionId, cause: F1apCause) -> Self {
        Self {
            transaction_id,
            gnb_cu_ue_f1ap_id: None,
            gnb_du_ue_f1ap_id: None,
            cause: Some(cause),
            criticality_diagnostics: None,
        }
    }

    /// Error Indication echoing the UE F1AP IDs of the erroneous message
    pub fn for_ue(
        transaction_id: TransactionId,
        gnb_cu_ue_f1ap_id: Option<GnbCuUeF1apId>,
        gnb_du_ue_f1ap_id: Option<GnbDuUeF1apId>,
        cause: F1apCause,
    ) -> Self {
        Self {
            transaction_id,
            gnb_cu_ue_f1ap_id,
            gnb_du_ue_f1ap_id,
            cause: Some(cause),
            criticality_diagnostics: None,
        }
    }

    /// Attaches criticality diagnostics pointing at the erroneous message
    pub fn with_diagnostics(
        mut self,
        procedure_code: ProcedureCode,
        triggering_message: TriggeringMessage,
    ) -> Self {
        self.criticality_diagnostics = Some(CriticalityDiagnostics {
            procedure_code: Some(procedure_code),
            triggering_message: Some(triggering_message),
            procedure_criticality: Some(procedure_code.criticality()),
            transaction_id: None,
            ies_criticality_diagnostics: Vec::new(),
        });
        self
    }
}
