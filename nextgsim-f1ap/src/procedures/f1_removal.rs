//! F1 Removal Procedure
//!
//! TS 38.473 Section 8.2.8. Removes the F1 interface instance and the related
//! resources; UE contexts on the interface are released implicitly.

use crate::cause::F1apCause;
use crate::ids::TransactionId;

/// F1 REMOVAL REQUEST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct F1RemovalRequest {
    pub transaction_id: TransactionId,
}

/// F1 REMOVAL RESPONSE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct F1RemovalResponse {
    pub transaction_id: TransactionId,
}

/// F1 REMOVAL FAILURE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct F1RemovalFailure {
    pub transaction_id: TransactionId,
    pub cause: F1apCause,
}
