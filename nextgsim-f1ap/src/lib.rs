//! F1AP (F1 Application Protocol) message library
//!
//! Decoded representation of the F1AP messages exchanged between a gNB-CU and
//! a gNB-DU over the F1-C interface (3GPP TS 38.473). The ASN.1 PER codec is
//! outside of this crate; everything here is already-decoded message structs
//! that the protocol engine (`nextgsim-f1`) consumes and produces.
//!
//! # Modules
//!
//! - `ids` - UE F1AP IDs, transaction IDs, bearer and cell identifiers
//! - `cause` - Cause taxonomy (radio network, transport, protocol, misc)
//! - `pdu` - The F1AP PDU envelope, procedure codes and ID extraction
//! - `procedures` - Per-procedure message structs

pub mod cause;
pub mod error;
pub mod ids;
pub mod pdu;
pub mod procedures;

pub use cause::{
    F1apCause, MiscCause, ProtocolCause, RadioNetworkCause, TimeToWait, TransportCause,
};
pub use error::F1apError;
pub use ids::{
    DrbId, GnbCuUeF1apId, GnbDuId, GnbDuUeF1apId, NrCgi, SrbId, TransactionId, UeF1apId,
    UeF1apIdPair,
};
pub use pdu::{
    Criticality, F1apMessage, InitiatingMessage, ProcedureCode, SuccessfulOutcome,
    TriggeringMessage, UnsuccessfulOutcome,
};
