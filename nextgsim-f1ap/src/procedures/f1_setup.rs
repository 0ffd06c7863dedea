//! F1 Setup Procedure
//!
//! TS 38.473 Section 8.2.3. Initiated by the gNB-DU to exchange the
//! application-level data needed for the gNB-DU and gNB-CU to interoperate on
//! the F1 interface. Class 1 procedure.

use bytes::Bytes;

use crate::cause::{F1apCause, TimeToWait};
use crate::ids::{GnbDuId, NrCgi, TransactionId};
use crate::procedures::error_indication::CriticalityDiagnostics;

/// Served cell information reported by the gNB-DU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedCellInfo {
    /// NR CGI of the cell
    pub nr_cgi: NrCgi,
    /// NR Physical Cell ID (0..1007)
    pub nr_pci: u16,
    /// 5GS Tracking Area Code (3 octets)
    pub five_gs_tac: Option<u32>,
    /// Measurement timing configuration, opaque RRC container
    pub meas_timing_config: Bytes,
    /// System information (MIB / SIB1), opaque RRC containers
    pub system_information: Option<GnbDuSystemInformation>,
}

/// gNB-DU System Information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnbDuSystemInformation {
    pub mib_message: Bytes,
    pub sib1_message: Bytes,
}

/// Cell to be activated, as instructed by the gNB-CU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellToActivate {
    pub nr_cgi: NrCgi,
    /// NR PCI, only present if the gNB-CU overrides it
    pub nr_pci: Option<u16>,
}

/// F1 SETUP REQUEST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F1SetupRequest {
    pub transaction_id: TransactionId,
    pub gnb_du_id: GnbDuId,
    pub gnb_du_name: Option<String>,
    pub served_cells: Vec<ServedCellInfo>,
    /// Latest RRC version supported by the gNB-DU (major, minor, revision)
    pub rrc_version: (u8, u8, u8),
}

/// F1 SETUP RESPONSE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F1SetupResponse {
    pub transaction_id: TransactionId,
    pub gnb_cu_name: Option<String>,
    pub cells_to_activate: Vec<CellToActivate>,
    pub gnb_cu_rrc_version: (u8, u8, u8),
}

/// F1 SETUP FAILURE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F1SetupFailure {
    pub transaction_id: TransactionId,
    pub cause: F1apCause,
    /// Present when the gNB-CU allows the gNB-DU to retry after a wait
    pub time_to_wait: Option<TimeToWait>,
    pub criticality_diagnostics: Option<CriticalityDiagnostics>,
}
