//! gNB-DU and gNB-CU Configuration Update Procedures
//!
//! TS 38.473 Sections 8.2.4 and 8.2.5. Both are Class 1 procedures used to
//! update application-level configuration after F1 Setup.

use crate::cause::{F1apCause, TimeToWait};
use crate::ids::{NrCgi, TransactionId};
use crate::procedures::f1_setup::{CellToActivate, ServedCellInfo};

/// Served cell modification item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedCellToModify {
    /// CGI of the cell being modified
    pub old_nr_cgi: NrCgi,
    pub served_cell_info: ServedCellInfo,
}

/// GNB-DU CONFIGURATION UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GnbDuConfigurationUpdate {
    pub transaction_id: TransactionId,
    pub served_cells_to_add: Vec<ServedCellInfo>,
    pub served_cells_to_modify: Vec<ServedCellToModify>,
    pub served_cells_to_delete: Vec<NrCgi>,
}

/// GNB-DU CONFIGURATION UPDATE ACKNOWLEDGE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnbDuConfigurationUpdateAcknowledge {
    pub transaction_id: TransactionId,
    pub cells_to_activate: Vec<CellToActivate>,
}

/// GNB-DU CONFIGURATION UPDATE FAILURE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnbDuConfigurationUpdateFailure {
    pub transaction_id: TransactionId,
    pub cause: F1apCause,
    pub time_to_wait: Option<TimeToWait>,
}

/// GNB-CU CONFIGURATION UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GnbCuConfigurationUpdate {
    pub transaction_id: TransactionId,
    pub cells_to_activate: Vec<CellToActivate>,
    pub cells_to_deactivate: Vec<NrCgi>,
}

/// GNB-CU CONFIGURATION UPDATE ACKNOWLEDGE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnbCuConfigurationUpdateAcknowledge {
    pub transaction_id: TransactionId,
    /// Cells the gNB-DU could not activate
    pub cells_failed_to_activate: Vec<(NrCgi, F1apCause)>,
}

/// GNB-CU CONFIGURATION UPDATE FAILURE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnbCuConfigurationUpdateFailure {
    pub transaction_id: TransactionId,
    pub cause: F1apCause,
    pub time_to_wait: Option<TimeToWait>,
}
