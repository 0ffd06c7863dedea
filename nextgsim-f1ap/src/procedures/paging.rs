//! Paging Procedure
//!
//! TS 38.473 Section 8.7. Sent by the gNB-CU to let the gNB-DU page a UE in
//! the listed cells. Class 2, non UE-associated.

use crate::ids::NrCgi;

/// UE Paging Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingIdentity {
    /// RAN UE Paging identity (full I-RNTI, 40 bits)
    Ran(u64),
    /// CN UE Paging identity (5G-S-TMSI, 48 bits)
    Cn(u64),
}

/// Paging DRX values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingDrx {
    V32,
    V64,
    V128,
    V256,
}

/// PAGING
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paging {
    /// UE Identity Index value (10 bits)
    pub ue_identity_index: u16,
    pub paging_identity: PagingIdentity,
    pub paging_drx: Option<PagingDrx>,
    /// Paging priority (1..8)
    pub paging_priority: Option<u8>,
    pub paging_cells: Vec<NrCgi>,
}
