//! RRC Message Transfer Procedures
//!
//! TS 38.473 Section 8.4: Initial UL RRC Message Transfer, DL RRC Message
//! Transfer, UL RRC Message Transfer and RRC Delivery Report. All are Class 2.

use bytes::Bytes;

use crate::ids::{GnbCuUeF1apId, GnbDuUeF1apId, NrCgi, SrbId};

/// INITIAL UL RRC MESSAGE TRANSFER
///
/// First message of a UE on the F1 interface. Carries only the DU side ID; the
/// gNB-CU allocates its own ID on reception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialUlRrcMessageTransfer {
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub nr_cgi: NrCgi,
    pub c_rnti: u16,
    /// CCCH message received on SRB0
    pub rrc_container: Bytes,
    /// CellGroupConfig generated by the gNB-DU
    pub du_to_cu_rrc_container: Option<Bytes>,
}

/// UL RRC MESSAGE TRANSFER
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlRrcMessageTransfer {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub srb_id: SrbId,
    /// PDCP PDU
    pub rrc_container: Bytes,
    /// Set when a reestablishment moved the UE to a new gNB-DU UE F1AP ID
    pub new_gnb_du_ue_f1ap_id: Option<GnbDuUeF1apId>,
}

/// DL RRC MESSAGE TRANSFER
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlRrcMessageTransfer {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    /// gNB-DU UE F1AP ID of the UE context being reestablished
    pub old_gnb_du_ue_f1ap_id: Option<GnbDuUeF1apId>,
    pub srb_id: SrbId,
    /// PDCP PDU (or CCCH message for SRB0)
    pub rrc_container: Bytes,
    /// Asks the gNB-DU for an RRC Delivery Report once the PDU is delivered
    pub rrc_delivery_status_request: bool,
}

/// RRC Delivery Status IE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RrcDeliveryStatus {
    /// Highest PDCP SN of the successfully delivered PDUs
    pub delivery_status: u32,
    /// PDCP SN of the PDU that requested the report
    pub triggering_message: u32,
}

/// RRC DELIVERY REPORT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RrcDeliveryReport {
    pub gnb_cu_ue_f1ap_id: GnbCuUeF1apId,
    pub gnb_du_ue_f1ap_id: GnbDuUeF1apId,
    pub rrc_delivery_status: RrcDeliveryStatus,
    pub srb_id: SrbId,
}
