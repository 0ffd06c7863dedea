//! Test fixtures: cells, configuration and F1 Setup parameters

use bytes::Bytes;
use nextgsim_f1::{F1SetupRequestParams, F1apConfig};
use nextgsim_f1ap::procedures::ServedCellInfo;
use nextgsim_f1ap::{GnbDuId, NrCgi};

pub const TEST_PLMN: [u8; 3] = [0x00, 0xf1, 0x10];

pub fn test_nr_cgi(cell: u64) -> NrCgi {
    NrCgi::new(TEST_PLMN, cell)
}

pub fn served_cell(cell: u64) -> ServedCellInfo {
    ServedCellInfo {
        nr_cgi: test_nr_cgi(cell),
        nr_pci: cell as u16,
        five_gs_tac: Some(1),
        meas_timing_config: Bytes::from_static(&[0x10, 0x20]),
        system_information: None,
    }
}

/// Engine configuration with small pools
pub fn test_config() -> F1apConfig {
    F1apConfig {
        max_ues: 16,
        ue_id_min: 1,
        ue_id_max: 1000,
        ..F1apConfig::default()
    }
}

pub fn setup_params(cells: &[u64]) -> F1SetupRequestParams {
    F1SetupRequestParams {
        gnb_du_id: GnbDuId(0x19),
        gnb_du_name: Some("nextgsim-du".to_string()),
        served_cells: cells.iter().map(|cell| served_cell(*cell)).collect(),
        rrc_version: (17, 4, 0),
    }
}

/// SRB PDCP PDU with the given 12-bit SN
pub fn pdcp_pdu(sn: u16, payload: &[u8]) -> Bytes {
    let mut pdu = vec![((sn >> 8) & 0x0f) as u8, (sn & 0xff) as u8];
    pdu.extend_from_slice(payload);
    Bytes::from(pdu)
}
