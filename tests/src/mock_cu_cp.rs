//! Scriptable CU-CP for the gNB-CU engine

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nextgsim_f1::{F1SetupDecision, F1apCuCpNotifier, UeIndex};
use nextgsim_f1ap::procedures::{
    CellToActivate, F1SetupRequest, GnbDuConfigurationUpdate, InitialUlRrcMessageTransfer,
    RrcDeliveryReport, RrcDeliveryStatus, UeContextModificationRequired,
};
use nextgsim_f1ap::{F1apCause, GnbDuUeF1apId, MiscCause, SrbId, TimeToWait};
use parking_lot::Mutex;

/// What the gNB-CU engine reported to the CU-CP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CuCpEvent {
    UeCreated {
        ue_index: UeIndex,
        du_ue_id: GnbDuUeF1apId,
        c_rnti: u16,
    },
    UlRrcMessage {
        ue_index: UeIndex,
        srb_id: SrbId,
        pdu: Bytes,
    },
    DeliveryReport {
        ue_index: UeIndex,
        status: RrcDeliveryStatus,
    },
    ReleaseRequest {
        ue_index: UeIndex,
        cause: F1apCause,
    },
    ModificationRequired {
        ue_index: UeIndex,
    },
    DuDisconnected,
}

pub struct MockCuCp {
    events: Mutex<Vec<CuCpEvent>>,
    next_ue_index: AtomicU32,
    setup_requests: AtomicUsize,
    /// Number of F1 Setup Requests to reject with Time To Wait before
    /// accepting
    pub reject_with_wait: Mutex<u32>,
    pub time_to_wait: Mutex<Option<TimeToWait>>,
    pub refuse_ue_creation: Mutex<bool>,
    pub modification_required_answer: Mutex<Result<Option<Bytes>, F1apCause>>,
}

impl Default for MockCuCp {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            next_ue_index: AtomicU32::new(1),
            setup_requests: AtomicUsize::new(0),
            reject_with_wait: Mutex::new(0),
            time_to_wait: Mutex::new(Some(TimeToWait::V1s)),
            refuse_ue_creation: Mutex::new(false),
            modification_required_answer: Mutex::new(Ok(Some(Bytes::from_static(b"rrc-reconf")))),
        }
    }
}

impl MockCuCp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<CuCpEvent> {
        self.events.lock().clone()
    }

    pub fn setup_requests(&self) -> usize {
        self.setup_requests.load(Ordering::SeqCst)
    }

    pub fn ul_rrc_messages(&self, ue_index: UeIndex) -> Vec<(SrbId, Bytes)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                CuCpEvent::UlRrcMessage {
                    ue_index: ue,
                    srb_id,
                    pdu,
                } if *ue == ue_index => Some((*srb_id, pdu.clone())),
                _ => None,
            })
            .collect()
    }

    /// UE created by the last Initial UL RRC Message Transfer
    pub fn last_created_ue(&self) -> Option<UeIndex> {
        self.events.lock().iter().rev().find_map(|event| match event {
            CuCpEvent::UeCreated { ue_index, .. } => Some(*ue_index),
            _ => None,
        })
    }

    fn record(&self, event: CuCpEvent) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl F1apCuCpNotifier for MockCuCp {
    async fn on_f1_setup_request(&self, request: &F1SetupRequest) -> F1SetupDecision {
        self.setup_requests.fetch_add(1, Ordering::SeqCst);

        let reject = {
            let mut left = self.reject_with_wait.lock();
            if *left > 0 {
                *left -= 1;
                true
            } else {
                false
            }
        };
        if reject {
            return F1SetupDecision::Reject {
                cause: F1apCause::Misc(MiscCause::ControlProcessingOverload),
                time_to_wait: *self.time_to_wait.lock(),
            };
        }

        F1SetupDecision::Accept {
            gnb_cu_name: Some("nextgsim-cu".to_string()),
            cells_to_activate: request
                .served_cells
                .iter()
                .map(|cell| CellToActivate {
                    nr_cgi: cell.nr_cgi,
                    nr_pci: Some(cell.nr_pci),
                })
                .collect(),
            gnb_cu_rrc_version: (17, 4, 0),
        }
    }

    async fn on_gnb_du_configuration_update(
        &self,
        update: &GnbDuConfigurationUpdate,
    ) -> Result<Vec<CellToActivate>, F1apCause> {
        Ok(update
            .served_cells_to_add
            .iter()
            .map(|cell| CellToActivate {
                nr_cgi: cell.nr_cgi,
                nr_pci: None,
            })
            .collect())
    }

    fn on_ue_creation_request(&self, msg: &InitialUlRrcMessageTransfer) -> Option<UeIndex> {
        if *self.refuse_ue_creation.lock() {
            return None;
        }
        let ue_index = UeIndex(self.next_ue_index.fetch_add(1, Ordering::SeqCst));
        self.record(CuCpEvent::UeCreated {
            ue_index,
            du_ue_id: msg.gnb_du_ue_f1ap_id,
            c_rnti: msg.c_rnti,
        });
        Some(ue_index)
    }

    fn on_ul_rrc_message(&self, ue_index: UeIndex, srb_id: SrbId, pdu: Bytes) {
        self.record(CuCpEvent::UlRrcMessage {
            ue_index,
            srb_id,
            pdu,
        });
    }

    fn on_rrc_delivery_report(&self, ue_index: UeIndex, report: &RrcDeliveryReport) {
        self.record(CuCpEvent::DeliveryReport {
            ue_index,
            status: report.rrc_delivery_status,
        });
    }

    fn on_ue_context_release_request(&self, ue_index: UeIndex, cause: F1apCause) {
        self.record(CuCpEvent::ReleaseRequest { ue_index, cause });
    }

    async fn on_ue_context_modification_required(
        &self,
        ue_index: UeIndex,
        _required: &UeContextModificationRequired,
    ) -> Result<Option<Bytes>, F1apCause> {
        self.record(CuCpEvent::ModificationRequired { ue_index });
        self.modification_required_answer.lock().clone()
    }

    fn on_du_disconnected(&self) {
        self.record(CuCpEvent::DuDisconnected);
    }
}
