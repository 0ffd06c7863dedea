//! gNB-CU and gNB-DU engines wired through a loopback association

use std::sync::Arc;

use bytes::Bytes;
use nextgsim_f1::{DuInitialUlRrcMessage, F1apConfig, F1apCu, F1apDu, UeIndex};
use nextgsim_f1ap::{GnbCuUeF1apId, GnbDuUeF1apId, SrbId};

use crate::loopback::LoopbackF1c;
use crate::mock_cu_cp::MockCuCp;
use crate::mock_du::{MockDuManager, RecordingUeRemoval};
use crate::test_fixtures::{setup_params, test_config, test_nr_cgi};
use crate::test_utils::{settle, TestResult};

/// UE known to both engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachedUe {
    pub du_ue: UeIndex,
    pub cu_ue: UeIndex,
    pub du_ue_id: GnbDuUeF1apId,
    pub cu_ue_id: GnbCuUeF1apId,
}

pub struct TestBench {
    pub cu: Arc<F1apCu>,
    pub du: Arc<F1apDu>,
    pub cu_cp: Arc<MockCuCp>,
    pub du_mng: Arc<MockDuManager>,
    pub cu_removal: Arc<RecordingUeRemoval>,
    pub du_removal: Arc<RecordingUeRemoval>,
    pub link: Arc<LoopbackF1c>,
}

impl TestBench {
    /// Creates both engines. Must run inside a tokio runtime.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(cfg: F1apConfig) -> Self {
        let cu_cp = MockCuCp::new();
        let du_mng = MockDuManager::new();
        let cu_removal = RecordingUeRemoval::new();
        let du_removal = RecordingUeRemoval::new();

        let cu = F1apCu::new(cfg.clone(), cu_cp.clone(), cu_removal.clone())
            .expect("valid gNB-CU config");
        let du = F1apDu::new(cfg, du_mng.clone(), du_removal.clone())
            .expect("valid gNB-DU config");
        let link = LoopbackF1c::new(cu.clone());

        Self {
            cu,
            du,
            cu_cp,
            du_mng,
            cu_removal,
            du_removal,
            link,
        }
    }

    pub fn connect(&self) -> bool {
        self.du.connect_to_cu(self.link.as_ref())
    }

    /// Connects and runs F1 Setup for cell 1
    pub async fn start(&self) -> TestResult {
        if !self.connect() {
            return Err("F1-C connection refused".into());
        }
        self.du.handle_f1_setup_request(setup_params(&[1])).await?;
        Ok(())
    }

    /// UE access: Initial UL RRC Message from the gNB-DU, then RRC Setup on
    /// SRB0 from the gNB-CU, after which both sides know both UE F1AP IDs
    pub async fn attach_ue(&self, du_ue: UeIndex, c_rnti: u16) -> TestResult<AttachedUe> {
        let du_ue_id = self.du.handle_initial_ul_rrc_message(DuInitialUlRrcMessage {
            ue_index: du_ue,
            nr_cgi: test_nr_cgi(1),
            c_rnti,
            rrc_container: Bytes::from_static(b"rrc-setup-request"),
            du_to_cu_rrc_container: Some(Bytes::from_static(b"cell-group-config")),
        })?;
        settle().await;

        let cu_ue = self
            .cu
            .ue_index_by_du_ue_id(du_ue_id)
            .ok_or("gNB-CU did not create the UE")?;
        let cu_ue_id = self
            .cu
            .ue_context(cu_ue)
            .map(|ctx| ctx.local_id)
            .ok_or("gNB-CU UE context missing")?;

        self.cu.handle_dl_rrc_message_transfer(
            cu_ue,
            SrbId::Srb0,
            Bytes::from_static(b"rrc-setup"),
            false,
        )?;
        settle().await;

        Ok(AttachedUe {
            du_ue,
            cu_ue,
            du_ue_id,
            cu_ue_id,
        })
    }
}

impl Default for TestBench {
    fn default() -> Self {
        Self::new()
    }
}
