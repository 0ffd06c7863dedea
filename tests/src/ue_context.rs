//! UE context management across the F1 interface: setup, modification,
//! release and the gNB-DU initiated procedures

use bytes::Bytes;
use integration_tests::{init_test_logging, pdcp_pdu, settle, test_nr_cgi, CuCpEvent, TestBench};
use nextgsim_f1::{
    CuUeContextSetupRequest, DeliveryAwait, DuInitialUlRrcMessage, DuModificationRequired,
    DuUeContextModResult, ProcedureError, RrcConfigState, UeIndex,
};
use nextgsim_f1ap::procedures::UeContextModificationRequest;
use nextgsim_f1ap::{DrbId, F1apCause, GnbCuUeF1apId, GnbDuUeF1apId, RadioNetworkCause, SrbId};

fn setup_request(ue_index: UeIndex) -> CuUeContextSetupRequest {
    CuUeContextSetupRequest {
        ue_index,
        sp_cell_id: test_nr_cgi(1),
        serv_cell_index: 0,
        cu_to_du_rrc_info: Bytes::from_static(b"cg-config-info"),
        srbs_to_be_setup: vec![SrbId::Srb2],
        drbs_to_be_setup: Vec::new(),
        rrc_container: None,
        gnb_du_ue_ambr_ul: None,
    }
}

fn normal_release() -> F1apCause {
    F1apCause::RadioNetwork(RadioNetworkCause::NormalRelease)
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_setup_for_attached_ue() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    let mut request = setup_request(ue.cu_ue);
    request.rrc_container = Some(pdcp_pdu(1, b"security-mode-command"));
    let response = bench
        .cu
        .handle_ue_context_setup(request)
        .await
        .expect("UE Context Setup");
    settle().await;

    assert_eq!(response.gnb_cu_ue_f1ap_id, ue.cu_ue_id);
    assert_eq!(response.gnb_du_ue_f1ap_id, ue.du_ue_id);
    assert_eq!(response.srbs_setup, vec![SrbId::Srb2]);
    assert_eq!(response.du_to_cu_rrc_info, Bytes::from_static(b"cell-group-config"));

    assert!(bench.du.has_srb(ue.du_ue, SrbId::Srb2));
    assert_eq!(
        bench.du_mng.sent_pdus(ue.du_ue, SrbId::Srb1),
        vec![pdcp_pdu(1, b"security-mode-command")]
    );
    let du_ctx = bench.du.ue_context(ue.du_ue).expect("DU context");
    assert_eq!(du_ctx.peer_id(), Some(ue.cu_ue_id));
    assert_eq!(bench.cu.ue_context(ue.cu_ue).and_then(|ctx| ctx.c_rnti), Some(0x4601));
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_setup_creates_du_ue() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");

    let response = bench
        .cu
        .handle_ue_context_setup(setup_request(UeIndex(50)))
        .await
        .expect("UE Context Setup");
    settle().await;

    assert_eq!(bench.cu.nb_ues(), 1);
    assert_eq!(bench.du.nb_ues(), 1);

    let du_ue = bench
        .du
        .ue_index_by_du_ue_id(response.gnb_du_ue_f1ap_id)
        .expect("DU UE");
    assert_eq!(du_ue, UeIndex(100));

    let cu_ctx = bench.cu.ue_context(UeIndex(50)).expect("CU context");
    assert_eq!(cu_ctx.peer_id(), Some(response.gnb_du_ue_f1ap_id));
    let du_ctx = bench.du.ue_context(du_ue).expect("DU context");
    assert_eq!(du_ctx.peer_id(), Some(cu_ctx.local_id));
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_setup_failure_removes_new_ue() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let cause = F1apCause::RadioNetwork(RadioNetworkCause::NoRadioResourcesAvailable);
    *bench.du_mng.setup_result.lock() = Err(cause);

    let result = bench.cu.handle_ue_context_setup(setup_request(UeIndex(50))).await;
    settle().await;

    assert_eq!(result, Err(ProcedureError::Rejected(cause)));
    assert_eq!(bench.cu.nb_ues(), 0);
    assert_eq!(bench.du.nb_ues(), 0);
    assert!(bench.cu_removal.was_removed(UeIndex(50)));
    assert!(bench.du_removal.was_removed(UeIndex(100)));
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_setup_refused_by_du_manager() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    *bench.du_mng.refuse_ue_creation.lock() = true;

    let result = bench.cu.handle_ue_context_setup(setup_request(UeIndex(50))).await;

    assert_eq!(
        result,
        Err(ProcedureError::Rejected(F1apCause::RadioNetwork(
            RadioNetworkCause::NoRadioResourcesAvailable
        )))
    );
    assert_eq!(bench.cu.nb_ues(), 0);
    assert_eq!(bench.du.nb_ues(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_modification() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    bench
        .cu
        .handle_ue_context_setup(setup_request(ue.cu_ue))
        .await
        .expect("UE Context Setup");

    *bench.du_mng.mod_result.lock() = Ok(DuUeContextModResult {
        du_to_cu_rrc_info: Some(Bytes::from_static(b"cell-group-config-2")),
        srbs_setup_mod: vec![SrbId::Srb3],
        ..Default::default()
    });

    // the engine fills in the UE F1AP IDs
    let mut request = UeContextModificationRequest::new(GnbCuUeF1apId(0), GnbDuUeF1apId(0));
    request.srbs_to_be_setup_mod = vec![SrbId::Srb3];
    request.srbs_to_be_released = vec![SrbId::Srb2];
    request.rrc_container = Some(pdcp_pdu(2, b"rrc-reconfiguration"));

    let response = bench
        .cu
        .handle_ue_context_modification(ue.cu_ue, request)
        .await
        .expect("UE Context Modification");
    settle().await;

    assert_eq!(response.gnb_cu_ue_f1ap_id, ue.cu_ue_id);
    assert_eq!(response.gnb_du_ue_f1ap_id, ue.du_ue_id);
    assert_eq!(response.srbs_setup_mod, vec![SrbId::Srb3]);
    assert!(bench.du.has_srb(ue.du_ue, SrbId::Srb3));
    assert!(!bench.du.has_srb(ue.du_ue, SrbId::Srb2));
    assert!(bench
        .du_mng
        .sent_pdus(ue.du_ue, SrbId::Srb1)
        .contains(&pdcp_pdu(2, b"rrc-reconfiguration")));
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_modification_rejected() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    let cause = F1apCause::RadioNetwork(RadioNetworkCause::NoRadioResourcesAvailable);
    *bench.du_mng.mod_result.lock() = Err(cause);

    let request = UeContextModificationRequest::new(GnbCuUeF1apId(0), GnbDuUeF1apId(0));
    let result = bench.cu.handle_ue_context_modification(ue.cu_ue, request).await;

    assert_eq!(result, Err(ProcedureError::Rejected(cause)));
    // a failed modification leaves the UE in place
    assert!(bench.cu.ue_context(ue.cu_ue).is_some());
    assert!(bench.du.ue_context(ue.du_ue).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_release_with_rrc_release() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    let release = tokio::spawn(bench.cu.handle_ue_context_release_command(
        ue.cu_ue,
        normal_release(),
        Some(pdcp_pdu(3, b"rrc-release")),
        Some(SrbId::Srb1),
    ));
    settle().await;

    // the gNB-DU holds the context until the RRC Release is delivered
    assert_eq!(bench.du_mng.deactivated.lock().clone(), vec![ue.du_ue]);
    assert_eq!(
        bench.du_mng.sent_pdus(ue.du_ue, SrbId::Srb1),
        vec![pdcp_pdu(3, b"rrc-release")]
    );
    assert!(bench.du.ue_context(ue.du_ue).is_some());
    assert_eq!(bench.link.count_to_cu("UEContextReleaseComplete"), 0);

    assert!(bench
        .du
        .handle_srb_notification(ue.du_ue, SrbId::Srb1, DeliveryAwait::Delivery, 3));
    let released = release.await.expect("release task");

    assert_eq!(released, Some(ue.cu_ue));
    assert_eq!(bench.link.count_to_cu("UEContextReleaseComplete"), 1);
    assert_eq!(bench.cu.nb_ues(), 0);
    assert_eq!(bench.du.nb_ues(), 0);
    assert!(bench.cu_removal.was_removed(ue.cu_ue));
    assert!(bench.du_removal.was_removed(ue.du_ue));
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_release_without_delivery_confirmation() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    let released = bench
        .cu
        .handle_ue_context_release_command(
            ue.cu_ue,
            normal_release(),
            Some(pdcp_pdu(3, b"rrc-release")),
            None,
        )
        .await;

    // the delivery wait expires, the release goes on
    assert_eq!(released, Some(ue.cu_ue));
    assert_eq!(bench.link.count_to_cu("UEContextReleaseComplete"), 1);
    assert_eq!(bench.du.nb_ues(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_release_runs_once() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    let first = bench
        .cu
        .handle_ue_context_release_command(ue.cu_ue, normal_release(), None, None);
    let second = bench
        .cu
        .handle_ue_context_release_command(ue.cu_ue, normal_release(), None, None);

    assert_eq!(second.await, None);
    assert_eq!(first.await, Some(ue.cu_ue));
    assert_eq!(bench.link.count_to_du("UEContextReleaseCommand"), 1);

    // nothing left to release
    let third = bench
        .cu
        .handle_ue_context_release_command(ue.cu_ue, normal_release(), None, None);
    assert_eq!(third.await, None);
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_setup_timeout_removes_new_ue() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    // the gNB-DU never answers, the CU context keeps no gNB-DU UE F1AP ID
    bench.link.mute_to_du(true);
    let result = bench.cu.handle_ue_context_setup(setup_request(UeIndex(7))).await;
    assert!(matches!(result, Err(ProcedureError::Aborted(_))));
    assert_eq!(bench.cu.nb_ues(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_release_request_from_du() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    let cause = F1apCause::RadioNetwork(RadioNetworkCause::RlFailureRlc);

    assert!(bench.du.handle_ue_context_release_request(ue.du_ue, cause));
    // one request per UE
    assert!(!bench.du.handle_ue_context_release_request(ue.du_ue, cause));
    settle().await;

    let requests: Vec<_> = bench
        .cu_cp
        .events()
        .into_iter()
        .filter(|event| matches!(event, CuCpEvent::ReleaseRequest { .. }))
        .collect();
    assert_eq!(
        requests,
        vec![CuCpEvent::ReleaseRequest {
            ue_index: ue.cu_ue,
            cause
        }]
    );

    // the CU-CP answers with a release
    let released = bench
        .cu
        .handle_ue_context_release_command(ue.cu_ue, normal_release(), None, None)
        .await;
    assert_eq!(released, Some(ue.cu_ue));
    assert_eq!(bench.du.nb_ues(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_release_request_needs_cu_ue_id() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    bench.link.mute_to_cu(true);
    let du_ue_id = bench
        .du
        .handle_initial_ul_rrc_message(DuInitialUlRrcMessage {
            ue_index: UeIndex(1),
            nr_cgi: test_nr_cgi(1),
            c_rnti: 0x4601,
            rrc_container: Bytes::from_static(b"rrc-setup-request"),
            du_to_cu_rrc_container: None,
        })
        .expect("Initial UL RRC Message");

    assert_eq!(bench.du.ue_index_by_du_ue_id(du_ue_id), Some(UeIndex(1)));
    assert!(!bench.du.handle_ue_context_release_request(
        UeIndex(1),
        F1apCause::RadioNetwork(RadioNetworkCause::RlFailureRlc)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_modification_required_confirmed() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    let confirm = bench
        .du
        .handle_ue_context_modification_required(
            ue.du_ue,
            DuModificationRequired {
                du_to_cu_rrc_info: Some(Bytes::from_static(b"cell-group-config-3")),
                drbs_required_to_be_released: vec![DrbId(1)],
                cause: F1apCause::RadioNetwork(RadioNetworkCause::RlFailureRlc),
            },
        )
        .await
        .expect("UE Context Modification Required");
    settle().await;

    assert_eq!(confirm.gnb_cu_ue_f1ap_id, ue.cu_ue_id);
    assert_eq!(confirm.rrc_container, Some(Bytes::from_static(b"rrc-reconf")));
    assert!(bench
        .cu_cp
        .events()
        .contains(&CuCpEvent::ModificationRequired { ue_index: ue.cu_ue }));
    assert_eq!(
        bench.du_mng.sent_pdus(ue.du_ue, SrbId::Srb1),
        vec![Bytes::from_static(b"rrc-reconf")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_ue_context_modification_required_refused() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    let cause = F1apCause::RadioNetwork(RadioNetworkCause::NoRadioResourcesAvailable);
    *bench.cu_cp.modification_required_answer.lock() = Err(cause);

    let result = bench
        .du
        .handle_ue_context_modification_required(
            ue.du_ue,
            DuModificationRequired {
                du_to_cu_rrc_info: None,
                drbs_required_to_be_released: vec![DrbId(1)],
                cause: F1apCause::RadioNetwork(RadioNetworkCause::RlFailureRlc),
            },
        )
        .await;

    assert_eq!(result, Err(ProcedureError::Rejected(cause)));
    assert!(bench.du.ue_context(ue.du_ue).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_rrc_reconfiguration_tracking() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    let rrc_state = || bench.du.ue_context(ue.du_ue).map(|ctx| ctx.rrc_state);
    assert_eq!(rrc_state(), Some(RrcConfigState::NoConfig));

    let mut request = setup_request(ue.cu_ue);
    request.rrc_container = Some(pdcp_pdu(1, b"rrc-reconfiguration"));
    bench
        .cu
        .handle_ue_context_setup(request)
        .await
        .expect("UE Context Setup");
    settle().await;
    assert_eq!(rrc_state(), Some(RrcConfigState::ConfigPending));

    // an SRB0 message says nothing about the reconfiguration
    bench
        .du
        .handle_ul_rrc_message(
            ue.du_ue,
            SrbId::Srb0,
            Bytes::from_static(b"rrc-reestablishment-request"),
        )
        .expect("UL RRC Message");
    assert_eq!(rrc_state(), Some(RrcConfigState::ConfigPending));

    bench
        .du
        .handle_ul_rrc_message(
            ue.du_ue,
            SrbId::Srb1,
            pdcp_pdu(1, b"rrc-reconfiguration-complete"),
        )
        .expect("UL RRC Message");
    assert_eq!(rrc_state(), Some(RrcConfigState::ConfigApplied));
}
