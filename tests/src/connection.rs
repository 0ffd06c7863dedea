//! F1-C association lifecycle: loss, F1 Removal and reconnection

use std::time::Duration;

use bytes::Bytes;
use integration_tests::{
    init_test_logging, settle, setup_params, test_nr_cgi, wait_for_condition, CuCpEvent,
    TestBench,
};
use nextgsim_f1::{
    CuUeContextSetupRequest, DuInitialUlRrcMessage, F1Error, ProcedureError, UeIndex,
};
use nextgsim_f1ap::SrbId;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_connection_loss_removes_all_ues() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let first = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    let second = bench.attach_ue(UeIndex(2), 0x4602).await.expect("attach");

    bench.link.break_link();
    wait_for_condition(
        || bench.du.nb_ues() == 0 && bench.cu.nb_ues() == 0,
        Duration::from_secs(1),
    )
    .await
    .expect("UEs removed");

    assert!(!bench.du.is_connected());
    assert!(!bench.cu.is_connected());
    assert!(!bench.du.is_f1_setup());
    assert!(!bench.cu.is_f1_setup());
    assert_eq!(bench.du.nb_ues(), 0);
    assert_eq!(bench.cu.nb_ues(), 0);
    for ue in [first, second] {
        assert!(bench.du_removal.was_removed(ue.du_ue));
        assert!(bench.cu_removal.was_removed(ue.cu_ue));
    }
    assert!(bench.cu_cp.events().contains(&CuCpEvent::DuDisconnected));
    assert_eq!(bench.link.is_up(), (false, false));
}

#[tokio::test(start_paused = true)]
async fn test_connection_loss_aborts_pending_procedures() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    bench.link.mute_to_du(true);

    let request = CuUeContextSetupRequest {
        ue_index: ue.cu_ue,
        sp_cell_id: test_nr_cgi(1),
        serv_cell_index: 0,
        cu_to_du_rrc_info: Bytes::from_static(b"cg-config-info"),
        srbs_to_be_setup: vec![SrbId::Srb2],
        drbs_to_be_setup: Vec::new(),
        rrc_container: None,
        gnb_du_ue_ambr_ul: None,
    };
    let cu = bench.cu.clone();
    let start = Instant::now();
    let setup = tokio::spawn(async move { cu.handle_ue_context_setup(request).await });
    settle().await;

    bench.link.break_link();
    let result = setup.await.expect("setup task");

    assert!(matches!(result, Err(ProcedureError::Aborted(_))));
    assert!(start.elapsed() < bench.du.config().ue_procedure_timeout());
    settle().await;
    assert_eq!(bench.cu.nb_ues(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_f1_removal() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    bench.du.handle_f1_removal().await.expect("F1 Removal");
    settle().await;

    assert_eq!(bench.link.count_to_cu("F1RemovalRequest"), 1);
    assert_eq!(bench.link.count_to_du("F1RemovalResponse"), 1);
    assert!(!bench.du.is_connected());
    assert!(!bench.cu.is_connected());
    assert!(!bench.du.is_f1_setup());
    assert!(!bench.cu.is_f1_setup());
    assert_eq!(bench.du.nb_ues(), 0);
    assert_eq!(bench.cu.nb_ues(), 0);

    // nothing goes out on a closed association
    assert_eq!(
        bench.du.handle_initial_ul_rrc_message(DuInitialUlRrcMessage {
            ue_index: UeIndex(2),
            nr_cgi: test_nr_cgi(1),
            c_rnti: 0x4602,
            rrc_container: Bytes::from_static(b"rrc-setup-request"),
            du_to_cu_rrc_container: None,
        }),
        Err(F1Error::NotConnected)
    );
}

#[tokio::test(start_paused = true)]
async fn test_f1_removal_without_connection() {
    init_test_logging();
    let bench = TestBench::new();

    assert_eq!(
        bench.du.handle_f1_removal().await,
        Err(ProcedureError::Engine(F1Error::NotConnected))
    );
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_loss() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    bench.link.break_link();
    settle().await;

    assert!(bench.connect());
    bench
        .du
        .handle_f1_setup_request(setup_params(&[1]))
        .await
        .expect("F1 Setup after reconnection");
    assert_eq!(bench.cu_cp.setup_requests(), 2);

    // the gNB-DU UE index is free again
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    assert!(bench.cu.ue_context(ue.cu_ue).is_some());
    assert_eq!(bench.du.nb_ues(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_f1_setup_removes_cu_ues() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    bench
        .du
        .handle_f1_setup_request(setup_params(&[1]))
        .await
        .expect("second F1 Setup");
    settle().await;

    assert_eq!(bench.cu.nb_ues(), 0);
    assert!(bench.cu_removal.was_removed(ue.cu_ue));
    assert!(bench.cu.is_f1_setup());
}

#[tokio::test(start_paused = true)]
async fn test_peer_silence_is_not_a_loss() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    bench.link.mute_to_cu(true);
    bench.link.mute_to_du(true);

    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(bench.du.is_connected());
    assert!(bench.cu.is_connected());
    assert!(bench.du.is_f1_setup());
}
