//! Reset of the F1 interface, full and partial, from either side

use integration_tests::{init_test_logging, settle, AttachedUe, TestBench};
use nextgsim_f1::{F1Error, ProcedureError, UeIndex};
use nextgsim_f1ap::procedures::{ResetType, UeAssociatedLogicalF1ConnectionItem};
use nextgsim_f1ap::{F1apCause, GnbCuUeF1apId, GnbDuUeF1apId, MiscCause, RadioNetworkCause};

fn om_intervention() -> F1apCause {
    F1apCause::Misc(MiscCause::OmIntervention)
}

fn item(
    cu: Option<GnbCuUeF1apId>,
    du: Option<GnbDuUeF1apId>,
) -> UeAssociatedLogicalF1ConnectionItem {
    UeAssociatedLogicalF1ConnectionItem {
        gnb_cu_ue_f1ap_id: cu,
        gnb_du_ue_f1ap_id: du,
    }
}

fn full_item(ue: &AttachedUe) -> UeAssociatedLogicalF1ConnectionItem {
    item(Some(ue.cu_ue_id), Some(ue.du_ue_id))
}

async fn bench_with_ues(nb_ues: u32) -> (TestBench, Vec<AttachedUe>) {
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let mut ues = Vec::new();
    for i in 1..=nb_ues {
        let c_rnti = 0x4600 + i as u16;
        ues.push(bench.attach_ue(UeIndex(i), c_rnti).await.expect("attach"));
    }
    (bench, ues)
}

#[tokio::test(start_paused = true)]
async fn test_full_reset_from_du() {
    init_test_logging();
    let (bench, ues) = bench_with_ues(3).await;

    let ack = bench
        .du
        .handle_reset(om_intervention(), ResetType::F1Interface)
        .await
        .expect("Reset");
    settle().await;

    assert!(ack.ue_associated_connections.is_empty());
    assert_eq!(bench.du.nb_ues(), 0);
    assert_eq!(bench.cu.nb_ues(), 0);
    for ue in &ues {
        assert!(bench.du_removal.was_removed(ue.du_ue));
        assert!(bench.cu_removal.was_removed(ue.cu_ue));
    }
    // the interface itself stays up
    assert!(bench.du.is_f1_setup());
    assert!(bench.cu.is_f1_setup());
}

#[tokio::test(start_paused = true)]
async fn test_full_reset_from_cu() {
    init_test_logging();
    let (bench, _ues) = bench_with_ues(2).await;

    bench
        .cu
        .handle_reset(om_intervention(), ResetType::F1Interface)
        .await
        .expect("Reset");
    settle().await;

    assert_eq!(bench.du.nb_ues(), 0);
    assert_eq!(bench.cu.nb_ues(), 0);
    assert_eq!(bench.link.count_to_du("Reset"), 1);
    assert_eq!(bench.link.count_to_cu("ResetAcknowledge"), 1);

    // new UEs are accepted afterwards
    let ue = bench.attach_ue(UeIndex(7), 0x4607).await.expect("attach");
    assert!(bench.cu.ue_context(ue.cu_ue).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_partial_reset_from_cu() {
    init_test_logging();
    let (bench, ues) = bench_with_ues(3).await;

    let unknown = item(Some(GnbCuUeF1apId(999)), Some(GnbDuUeF1apId(999)));
    let requested = vec![
        full_item(&ues[0]),
        unknown,
        // the gNB-DU finds this one by the gNB-CU UE F1AP ID
        item(Some(ues[1].cu_ue_id), None),
    ];

    let ack = bench
        .cu
        .handle_reset(
            F1apCause::RadioNetwork(RadioNetworkCause::Unspecified),
            ResetType::PartOfF1Interface(requested),
        )
        .await
        .expect("Reset");
    settle().await;

    assert_eq!(
        ack.ue_associated_connections,
        vec![full_item(&ues[0]), unknown, full_item(&ues[1])]
    );
    assert_eq!(bench.cu.nb_ues(), 1);
    assert_eq!(bench.du.nb_ues(), 1);
    assert!(bench.cu.ue_context(ues[2].cu_ue).is_some());
    assert!(bench.du.ue_context(ues[2].du_ue).is_some());
    assert!(bench.du_removal.was_removed(ues[0].du_ue));
    assert!(bench.du_removal.was_removed(ues[1].du_ue));
    assert!(!bench.du_removal.was_removed(ues[2].du_ue));
}

#[tokio::test(start_paused = true)]
async fn test_partial_reset_lists_ue_once() {
    init_test_logging();
    let (bench, ues) = bench_with_ues(2).await;

    let requested = vec![
        item(None, Some(ues[0].du_ue_id)),
        item(Some(ues[0].cu_ue_id), None),
    ];
    let ack = bench
        .du
        .handle_reset(om_intervention(), ResetType::PartOfF1Interface(requested))
        .await
        .expect("Reset");
    settle().await;

    // one acknowledged item per requested item, one removal per UE
    assert_eq!(
        ack.ue_associated_connections,
        vec![full_item(&ues[0]), full_item(&ues[0])]
    );
    assert_eq!(bench.du_removal.removed(), vec![ues[0].du_ue]);
    assert_eq!(bench.cu_removal.removed(), vec![ues[0].cu_ue]);
    assert_eq!(bench.du.nb_ues(), 1);
    assert_eq!(bench.cu.nb_ues(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_without_connection() {
    init_test_logging();
    let bench = TestBench::new();

    let result = bench
        .du
        .handle_reset(om_intervention(), ResetType::F1Interface)
        .await;

    assert_eq!(result, Err(ProcedureError::Engine(F1Error::NotConnected)));
}

#[tokio::test(start_paused = true)]
async fn test_reset_not_acknowledged() {
    init_test_logging();
    let (bench, _ues) = bench_with_ues(1).await;
    bench.link.mute_to_cu(true);

    let result = bench
        .du
        .handle_reset(om_intervention(), ResetType::F1Interface)
        .await;

    assert!(matches!(result, Err(ProcedureError::Aborted(_))));
    // the local UEs are gone regardless
    assert_eq!(bench.du.nb_ues(), 0);
    assert_eq!(bench.cu.nb_ues(), 1);
}
