//! RRC message transfer over F1: UL/DL transfers, delivery reports, UE F1AP
//! ID binding and reestablishment relay

use bytes::Bytes;
use integration_tests::{
    init_test_logging, pdcp_pdu, settle, test_nr_cgi, CuCpEvent, TestBench,
};
use nextgsim_f1::{DeliveryAwait, DuInitialUlRrcMessage, F1Error, UeIndex};
use nextgsim_f1ap::procedures::{
    DlRrcMessageTransfer, ErrorIndication, RrcDeliveryStatus, UlRrcMessageTransfer,
};
use nextgsim_f1ap::{
    F1apCause, F1apMessage, GnbCuUeF1apId, GnbDuUeF1apId, InitiatingMessage, RadioNetworkCause,
    SrbId,
};

fn dl_transfer(
    cu: GnbCuUeF1apId,
    du: GnbDuUeF1apId,
    srb_id: SrbId,
    pdu: Bytes,
) -> DlRrcMessageTransfer {
    DlRrcMessageTransfer {
        gnb_cu_ue_f1ap_id: cu,
        gnb_du_ue_f1ap_id: du,
        old_gnb_du_ue_f1ap_id: None,
        srb_id,
        rrc_container: pdu,
        rrc_delivery_status_request: false,
    }
}

fn error_indications(msgs: Vec<F1apMessage>) -> Vec<ErrorIndication> {
    msgs.into_iter()
        .filter_map(|msg| match msg {
            F1apMessage::InitiatingMessage(InitiatingMessage::ErrorIndication(ind)) => Some(ind),
            _ => None,
        })
        .collect()
}

fn dl_transfers(msgs: Vec<F1apMessage>) -> Vec<DlRrcMessageTransfer> {
    msgs.into_iter()
        .filter_map(|msg| match msg {
            F1apMessage::InitiatingMessage(InitiatingMessage::DlRrcMessageTransfer(dl)) => Some(dl),
            _ => None,
        })
        .collect()
}

/// A gNB-DU UE whose Initial UL RRC Message never reached the gNB-CU
fn du_only_ue(bench: &TestBench, ue_index: UeIndex) -> GnbDuUeF1apId {
    bench.link.mute_to_cu(true);
    let du_ue_id = bench
        .du
        .handle_initial_ul_rrc_message(DuInitialUlRrcMessage {
            ue_index,
            nr_cgi: test_nr_cgi(1),
            c_rnti: 0x4601,
            rrc_container: Bytes::from_static(b"rrc-setup-request"),
            du_to_cu_rrc_container: None,
        })
        .expect("Initial UL RRC Message");
    bench.link.mute_to_cu(false);
    du_ue_id
}

#[tokio::test(start_paused = true)]
async fn test_initial_and_ul_rrc_messages_reach_cu_cp() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    assert_eq!(
        bench.cu_cp.events()[0],
        CuCpEvent::UeCreated {
            ue_index: ue.cu_ue,
            du_ue_id: ue.du_ue_id,
            c_rnti: 0x4601
        }
    );
    assert_eq!(
        bench.du_mng.sent_pdus(ue.du_ue, SrbId::Srb0),
        vec![Bytes::from_static(b"rrc-setup")]
    );

    bench
        .du
        .handle_ul_rrc_message(ue.du_ue, SrbId::Srb1, pdcp_pdu(0, b"rrc-setup-complete"))
        .expect("UL RRC Message");

    assert_eq!(
        bench.cu_cp.ul_rrc_messages(ue.cu_ue),
        vec![
            (SrbId::Srb0, Bytes::from_static(b"rrc-setup-request")),
            (SrbId::Srb1, pdcp_pdu(0, b"rrc-setup-complete")),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_ul_rrc_message_needs_cu_ue_id() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    du_only_ue(&bench, UeIndex(1));

    let result = bench
        .du
        .handle_ul_rrc_message(UeIndex(1), SrbId::Srb1, pdcp_pdu(0, b"rrc-setup-complete"));

    assert_eq!(result, Err(F1Error::PeerIdNotBound(UeIndex(1))));
    assert_eq!(bench.link.count_to_cu("ULRRCMessageTransfer"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_initial_ul_rrc_message_before_f1_setup() {
    init_test_logging();
    let bench = TestBench::new();
    assert!(bench.connect());

    let result = bench.du.handle_initial_ul_rrc_message(DuInitialUlRrcMessage {
        ue_index: UeIndex(1),
        nr_cgi: test_nr_cgi(1),
        c_rnti: 0x4601,
        rrc_container: Bytes::from_static(b"rrc-setup-request"),
        du_to_cu_rrc_container: None,
    });

    assert_eq!(result, Err(F1Error::NotSetUp));
    assert_eq!(bench.du.nb_ues(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rrc_delivery_report() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    bench
        .cu
        .handle_dl_rrc_message_transfer(
            ue.cu_ue,
            SrbId::Srb1,
            pdcp_pdu(5, b"security-mode-command"),
            true,
        )
        .expect("DL RRC Message");
    // no report asked for this one
    bench
        .cu
        .handle_dl_rrc_message_transfer(
            ue.cu_ue,
            SrbId::Srb1,
            pdcp_pdu(6, b"ue-capability-enquiry"),
            false,
        )
        .expect("DL RRC Message");
    settle().await;

    assert_eq!(
        bench.du_mng.sent_pdus(ue.du_ue, SrbId::Srb1),
        vec![
            pdcp_pdu(5, b"security-mode-command"),
            pdcp_pdu(6, b"ue-capability-enquiry")
        ]
    );

    assert!(bench
        .du
        .handle_srb_notification(ue.du_ue, SrbId::Srb1, DeliveryAwait::Delivery, 6));
    settle().await;

    let reports: Vec<_> = bench
        .cu_cp
        .events()
        .into_iter()
        .filter(|event| matches!(event, CuCpEvent::DeliveryReport { .. }))
        .collect();
    assert_eq!(
        reports,
        vec![CuCpEvent::DeliveryReport {
            ue_index: ue.cu_ue,
            status: RrcDeliveryStatus {
                delivery_status: 6,
                triggering_message: 5
            }
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_srb_notification_for_unknown_srb() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let ue = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");

    assert!(!bench
        .du
        .handle_srb_notification(ue.du_ue, SrbId::Srb2, DeliveryAwait::Delivery, 1));
    assert!(!bench
        .du
        .handle_srb_notification(UeIndex(9), SrbId::Srb1, DeliveryAwait::Delivery, 1));
}

#[tokio::test(start_paused = true)]
async fn test_first_dl_message_binds_cu_ue_id() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let du_ue_id = du_only_ue(&bench, UeIndex(1));

    assert!(bench.link.inject_to_du(dl_transfer(
        GnbCuUeF1apId(77),
        du_ue_id,
        SrbId::Srb0,
        Bytes::from_static(b"rrc-setup"),
    )));
    settle().await;

    let ctx = bench.du.ue_context(UeIndex(1)).expect("DU context");
    assert_eq!(ctx.peer_id(), Some(GnbCuUeF1apId(77)));
    assert_eq!(
        bench.du_mng.sent_pdus(UeIndex(1), SrbId::Srb0),
        vec![Bytes::from_static(b"rrc-setup")]
    );

    // a different gNB-CU UE F1AP ID is now a fault
    assert!(bench.link.inject_to_du(dl_transfer(
        GnbCuUeF1apId(78),
        du_ue_id,
        SrbId::Srb0,
        Bytes::from_static(b"rrc-setup"),
    )));
    settle().await;

    let indications = error_indications(bench.link.sent_to_cu());
    assert_eq!(indications.len(), 1);
    assert_eq!(indications[0].gnb_cu_ue_f1ap_id, Some(GnbCuUeF1apId(78)));
    assert_eq!(indications[0].gnb_du_ue_f1ap_id, Some(du_ue_id));
    assert_eq!(
        indications[0].cause,
        Some(F1apCause::RadioNetwork(
            RadioNetworkCause::UnknownOrInconsistentPairOfUeF1apId
        ))
    );
    assert_eq!(bench.du_mng.sent_pdus(UeIndex(1), SrbId::Srb0).len(), 1);
    assert_eq!(
        bench.du.ue_context(UeIndex(1)).and_then(|ctx| ctx.peer_id()),
        Some(GnbCuUeF1apId(77))
    );
}

#[tokio::test(start_paused = true)]
async fn test_dl_rrc_message_for_unknown_du_ue_id() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");

    assert!(bench.link.inject_to_du(dl_transfer(
        GnbCuUeF1apId(1),
        GnbDuUeF1apId(999),
        SrbId::Srb1,
        pdcp_pdu(0, b"rrc-reconfiguration"),
    )));
    settle().await;

    let indications = error_indications(bench.link.sent_to_cu());
    assert_eq!(indications.len(), 1);
    assert_eq!(
        indications[0].cause,
        Some(F1apCause::RadioNetwork(
            RadioNetworkCause::UnknownOrAlreadyAllocatedGnbDuUeF1apId
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn test_ul_rrc_message_for_unknown_cu_ue_id() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");

    assert!(bench.link.inject_to_cu(UlRrcMessageTransfer {
        gnb_cu_ue_f1ap_id: GnbCuUeF1apId(999),
        gnb_du_ue_f1ap_id: GnbDuUeF1apId(1),
        srb_id: SrbId::Srb1,
        rrc_container: pdcp_pdu(0, b"measurement-report"),
        new_gnb_du_ue_f1ap_id: None,
    }));

    assert_eq!(bench.link.count_to_du("ErrorIndication"), 1);
    assert!(bench.cu_cp.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ul_rrc_message_with_duplicate_du_ue_id() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let first = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    let second = bench.attach_ue(UeIndex(2), 0x4602).await.expect("attach");

    // the DU UE F1AP ID of the first UE on the context of the second
    assert!(bench.link.inject_to_cu(UlRrcMessageTransfer {
        gnb_cu_ue_f1ap_id: second.cu_ue_id,
        gnb_du_ue_f1ap_id: first.du_ue_id,
        srb_id: SrbId::Srb1,
        rrc_container: pdcp_pdu(0, b"measurement-report"),
        new_gnb_du_ue_f1ap_id: None,
    }));

    let indications = error_indications(bench.link.sent_to_du());
    assert_eq!(indications.len(), 1);
    assert_eq!(
        indications[0].cause,
        Some(F1apCause::RadioNetwork(
            RadioNetworkCause::UnknownOrAlreadyAllocatedGnbDuUeF1apId
        ))
    );
    assert_eq!(bench.cu_cp.ul_rrc_messages(second.cu_ue).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reestablishment_relays_old_du_ue_id() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");
    let old = bench.attach_ue(UeIndex(1), 0x4601).await.expect("attach");
    let new = bench.attach_ue(UeIndex(2), 0x4602).await.expect("attach");

    assert!(bench.cu.handle_ue_reestablishment(new.cu_ue, old.cu_ue));
    assert!(!bench.cu.handle_ue_reestablishment(new.cu_ue, UeIndex(42)));

    for sn in [0, 1] {
        bench
            .cu
            .handle_dl_rrc_message_transfer(
                new.cu_ue,
                SrbId::Srb1,
                pdcp_pdu(sn, b"rrc-reestablishment"),
                false,
            )
            .expect("DL RRC Message");
    }
    settle().await;

    assert_eq!(
        *bench.du_mng.reestablishments.lock(),
        vec![(new.du_ue, old.du_ue)]
    );
    // relayed once, with the first DL message only
    let relayed: Vec<_> = dl_transfers(bench.link.sent_to_du())
        .into_iter()
        .filter(|dl| dl.gnb_cu_ue_f1ap_id == new.cu_ue_id && dl.srb_id == SrbId::Srb1)
        .map(|dl| dl.old_gnb_du_ue_f1ap_id)
        .collect();
    assert_eq!(relayed, vec![Some(old.du_ue_id), None]);
}

#[tokio::test(start_paused = true)]
async fn test_dl_rrc_message_needs_du_ue_id() {
    init_test_logging();
    let bench = TestBench::new();
    bench.start().await.expect("F1 Setup");

    assert_eq!(
        bench.cu.handle_dl_rrc_message_transfer(
            UeIndex(5),
            SrbId::Srb1,
            pdcp_pdu(0, b"rrc-reconfiguration"),
            false
        ),
        Err(F1Error::UeNotFound(UeIndex(5)))
    );
}
