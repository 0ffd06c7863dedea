//! SRB PDU delivery tracking
//!
//! The lower layers only report cumulative watermarks: the highest PDCP SN
//! handed to the radio (transmitted) and the highest SN acknowledged by the UE
//! (delivered). The tracker fans a single watermark update out to every PDU
//! waiting at or below it, and turns pending RRC delivery status requests into
//! RRC Delivery Reports.
//!
//! SNs wrap at the extractor's modulus. Two SNs are ordered within half of
//! that space, so a watermark of 1 after 4095 covers 0 and 1 but not 4094.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use nextgsim_f1ap::procedures::RrcDeliveryStatus;
use nextgsim_f1ap::SrbId;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::executor::TaskExecutor;
use crate::ue_context::UeIndex;

/// Extracts the PDCP SN of a PDU
pub trait SnExtractor: Send + Sync {
    fn extract_sn(&self, pdu: &[u8]) -> Option<u32>;

    /// Size of the SN space, a power of two
    fn sn_modulus(&self) -> u32 {
        1 << 12
    }
}

/// Whether `sn` is at or before `mark` in an SN space of `modulus` values
fn sn_covered(sn: u32, mark: u32, modulus: u32) -> bool {
    mark.wrapping_sub(sn) & (modulus - 1) < modulus / 2
}

/// PDCP Data PDU for SRBs: 12-bit SN (TS 38.323 Section 6.2.2.1)
///
/// ```text
/// | R | R | R | R |  SN (MSB)  |
/// |          SN (LSB)          |
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SrbPdcpSnExtractor;

impl SnExtractor for SrbPdcpSnExtractor {
    fn extract_sn(&self, pdu: &[u8]) -> Option<u32> {
        if pdu.len() < 2 {
            return None;
        }
        Some((u32::from(pdu[0] & 0x0f) << 8) | u32::from(pdu[1]))
    }
}

/// Lower-layer sink accepting SRB PDUs
pub trait BearerTxSink: Send + Sync {
    fn on_new_pdu(&self, pdu: Bytes);
}

/// Receives the RRC Delivery Reports produced by the tracker
pub trait DeliveryReportNotifier: Send + Sync {
    fn on_delivery_report(&self, ue_index: UeIndex, srb_id: SrbId, status: RrcDeliveryStatus);
}

/// Watermark to wait on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAwait {
    /// The PDU was handed to the radio
    Transmission,
    /// The UE acknowledged the PDU
    Delivery,
}

struct Waiter {
    id: u64,
    sn: u32,
    tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct DeliveryState {
    last_transmitted: Option<u32>,
    last_delivered: Option<u32>,
    transmission_waiters: Vec<Waiter>,
    delivery_waiters: Vec<Waiter>,
    /// SNs for which an RRC Delivery Report was requested, in send order
    pending_reports: VecDeque<u32>,
    next_waiter_id: u64,
}

impl DeliveryState {
    fn waiters(&mut self, kind: DeliveryAwait) -> &mut Vec<Waiter> {
        match kind {
            DeliveryAwait::Transmission => &mut self.transmission_waiters,
            DeliveryAwait::Delivery => &mut self.delivery_waiters,
        }
    }
}

/// Delivery tracker of one SRB of one UE.
///
/// Watermark updates must be applied on the owning executor; `notify` hands
/// them over from any other context.
pub struct SrbDeliveryTracker {
    ue_index: UeIndex,
    srb_id: SrbId,
    tx_sink: Arc<dyn BearerTxSink>,
    sn_extractor: Arc<dyn SnExtractor>,
    report_notifier: Arc<dyn DeliveryReportNotifier>,
    owner: Arc<dyn TaskExecutor>,
    state: Arc<Mutex<DeliveryState>>,
}

impl SrbDeliveryTracker {
    pub fn new(
        ue_index: UeIndex,
        srb_id: SrbId,
        tx_sink: Arc<dyn BearerTxSink>,
        report_notifier: Arc<dyn DeliveryReportNotifier>,
        owner: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            ue_index,
            srb_id,
            tx_sink,
            sn_extractor: Arc::new(SrbPdcpSnExtractor),
            report_notifier,
            owner,
            state: Arc::new(Mutex::new(DeliveryState::default())),
        }
    }

    /// Replaces the SN extractor
    pub fn with_sn_extractor(mut self, sn_extractor: Arc<dyn SnExtractor>) -> Self {
        self.sn_extractor = sn_extractor;
        self
    }

    pub fn srb_id(&self) -> SrbId {
        self.srb_id
    }

    fn extract_sn(&self, pdu: &[u8]) -> Option<u32> {
        // SRB0 carries bare CCCH messages without a PDCP header
        if !self.srb_id.has_pdcp() {
            return None;
        }
        self.sn_extractor.extract_sn(pdu)
    }

    /// Hands a PDU to the lower layer, optionally registering an RRC Delivery
    /// Report for it. Returns the PDU's SN if it could be determined.
    pub fn send(&self, pdu: Bytes, report_delivery: bool) -> Option<u32> {
        let sn = self.extract_sn(&pdu);
        if let (Some(sn), true) = (sn, report_delivery) {
            self.state.lock().pending_reports.push_back(sn);
        }
        self.tx_sink.on_new_pdu(pdu);
        sn
    }

    /// Hands a PDU to the lower layer and waits until it is transmitted or
    /// delivered, depending on `await_on`.
    ///
    /// The PDU is always sent. Returns false without waiting if its SN cannot
    /// be determined, and false if the watermark does not reach it within
    /// `timeout`.
    pub async fn send_and_await(
        &self,
        pdu: Bytes,
        await_on: DeliveryAwait,
        report_delivery: bool,
        timeout: Duration,
    ) -> bool {
        let sn = self.extract_sn(&pdu);

        // Register before sending, the lower layer may report synchronously
        let registration = sn.map(|sn| {
            let (tx, rx) = oneshot::channel();
            let mut state = self.state.lock();
            let id = state.next_waiter_id;
            state.next_waiter_id += 1;
            if report_delivery {
                state.pending_reports.push_back(sn);
            }
            state.waiters(await_on).push(Waiter { id, sn, tx });
            (id, rx)
        });

        self.tx_sink.on_new_pdu(pdu);

        let Some((waiter_id, rx)) = registration else {
            warn!(
                "Cannot determine PDCP SN, not waiting for delivery: ue={}, srb={}",
                self.ue_index, self.srb_id
            );
            return false;
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                self.state
                    .lock()
                    .waiters(await_on)
                    .retain(|w| w.id != waiter_id);
                debug!(
                    "PDU not {:?} in time: ue={}, srb={}, sn={:?}",
                    await_on, self.ue_index, self.srb_id, sn
                );
                false
            }
        }
    }

    /// Applies a watermark update. Must run on the owning executor.
    pub fn handle_notification(&self, kind: DeliveryAwait, highest_sn: u32) {
        let modulus = self.sn_extractor.sn_modulus();
        let highest_sn = highest_sn & (modulus - 1);
        let mut reports = Vec::new();
        let resolved: Vec<Waiter> = {
            let mut state = self.state.lock();
            let mark = match kind {
                DeliveryAwait::Transmission => &mut state.last_transmitted,
                DeliveryAwait::Delivery => &mut state.last_delivered,
            };
            let advanced = match *mark {
                Some(m) => sn_covered(m, highest_sn, modulus),
                None => true,
            };
            if advanced {
                *mark = Some(highest_sn);
            } else {
                debug!(
                    "Ignoring stale {:?} watermark: ue={}, srb={}, sn={}",
                    kind, self.ue_index, self.srb_id, highest_sn
                );
            }

            let waiters = std::mem::take(state.waiters(kind));
            let (done, pending): (Vec<_>, Vec<_>) = waiters
                .into_iter()
                .partition(|w| sn_covered(w.sn, highest_sn, modulus));
            *state.waiters(kind) = pending;

            if kind == DeliveryAwait::Delivery {
                while let Some(&sn) = state.pending_reports.front() {
                    if !sn_covered(sn, highest_sn, modulus) {
                        break;
                    }
                    state.pending_reports.pop_front();
                    reports.push(sn);
                }
            }
            done
        };

        for waiter in resolved {
            let _ = waiter.tx.send(());
        }
        for sn in reports {
            self.report_notifier.on_delivery_report(
                self.ue_index,
                self.srb_id,
                RrcDeliveryStatus {
                    delivery_status: highest_sn,
                    triggering_message: sn,
                },
            );
        }
    }

    /// Schedules a watermark update on the owning executor
    pub fn notify(self: &Arc<Self>, kind: DeliveryAwait, highest_sn: u32) -> bool {
        let this = self.clone();
        self.owner
            .defer(async move { this.handle_notification(kind, highest_sn) }.boxed())
    }

    pub fn last_transmitted(&self) -> Option<u32> {
        self.state.lock().last_transmitted
    }

    pub fn last_delivered(&self) -> Option<u32> {
        self.state.lock().last_delivered
    }

    pub fn nb_waiters(&self) -> usize {
        let state = self.state.lock();
        state.transmission_waiters.len() + state.delivery_waiters.len()
    }

    pub fn nb_pending_reports(&self) -> usize {
        self.state.lock().pending_reports.len()
    }
}
