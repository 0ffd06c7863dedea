//! F1 Setup initiator (gNB-DU)
//!
//! ```text
//! Idle -> AwaitingResponse -> Accepted
//!              |     ^
//!              v     |
//!           RetryWait            (failure with Time To Wait, retries left)
//!              |
//!              v
//!            Failed              (timeout, rejection, wrong message, no ID)
//! ```

use std::sync::Arc;
use std::time::Duration;

use nextgsim_f1ap::procedures::{F1SetupRequest, F1SetupResponse, ServedCellInfo};
use nextgsim_f1ap::{F1apCause, GnbDuId, SuccessfulOutcome, UnsuccessfulOutcome};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use super::F1apDu;
use crate::error::F1Error;
use crate::transaction::ProcedureOutcome;

/// Content of the F1 Setup Request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F1SetupRequestParams {
    pub gnb_du_id: GnbDuId,
    pub gnb_du_name: Option<String>,
    pub served_cells: Vec<ServedCellInfo>,
    pub rrc_version: (u8, u8, u8),
}

/// Why the F1 Setup procedure failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum F1SetupFailureReason {
    /// No answer from the gNB-CU, or the wait was cancelled
    #[error("F1 Setup timed out")]
    Timeout,

    /// The gNB-CU answered with an unexpected message
    #[error("Malformed F1 Setup response: {0}")]
    MalformedResponse(&'static str),

    /// F1 Setup Failure without Time To Wait, or retries exhausted
    #[error("F1 Setup rejected by CU: cause={0}")]
    PeerRejected(F1apCause),

    #[error("F1 Setup could not run: {0}")]
    Internal(#[from] F1Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum F1SetupState {
    Idle,
    AwaitingResponse,
    RetryWait,
}

pub(super) struct F1SetupProcedure {
    du: Arc<F1apDu>,
    request: F1SetupRequestParams,
    state: F1SetupState,
    nb_retries: u32,
}

impl F1SetupProcedure {
    pub(super) fn new(du: Arc<F1apDu>, request: F1SetupRequestParams) -> Self {
        Self {
            du,
            request,
            state: F1SetupState::Idle,
            nb_retries: 0,
        }
    }

    pub(super) async fn run(mut self) -> Result<F1SetupResponse, F1SetupFailureReason> {
        let result = self.run_attempts().await;
        match &result {
            Ok(response) => self.on_accepted(response),
            Err(reason) => self.on_failed(reason),
        }
        result
    }

    async fn run_attempts(&mut self) -> Result<F1SetupResponse, F1SetupFailureReason> {
        if !self.request.gnb_du_id.is_valid() {
            error!("F1 Setup with invalid gNB-DU ID: {}", self.request.gnb_du_id);
            return Err(F1Error::InvalidParameter(format!(
                "gNB-DU ID {} out of range",
                self.request.gnb_du_id
            ))
            .into());
        }

        loop {
            trace!("F1 Setup state: {:?} -> AwaitingResponse", self.state);
            self.state = F1SetupState::AwaitingResponse;

            let transaction = self.du.transactions.create(self.du.cfg.procedure_timeout());
            let Some(transaction_id) = transaction.id() else {
                error!("F1 Setup failed: no transaction ID available");
                return Err(F1Error::TransactionPoolExhausted.into());
            };

            info!(
                "Sending F1 Setup Request: gnb_du_id={}, attempt={}",
                self.request.gnb_du_id,
                self.nb_retries + 1
            );
            self.du.send(F1SetupRequest {
                transaction_id,
                gnb_du_id: self.request.gnb_du_id,
                gnb_du_name: self.request.gnb_du_name.clone(),
                served_cells: self.request.served_cells.clone(),
                rrc_version: self.request.rrc_version,
            })?;

            let response = match transaction.wait().await {
                ProcedureOutcome::Invalid => return Err(F1Error::TransactionPoolExhausted.into()),
                ProcedureOutcome::Aborted(reason) => {
                    warn!("F1 Setup Request got no answer: {:?}", reason);
                    return Err(F1SetupFailureReason::Timeout);
                }
                ProcedureOutcome::Response(response) => response,
            };

            match response {
                Ok(SuccessfulOutcome::F1SetupResponse(response)) => return Ok(response),
                Ok(other) => return Err(F1SetupFailureReason::MalformedResponse(other.name())),
                Err(UnsuccessfulOutcome::F1SetupFailure(failure)) => {
                    let retry = failure
                        .time_to_wait
                        .filter(|_| self.nb_retries < self.du.cfg.max_setup_retries);
                    let Some(time_to_wait) = retry else {
                        warn!(
                            "F1 Setup rejected: cause={}, time_to_wait={:?}, retries={}",
                            failure.cause, failure.time_to_wait, self.nb_retries
                        );
                        return Err(F1SetupFailureReason::PeerRejected(failure.cause));
                    };

                    self.nb_retries += 1;
                    self.state = F1SetupState::RetryWait;
                    info!(
                        "F1 Setup rejected, retrying: cause={}, wait={:?}, retry={}/{}",
                        failure.cause,
                        time_to_wait.as_duration(),
                        self.nb_retries,
                        self.du.cfg.max_setup_retries
                    );
                    self.wait_before_retry(time_to_wait.as_duration()).await?;
                    self.state = F1SetupState::Idle;
                }
                Err(other) => return Err(F1SetupFailureReason::MalformedResponse(other.name())),
            }
        }
    }

    /// Sleeps for the Time To Wait, or fails as soon as the association is lost
    async fn wait_before_retry(&self, wait: Duration) -> Result<(), F1SetupFailureReason> {
        let lost = self.du.association_lost.notified();
        tokio::pin!(lost);
        lost.as_mut().enable();
        if !self.du.is_connected() {
            return Err(F1Error::NotConnected.into());
        }

        tokio::select! {
            _ = tokio::time::sleep(wait) => Ok(()),
            _ = lost => {
                warn!("F1-C association lost while waiting to retry F1 Setup");
                Err(F1Error::NotConnected.into())
            }
        }
    }

    fn on_accepted(&self, response: &F1SetupResponse) {
        let mut state = self.du.state.lock();
        let f1 = &mut state.f1;

        f1.active_cells.clear();
        for cell in &response.cells_to_activate {
            if self
                .request
                .served_cells
                .iter()
                .any(|served| served.nr_cgi == cell.nr_cgi)
            {
                f1.active_cells.push(cell.nr_cgi);
            } else {
                warn!("CU activated a cell the DU does not serve: {}", cell.nr_cgi);
            }
        }

        f1.gnb_du_id = Some(self.request.gnb_du_id);
        f1.gnb_du_name = self.request.gnb_du_name.clone();
        f1.served_cells = self.request.served_cells.clone();
        f1.gnb_cu_name = response.gnb_cu_name.clone();
        f1.gnb_cu_rrc_version = Some(response.gnb_cu_rrc_version);
        f1.f1_setup = true;

        info!(
            "F1 Setup accepted: gnb_cu_name={:?}, active_cells={}",
            f1.gnb_cu_name,
            f1.active_cells.len()
        );
    }

    fn on_failed(&self, reason: &F1SetupFailureReason) {
        let mut state = self.du.state.lock();
        // a stale peer identity must not survive into the next attempt
        state.f1.gnb_du_id = None;
        state.f1.gnb_cu_name = None;
        state.f1.gnb_cu_rrc_version = None;
        state.f1.f1_setup = false;
        debug!("F1 Setup failed: {}", reason);
    }
}

impl F1apDu {
    /// Runs the F1 Setup procedure on the common task queue.
    ///
    /// Retries after an F1 Setup Failure carrying a Time To Wait, at most
    /// `max_setup_retries` times.
    pub async fn handle_f1_setup_request(
        self: &Arc<Self>,
        request: F1SetupRequestParams,
    ) -> Result<F1SetupResponse, F1SetupFailureReason> {
        if !self.is_connected() {
            return Err(F1Error::NotConnected.into());
        }
        let procedure = F1SetupProcedure::new(self.clone(), request);
        self.ctrl_queue
            .run(procedure.run())
            .await
            .unwrap_or(Err(F1Error::TaskQueueClosed.into()))
    }
}
