//! F1AP Cause and Time To Wait
//!
//! Cause IE as defined in 3GPP TS 38.473 Section 9.3.1.2, kept as a tagged sum
//! type with one sub-enum per cause group.

use std::fmt;
use std::time::Duration;

/// F1AP Cause IE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum F1apCause {
    /// Radio Network Layer cause
    RadioNetwork(RadioNetworkCause),
    /// Transport Layer cause
    Transport(TransportCause),
    /// Protocol cause
    Protocol(ProtocolCause),
    /// Miscellaneous cause
    Misc(MiscCause),
}

/// Radio Network Layer causes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioNetworkCause {
    Unspecified,
    RlFailureRlc,
    UnknownOrAlreadyAllocatedGnbCuUeF1apId,
    UnknownOrAlreadyAllocatedGnbDuUeF1apId,
    UnknownOrInconsistentPairOfUeF1apId,
    InteractionWithOtherProcedure,
    NotSupportedQciValue,
    ActionDesirableForRadioReasons,
    NoRadioResourcesAvailable,
    ProcedureCancelled,
    NormalRelease,
    CellNotAvailable,
    RlFailureOthers,
    UeRejection,
    ResourcesNotAvailableForTheSlice,
    AmfInitiatedAbnormalRelease,
    ReleaseDueToPreEmption,
    PlmnNotServedByTheGnbCu,
    MultipleDrbIdInstances,
    UnknownDrbId,
    GnbCuCellCapacityExceeded,
    InsufficientUeCapabilities,
    Other(u8),
}

/// Transport Layer causes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCause {
    Unspecified,
    TransportResourceUnavailable,
    Other(u8),
}

/// Protocol causes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolCause {
    TransferSyntaxError,
    AbstractSyntaxErrorReject,
    AbstractSyntaxErrorIgnoreAndNotify,
    MessageNotCompatibleWithReceiverState,
    SemanticError,
    AbstractSyntaxErrorFalselyConstructedMessage,
    Unspecified,
    Other(u8),
}

/// Miscellaneous causes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscCause {
    ControlProcessingOverload,
    NotEnoughUserPlaneProcessingResources,
    HardwareFailure,
    OmIntervention,
    Unspecified,
    Other(u8),
}

impl F1apCause {
    /// Radio Network "unspecified", the catch-all used when nothing better applies
    pub const UNSPECIFIED: F1apCause = F1apCause::RadioNetwork(RadioNetworkCause::Unspecified);

    /// Returns true for the normal-release cause
    pub fn is_normal_release(&self) -> bool {
        matches!(self, F1apCause::RadioNetwork(RadioNetworkCause::NormalRelease))
    }

    /// Returns true for causes signalling a UE F1AP ID inconsistency
    pub fn is_ue_id_fault(&self) -> bool {
        matches!(
            self,
            F1apCause::RadioNetwork(
                RadioNetworkCause::UnknownOrAlreadyAllocatedGnbCuUeF1apId
                    | RadioNetworkCause::UnknownOrAlreadyAllocatedGnbDuUeF1apId
                    | RadioNetworkCause::UnknownOrInconsistentPairOfUeF1apId
            )
        )
    }
}

impl From<RadioNetworkCause> for F1apCause {
    fn from(cause: RadioNetworkCause) -> Self {
        F1apCause::RadioNetwork(cause)
    }
}

impl From<TransportCause> for F1apCause {
    fn from(cause: TransportCause) -> Self {
        F1apCause::Transport(cause)
    }
}

impl From<ProtocolCause> for F1apCause {
    fn from(cause: ProtocolCause) -> Self {
        F1apCause::Protocol(cause)
    }
}

impl From<MiscCause> for F1apCause {
    fn from(cause: MiscCause) -> Self {
        F1apCause::Misc(cause)
    }
}

impl fmt::Display for F1apCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            F1apCause::RadioNetwork(c) => write!(f, "radio-network:{c:?}"),
            F1apCause::Transport(c) => write!(f, "transport:{c:?}"),
            F1apCause::Protocol(c) => write!(f, "protocol:{c:?}"),
            F1apCause::Misc(c) => write!(f, "misc:{c:?}"),
        }
    }
}

/// Time To Wait IE (TS 38.473 Section 9.3.1.13)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeToWait {
    V1s,
    V2s,
    V5s,
    V10s,
    V20s,
    V60s,
}

impl TimeToWait {
    /// Time the initiator has to wait before retrying
    pub fn as_duration(self) -> Duration {
        let secs = match self {
            TimeToWait::V1s => 1,
            TimeToWait::V2s => 2,
            TimeToWait::V5s => 5,
            TimeToWait::V10s => 10,
            TimeToWait::V20s => 20,
            TimeToWait::V60s => 60,
        };
        Duration::from_secs(secs)
    }
}
