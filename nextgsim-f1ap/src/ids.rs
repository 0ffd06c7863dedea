//! F1AP identifiers
//!
//! UE F1AP IDs (TS 38.473 Section 9.3.1.4 and 9.3.1.5), the Transaction ID
//! (Section 9.3.1.23), bearer identities and the NR Cell Global Identity.

use std::fmt;
use std::hash::Hash;

/// gNB-CU UE F1AP ID, allocated by the gNB-CU, unique within the F1-C interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GnbCuUeF1apId(pub u32);

/// gNB-DU UE F1AP ID, allocated by the gNB-DU, unique within the F1-C interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GnbDuUeF1apId(pub u32);

/// Common behaviour of both UE F1AP ID flavours.
///
/// Lets the identifier allocator and the UE context store be written once for
/// the CU side (local = CU ID, peer = DU ID) and the DU side (the other way
/// around).
pub trait UeF1apId: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Wraps a raw value
    fn from_u32(value: u32) -> Self;

    /// Raw value
    fn value(self) -> u32;
}

impl UeF1apId for GnbCuUeF1apId {
    fn from_u32(value: u32) -> Self {
        Self(value)
    }

    fn value(self) -> u32 {
        self.0
    }
}

impl UeF1apId for GnbDuUeF1apId {
    fn from_u32(value: u32) -> Self {
        Self(value)
    }

    fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GnbCuUeF1apId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GnbDuUeF1apId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The pair of UE F1AP IDs carried by a UE-associated message.
///
/// Either side may be absent: Initial UL RRC Message Transfer only carries the
/// DU ID, and some failure messages omit the ID the sender could not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UeF1apIdPair {
    pub cu: Option<GnbCuUeF1apId>,
    pub du: Option<GnbDuUeF1apId>,
}

impl UeF1apIdPair {
    pub fn new(cu: GnbCuUeF1apId, du: GnbDuUeF1apId) -> Self {
        Self {
            cu: Some(cu),
            du: Some(du),
        }
    }
}

/// F1AP Transaction ID (INTEGER 0..255)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TransactionId(pub u8);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// gNB-DU ID (INTEGER 0..2^36-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GnbDuId(pub u64);

impl GnbDuId {
    /// Largest valid gNB-DU ID
    pub const MAX: u64 = (1 << 36) - 1;

    /// Returns true if the value fits the 36-bit range
    pub fn is_valid(self) -> bool {
        self.0 <= Self::MAX
    }
}

impl fmt::Display for GnbDuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Signalling Radio Bearer identity (SRB0..SRB3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SrbId {
    Srb0,
    Srb1,
    Srb2,
    Srb3,
}

impl SrbId {
    /// Numeric SRB identity
    pub fn value(self) -> u8 {
        match self {
            SrbId::Srb0 => 0,
            SrbId::Srb1 => 1,
            SrbId::Srb2 => 2,
            SrbId::Srb3 => 3,
        }
    }

    /// Converts a numeric SRB identity, rejecting values above 3
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(SrbId::Srb0),
            1 => Some(SrbId::Srb1),
            2 => Some(SrbId::Srb2),
            3 => Some(SrbId::Srb3),
            _ => None,
        }
    }

    /// SRB0 carries CCCH messages without PDCP
    pub fn has_pdcp(self) -> bool {
        self != SrbId::Srb0
    }
}

impl fmt::Display for SrbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SRB{}", self.value())
    }
}

/// Data Radio Bearer identity (1..32)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrbId(pub u8);

impl DrbId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 32;

    pub fn is_valid(self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.0)
    }
}

impl fmt::Display for DrbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DRB{}", self.0)
    }
}

/// NR Cell Global Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NrCgi {
    /// PLMN identity (3 octets, BCD encoded MCC/MNC)
    pub plmn_id: [u8; 3],
    /// NR Cell Identity (36 bits)
    pub nr_cell_id: u64,
}

impl NrCgi {
    pub fn new(plmn_id: [u8; 3], nr_cell_id: u64) -> Self {
        Self {
            plmn_id,
            nr_cell_id,
        }
    }
}

impl fmt::Display for NrCgi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}{:02x}{:02x}-{:09x}",
            self.plmn_id[0], self.plmn_id[1], self.plmn_id[2], self.nr_cell_id
        )
    }
}
