//! F1AP Procedures
//!
//! Message structs for the F1AP elementary procedures (TS 38.473 Section 8).
//!
//! Interface management:
//! - `f1_setup` - F1 Setup (Section 8.2.3)
//! - `config_update` - gNB-DU / gNB-CU Configuration Update (Sections 8.2.4, 8.2.5)
//! - `reset` - Reset (Section 8.2.1)
//! - `error_indication` - Error Indication (Section 8.2.2)
//! - `f1_removal` - F1 Removal (Section 8.2.8)
//!
//! UE context management:
//! - `ue_context_setup` - UE Context Setup (Section 8.3.1)
//! - `ue_context_release` - UE Context Release Request/Command (Sections 8.3.2, 8.3.3)
//! - `ue_context_modification` - UE Context Modification and Modification Required
//!   (Sections 8.3.4, 8.3.5)
//!
//! RRC message transfer:
//! - `rrc_message_transfer` - Initial UL / UL / DL RRC Message Transfer and
//!   RRC Delivery Report (Section 8.4)
//!
//! Paging:
//! - `paging` - Paging (Section 8.7)

pub mod config_update;
pub mod error_indication;
pub mod f1_removal;
pub mod f1_setup;
pub mod paging;
pub mod reset;
pub mod rrc_message_transfer;
pub mod ue_context_modification;
pub mod ue_context_release;
pub mod ue_context_setup;

pub use config_update::*;
pub use error_indication::*;
pub use f1_removal::*;
pub use f1_setup::*;
pub use paging::*;
pub use reset::*;
pub use rrc_message_transfer::*;
pub use ue_context_modification::*;
pub use ue_context_release::*;
pub use ue_context_setup::*;
