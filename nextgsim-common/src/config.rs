//! Configuration structures for the F1AP protocol engine
//!
//! The F1AP engine only takes construction-time parameters: procedure
//! timeouts, the F1 Setup retry budget and the sizes of its bounded pools.
//! Cell and QoS configuration is owned by the DU manager / CU-CP and never
//! passes through here.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Maximum value of a gNB-CU/gNB-DU UE F1AP ID (TS 38.473, INTEGER (0..2^32-1))
pub const MAX_UE_F1AP_ID: u32 = u32::MAX;

/// F1AP engine configuration.
///
/// Every field has a default, so an empty YAML document is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct F1apConfig {
    /// Response timeout for non-UE-associated procedures (F1 Setup, Reset, ...)
    pub procedure_timeout_ms: u64,
    /// Response timeout for UE-associated procedures (UE Context Setup, ...)
    pub ue_context_setup_timeout_ms: u64,
    /// Maximum number of F1 Setup retries after a failure with Time To Wait
    pub max_setup_retries: u32,
    /// Number of transaction IDs available (F1AP TransactionID is 0..255)
    pub transaction_pool_size: u16,
    /// Maximum number of UE contexts per F1-C association
    pub max_ues: usize,
    /// Lowest UE F1AP ID handed out by the identifier allocator
    pub ue_id_min: u32,
    /// Highest UE F1AP ID handed out by the identifier allocator
    pub ue_id_max: u32,
    /// Time to wait for the lower layers to deliver an SRB PDU (RRC Release)
    pub rrc_delivery_timeout_ms: u64,
    /// Extra one-way link latency added to delivery waits (e.g. NTN feeder link)
    pub extra_link_latency_ms: u64,
}

impl Default for F1apConfig {
    fn default() -> Self {
        Self {
            procedure_timeout_ms: 3000,
            ue_context_setup_timeout_ms: 1000,
            max_setup_retries: 5,
            transaction_pool_size: 256,
            max_ues: 1024,
            ue_id_min: 0,
            ue_id_max: MAX_UE_F1AP_ID,
            rrc_delivery_timeout_ms: 1000,
            extra_link_latency_ms: 0,
        }
    }
}

impl F1apConfig {
    /// Response timeout for non-UE-associated procedures.
    pub fn procedure_timeout(&self) -> Duration {
        Duration::from_millis(self.procedure_timeout_ms)
    }

    /// Response timeout for UE-associated procedures.
    pub fn ue_procedure_timeout(&self) -> Duration {
        Duration::from_millis(self.ue_context_setup_timeout_ms)
    }

    /// Bound on the wait for an SRB PDU to be delivered, including the
    /// configured extra link latency (counted twice, there and back).
    pub fn rrc_delivery_timeout(&self) -> Duration {
        Duration::from_millis(
            self.rrc_delivery_timeout_ms
                .saturating_add(self.extra_link_latency_ms.saturating_mul(2)),
        )
    }

    /// Checks the configuration for values the engine cannot operate with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.procedure_timeout_ms == 0 {
            return Err(Error::Config("procedure_timeout_ms must be > 0".into()));
        }
        if self.ue_context_setup_timeout_ms == 0 {
            return Err(Error::Config("ue_context_setup_timeout_ms must be > 0".into()));
        }
        if self.transaction_pool_size == 0 || self.transaction_pool_size > 256 {
            return Err(Error::Config(format!(
                "transaction_pool_size must be in 1..=256, got {}",
                self.transaction_pool_size
            )));
        }
        if self.max_ues == 0 {
            return Err(Error::Config("max_ues must be > 0".into()));
        }
        if self.ue_id_min > self.ue_id_max {
            return Err(Error::Config(format!(
                "ue_id_min ({}) must not exceed ue_id_max ({})",
                self.ue_id_min, self.ue_id_max
            )));
        }
        Ok(())
    }

    /// Parses an F1AP configuration from a YAML string.
    ///
    /// # Example
    /// ```
    /// use nextgsim_common::F1apConfig;
    ///
    /// let yaml = r#"
    /// procedure_timeout_ms: 500
    /// max_setup_retries: 2
    /// "#;
    ///
    /// let config = F1apConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.max_setup_retries, 2);
    /// assert_eq!(config.transaction_pool_size, 256);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        let config: F1apConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to a YAML string.
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Loads and validates an F1AP configuration from a YAML file.
///
/// # Example
/// ```no_run
/// use nextgsim_common::load_f1ap_config;
///
/// let config = load_f1ap_config("config/f1ap.yaml").unwrap();
/// ```
pub fn load_f1ap_config<P: AsRef<Path>>(path: P) -> Result<F1apConfig, Error> {
    let contents = fs::read_to_string(path)?;
    F1apConfig::from_yaml(&contents)
}
