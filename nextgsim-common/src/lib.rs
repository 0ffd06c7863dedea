//! Common types and utilities for nextgsim
//!
//! This crate provides the configuration structures, error type and logging
//! utilities shared by the F1AP message model (`nextgsim-f1ap`) and the F1AP
//! protocol engine (`nextgsim-f1`).

pub mod config;
pub mod error;
pub mod logging;

pub use config::{load_f1ap_config, F1apConfig};
pub use error::Error;
pub use logging::{
    init_logging, init_logging_with_filter, log_f1ap_message, Direction, HexDump, LogLevel,
};
