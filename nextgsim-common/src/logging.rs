//! Logging infrastructure for nextgsim
//!
//! This module provides configurable logging using the `tracing` crate,
//! F1AP message tracing helpers, and a hex wrapper for RRC containers.

use std::fmt;
use tracing::Level;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    #[default]
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

/// Initialize the tracing subscriber with the specified log level.
///
/// This should be called once at application startup. The log level can be
/// overridden by the `RUST_LOG` environment variable.
///
/// # Example
///
/// ```
/// use nextgsim_common::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    init_logging_with_filter(&level.to_string());
}

/// Initialize logging with a custom filter string.
///
/// Allows fine-grained control over which modules log at which levels.
///
/// # Example
///
/// ```
/// use nextgsim_common::logging::init_logging_with_filter;
///
/// // Set default to info, but enable debug for the DU side of the engine
/// init_logging_with_filter("info,nextgsim_f1::du=debug");
/// ```
pub fn init_logging_with_filter(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // A second initialisation (tests, embedding applications) is not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .try_init();
}

/// Protocol direction for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Incoming/received message
    Rx,
    /// Outgoing/transmitted message
    Tx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => write!(f, "RX"),
            Direction::Tx => write!(f, "TX"),
        }
    }
}

/// Log an F1AP message at debug level.
///
/// # Arguments
///
/// * `side` - Protocol side emitting the log ("CU" or "DU")
/// * `direction` - Message direction (RX or TX)
/// * `msg_type` - Message name, e.g. "UEContextSetupRequest"
/// * `ue` - Local UE F1AP ID for UE-associated messages
///
/// # Example
///
/// ```
/// use nextgsim_common::logging::{log_f1ap_message, Direction};
///
/// log_f1ap_message("DU", Direction::Tx, "F1SetupRequest", None);
/// log_f1ap_message("CU", Direction::Rx, "ULRRCMessageTransfer", Some(3));
/// ```
pub fn log_f1ap_message(side: &str, direction: Direction, msg_type: &str, ue: Option<u32>) {
    match ue {
        Some(ue) => tracing::debug!(
            protocol = "F1AP",
            side = side,
            direction = %direction,
            msg_type = msg_type,
            ue = ue,
            "{} F1AP {} {} ue={}",
            side,
            direction,
            msg_type,
            ue
        ),
        None => tracing::debug!(
            protocol = "F1AP",
            side = side,
            direction = %direction,
            msg_type = msg_type,
            "{} F1AP {} {}",
            side,
            direction,
            msg_type
        ),
    }
}

/// Wrapper for hex dump formatting
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
