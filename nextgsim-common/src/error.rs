//! Error types for nextgsim

use thiserror::Error;

/// Error types for the nextgsim library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Protocol-related errors.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Network and file I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}
