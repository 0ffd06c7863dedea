//! Errors raised while interpreting decoded F1AP messages

use thiserror::Error;

/// Errors that can occur when an F1AP message does not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum F1apError {
    /// A message of another type was received where a specific one was expected
    #[error("Invalid message type: expected {expected}, got {actual}")]
    UnexpectedMessage {
        /// Expected message name
        expected: &'static str,
        /// Actual message name
        actual: &'static str,
    },

    /// Missing mandatory IE
    #[error("Missing mandatory IE: {0}")]
    MissingMandatoryIe(&'static str),

    /// Invalid IE value
    #[error("Invalid IE value: {0}")]
    InvalidIeValue(String),
}
