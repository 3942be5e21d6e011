//! Protocol errors.

use thiserror::Error;

/// A command that could not be accepted.
///
/// `id` is recovered from the raw payload independently of validation so
/// the failure can still be correlated by the caller. It is `None` when the
/// payload was not valid JSON or had no usable string id.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ProtocolError {
    pub id: Option<String>,
    pub message: String,
}

impl ProtocolError {
    pub fn new(id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }

    pub fn invalid_json(detail: impl std::fmt::Display) -> Self {
        Self::new(None, format!("Invalid JSON: {}", detail))
    }
}
