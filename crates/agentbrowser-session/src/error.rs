//! Dispatch errors.

use std::path::PathBuf;

use thiserror::Error;

use agentbrowser_engine::EngineError;

use crate::translate::translate;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A ref that is not in the current ref table.
    #[error(
        "Invalid or expired ref {0}: refs are replaced by every snapshot. \
         Run 'snapshot' to get current refs."
    )]
    InvalidRef(String),

    #[error("No page is open. Run 'newPage' to open one.")]
    NoPage,

    #[error("{0}")]
    InvalidArgument(String),

    /// An engine failure while acting on `target`.
    #[error("{source}")]
    Element {
        target: String,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    pub fn element(target: &str, source: EngineError) -> Self {
        DispatchError::Element {
            target: target.to_string(),
            source,
        }
    }

    /// The message sent back to the client.
    pub fn user_message(&self) -> String {
        match self {
            DispatchError::Element { target, source } => translate(source, Some(target)),
            DispatchError::Engine(source) => translate(source, None),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_failure_is_reported() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DispatchError = source.into();
        assert!(matches!(err, DispatchError::Encode(_)));
        assert!(err.user_message().starts_with("Failed to encode result: "));
    }

    #[test]
    fn test_engine_failures_are_translated() {
        let err: DispatchError = EngineError::NotLaunched.into();
        assert_eq!(
            err.user_message(),
            "Browser not launched. Run 'launch' or retry the command."
        );
    }
}
