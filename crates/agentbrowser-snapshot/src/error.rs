//! Snapshot errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// No element in the accessibility tree matched.
    #[error("No element matches {0}")]
    NoMatch(String),

    /// More than one element matched and no index was given.
    #[error("strict mode violation: {query} resolved to {count} elements")]
    Ambiguous { query: String, count: usize },

    /// The matching node has no DOM counterpart to act on.
    #[error("Element {0} has no DOM node")]
    NoDomNode(String),
}
