//! Engine error types.
//!
//! Display strings are part of the contract: the dispatcher recognises
//! failures by the phrases they contain ("strict mode violation",
//! "intercepts pointer events", "not visible", "Timeout", ...).

use thiserror::Error;

use crate::cdp::CdpError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Browser not launched. Run 'launch' or retry the command.")]
    NotLaunched,

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Frame not found: {0}")]
    FrameNotFound(String),

    #[error("Element not found: no element matches {0}")]
    ElementNotFound(String),

    #[error("strict mode violation: {selector} resolved to {count} elements")]
    StrictMode { selector: String, count: usize },

    #[error("Element {0} is not visible")]
    NotVisible(String),

    #[error("Element {selector} is covered: {by} intercepts pointer events")]
    Intercepted { selector: String, by: String },

    #[error("Element {0} is detached from the DOM")]
    Detached(String),

    #[error("Element {selector} is not actionable: {reason}")]
    NotActionable { selector: String, reason: String },

    #[error("Timeout {ms}ms exceeded while waiting for {waiting_for}{}", last_reason(.reason))]
    Timeout {
        ms: u64,
        waiting_for: String,
        reason: Option<String>,
    },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("JavaScript error: {0}")]
    Script(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error(transparent)]
    Cdp(CdpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

fn last_reason(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(" (last state: {})", r),
        None => String::new(),
    }
}

impl From<CdpError> for EngineError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::JavaScript(msg) => EngineError::Script(msg),
            CdpError::NavigationFailed(msg) => EngineError::Navigation(msg),
            CdpError::SessionClosed => EngineError::NotLaunched,
            other => EngineError::Cdp(other),
        }
    }
}

impl EngineError {
    /// Failures that may clear up by themselves while the page settles.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::ElementNotFound(_)
                | EngineError::NotVisible(_)
                | EngineError::Intercepted { .. }
                | EngineError::Detached(_)
                | EngineError::NotActionable { .. }
        )
    }
}
