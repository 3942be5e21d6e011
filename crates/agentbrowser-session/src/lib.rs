//! # agentbrowser session
//!
//! Session state shared by a daemon's connections, and the dispatcher that
//! executes commands against a browser engine.

pub mod dispatcher;
pub mod error;
pub mod logs;
pub mod state;
pub mod translate;

pub use dispatcher::{resolve_target, Dispatcher, DispatcherConfig, DEFAULT_SCROLL_AMOUNT};
pub use error::DispatchError;
pub use logs::{
    ConsoleMessage, LogBuffer, PageErrorEntry, RequestEntry, SessionLogs, DEFAULT_LOG_CAPACITY,
};
pub use state::SessionStore;
pub use translate::translate;
