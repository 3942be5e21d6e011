//! Daemon-related errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Errors that can occur while running or talking to a session daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// PID file exists and its process is alive.
    #[error("Daemon already running (PID file: {path}, PID: {pid})")]
    AlreadyRunning { path: PathBuf, pid: u32 },

    #[error("PID file {}: {source}", path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PID file {} holds {contents:?}, not a PID", path.display())]
    CorruptPidFile { path: PathBuf, contents: String },

    /// Something other than a stale socket occupies the socket path.
    #[error("Refusing to replace {path}: {reason}")]
    UnsafeSocketPath { path: PathBuf, reason: String },

    #[error(
        "Invalid session name '{0}': use letters, digits, '-' and '_' (at most 64 characters)"
    )]
    InvalidSessionName(String),

    #[error("Failed to set up signal handlers: {0}")]
    SignalSetup(String),

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("Session '{0}' is not running")]
    NotRunning(String),

    #[error("Daemon failed to start within {0} seconds")]
    StartTimeout(u64),

    #[error("No response from daemon within {0} ms")]
    ResponseTimeout(u64),

    /// The daemon hung up before answering.
    #[error("Connection closed by daemon")]
    ConnectionClosed,

    #[error("Failed to release browser: {0}")]
    EngineRelease(String),

    #[error(transparent)]
    Protocol(#[from] agentbrowser_protocol::ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}
