//! # agentbrowser daemon
//!
//! One long-lived process per browser session. The daemon owns the engine
//! and the session state, and serves newline-delimited JSON commands over a
//! Unix domain socket (or a loopback TCP port where sockets are missing).
//!
//! ## Lifecycle
//!
//! - The PID file is claimed before the socket is bound
//! - The browser launches on the first command that needs it
//! - `close`, SIGTERM, SIGINT and SIGHUP stop the daemon: new commands are
//!   refused, open connections get a grace period, the browser is closed
//!   and the socket and PID file are removed
//!
//! The [`client`] half finds, starts and stops daemons for the CLI.

pub mod client;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod paths;
pub mod pid;
pub mod server;
pub mod signal;

pub use client::{
    daemon_status, ensure_daemon, stop_daemon, DaemonClient, DaemonStatus, SpawnOptions,
    DEFAULT_CLIENT_TIMEOUT,
};
pub use error::DaemonError;
pub use lifecycle::{Lifecycle, LifecycleState};
pub use options::{dispatcher_config, ServerOptions};
pub use paths::{validate_session_name, Endpoint, SessionPaths, DEFAULT_SESSION};
pub use pid::{is_process_running, PidFile};
pub use server::{DaemonServer, ShutdownHandle, SHUTTING_DOWN_MESSAGE};
pub use signal::{send_signal_to_pid, StopSignal};
