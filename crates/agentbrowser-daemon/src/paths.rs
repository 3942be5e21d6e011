//! Session name to socket, port and PID file mapping.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::error::DaemonError;

pub const DEFAULT_SESSION: &str = "default";

/// First port of the range used when domain sockets are unavailable.
pub const TCP_PORT_BASE: u16 = 49152;
const TCP_PORT_SPAN: u32 = 16383;

const MAX_SESSION_NAME: usize = 64;

/// Where a daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(SocketAddr),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

/// Filesystem and network addresses derived from a session name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    session: String,
    dir: PathBuf,
}

impl SessionPaths {
    /// Paths for `session` under `dir`, or the system temp directory.
    pub fn new(session: &str, dir: Option<&Path>) -> Result<Self, DaemonError> {
        validate_session_name(session)?;
        Ok(Self {
            session: session.to_string(),
            dir: dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
        })
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn socket_path(&self) -> PathBuf {
        self.dir.join(format!("agentbrowser-{}.sock", self.session))
    }

    pub fn pid_path(&self) -> PathBuf {
        self.dir.join(format!("agentbrowser-{}.pid", self.session))
    }

    pub fn tcp_port(&self) -> u16 {
        tcp_port(&self.session)
    }

    /// The endpoint a daemon for this session listens on by default.
    pub fn endpoint(&self) -> Endpoint {
        if cfg!(unix) {
            Endpoint::Unix(self.socket_path())
        } else {
            Endpoint::Tcp(SocketAddr::from((Ipv4Addr::LOCALHOST, self.tcp_port())))
        }
    }
}

/// Session names become file names, so only a safe alphabet is allowed.
pub fn validate_session_name(name: &str) -> Result<(), DaemonError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_SESSION_NAME
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(DaemonError::InvalidSessionName(name.to_string()))
    }
}

/// Stable port in `49152..=65534` for a session name (djb2).
pub fn tcp_port(session: &str) -> u16 {
    let hash = session
        .bytes()
        .fold(5381u32, |h, b| h.wrapping_mul(33).wrapping_add(u32::from(b)));
    // hash % 16383 < 16383, so the sum stays within u16.
    TCP_PORT_BASE + (hash % TCP_PORT_SPAN) as u16
}
