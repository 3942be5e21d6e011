//! Client side of the session channel, and daemon start/stop/status.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use agentbrowser_protocol::{parse_response, serialize_command, Action, Command, Response};

use crate::error::DaemonError;
use crate::paths::{Endpoint, SessionPaths};
use crate::pid::PidFile;
use crate::signal::{send_signal_to_pid, StopSignal};

#[cfg(unix)]
use tokio::net::UnixStream;

/// Upper bound for one request/response exchange.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

const PING_TIMEOUT: Duration = Duration::from_secs(2);
const START_POLL_INTERVAL: Duration = Duration::from_millis(100);
const START_POLL_ATTEMPTS: u32 = 50;
const STOP_POLL_ATTEMPTS: u32 = 30;

/// Sends commands to one daemon, one connection per command.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    endpoint: Endpoint,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send `command` and wait for its response.
    pub async fn send(&self, command: &Command) -> Result<Response, DaemonError> {
        let line = serialize_command(command)?;
        let raw = tokio::time::timeout(self.timeout, self.exchange(&line))
            .await
            .map_err(|_| DaemonError::ResponseTimeout(self.timeout.as_millis() as u64))??;
        Ok(parse_response(&raw)?)
    }

    /// Whether the daemon answers at all. Any response counts; the error
    /// log query used never launches a browser.
    pub async fn ping(&self) -> bool {
        let ping = Command::new("ping", Action::Errors { clear: None });
        let client = self.clone().with_timeout(PING_TIMEOUT);
        match client.send(&ping).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Ping to {} failed: {}", self.endpoint, e);
                false
            }
        }
    }

    async fn exchange(&self, line: &str) -> Result<String, DaemonError> {
        match &self.endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => exchange(UnixStream::connect(path).await?, line).await,
            #[cfg(not(unix))]
            Endpoint::Unix(path) => Err(DaemonError::UnsafeSocketPath {
                path: path.clone(),
                reason: "Unix domain sockets are not available on this platform".to_string(),
            }),
            Endpoint::Tcp(addr) => exchange(TcpStream::connect(addr).await?, line).await,
        }
    }
}

async fn exchange<S>(stream: S, line: &str) -> Result<String, DaemonError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    let mut reader = BufReader::new(reader);
    let mut response = String::new();
    if reader.read_line(&mut response).await? == 0 {
        return Err(DaemonError::ConnectionClosed);
    }
    Ok(response)
}

/// What serves a session, as far as the PID file and the channel tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    Running { pid: u32 },
    /// The recorded process is alive but does not answer on the channel.
    Unresponsive { pid: u32 },
    NotRunning,
}

/// Check the PID file, then ping a live owner. A file naming a dead
/// process is removed together with its socket.
pub async fn daemon_status(paths: &SessionPaths) -> DaemonStatus {
    let pid_file = PidFile::new(paths.pid_path());
    if let Some(pid) = pid_file.live_pid() {
        return if DaemonClient::new(paths.endpoint()).ping().await {
            DaemonStatus::Running { pid }
        } else {
            DaemonStatus::Unresponsive { pid }
        };
    }
    if pid_file.exists() {
        warn!(
            "Removing stale files of session '{}' (process gone)",
            paths.session()
        );
        remove_stale_files(paths);
    }
    DaemonStatus::NotRunning
}

fn remove_stale_files(paths: &SessionPaths) {
    for path in [paths.socket_path(), paths.pid_path()] {
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// How to launch a daemon process in the background.
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

/// Make sure a responsive daemon serves `paths`, starting one if needed.
///
/// Returns `true` if one was already running.
pub async fn ensure_daemon(paths: &SessionPaths, spawn: &SpawnOptions) -> Result<bool, DaemonError> {
    match daemon_status(paths).await {
        DaemonStatus::Running { .. } => return Ok(true),
        DaemonStatus::Unresponsive { pid } => {
            warn!(
                "PID {} holds session '{}' but does not answer; replacing it",
                pid,
                paths.session()
            );
            remove_stale_files(paths);
        }
        DaemonStatus::NotRunning => remove_stale_files(paths),
    }

    spawn_detached(spawn)?;
    info!("Starting daemon for session '{}'", paths.session());

    let client = DaemonClient::new(paths.endpoint());
    for _ in 0..START_POLL_ATTEMPTS {
        tokio::time::sleep(START_POLL_INTERVAL).await;
        if client.ping().await {
            return Ok(false);
        }
    }

    let waited = START_POLL_INTERVAL * START_POLL_ATTEMPTS;
    Err(DaemonError::StartTimeout(waited.as_secs()))
}

/// Start `spawn` in its own session with no terminal attached.
fn spawn_detached(spawn: &SpawnOptions) -> Result<(), DaemonError> {
    use std::process::{Command, Stdio};

    let mut cmd = Command::new(&spawn.program);
    cmd.args(&spawn.args)
        .envs(spawn.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // SAFETY: setsid is async-signal-safe and touches no memory of the
        // parent; it only detaches the child from the controlling terminal.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(std::io::Error::from)
            });
        }
    }

    cmd.spawn().map_err(|e| {
        DaemonError::Custom(format!(
            "Failed to start daemon ({}): {}",
            spawn.program.display(),
            e
        ))
    })?;
    Ok(())
}

/// Signal a session's daemon and wait for it to exit.
///
/// Returns the PID that was stopped.
pub async fn stop_daemon(paths: &SessionPaths, force: bool) -> Result<u32, DaemonError> {
    let pid = match daemon_status(paths).await {
        DaemonStatus::Running { pid } => pid,
        // The PID may have been reused by an unrelated process.
        DaemonStatus::Unresponsive { pid } if !force => {
            return Err(DaemonError::Custom(format!(
                "PID {} holds session '{}' but does not answer; retry with --force to kill it",
                pid,
                paths.session()
            )));
        }
        DaemonStatus::Unresponsive { pid } => pid,
        DaemonStatus::NotRunning => {
            return Err(DaemonError::NotRunning(paths.session().to_string()));
        }
    };

    let signal = if force {
        StopSignal::Kill
    } else {
        StopSignal::Terminate
    };
    send_signal_to_pid(pid, signal)?;

    for _ in 0..STOP_POLL_ATTEMPTS {
        tokio::time::sleep(START_POLL_INTERVAL).await;
        if !crate::pid::is_process_running(pid) {
            if force {
                // A killed daemon leaves its files behind.
                remove_stale_files(paths);
            }
            return Ok(pid);
        }
    }

    Err(DaemonError::Custom(format!(
        "Daemon (PID {}) did not exit after {}; retry with --force",
        pid, signal
    )))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
