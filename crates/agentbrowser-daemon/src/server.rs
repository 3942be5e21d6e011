//! IPC server for one browser session.
//!
//! Each connection is a stream of newline-delimited JSON commands answered
//! strictly in order. Connections share one [`SessionStore`] and one
//! engine, and interleave at whole-command granularity.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use agentbrowser_protocol::{parse, serialize_response, Action, Response, UNKNOWN_ID};
use agentbrowser_session::{Dispatcher, SessionStore};

use crate::error::DaemonError;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::options::ServerOptions;
use crate::paths::{Endpoint, SessionPaths};
use crate::pid::PidFile;
use crate::signal::shutdown_signal;

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

pub const SHUTTING_DOWN_MESSAGE: &str =
    "Daemon is shutting down; the command was not run. Retry once it has exited.";

/// Stops a running server from any task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    notify: Arc<Notify>,
    lifecycle: Arc<Lifecycle>,
}

impl ShutdownHandle {
    /// Enter Closing and wake the accept loop.
    pub fn shutdown(&self) {
        self.lifecycle.begin_close();
        // A stored permit is kept if the loop is not waiting yet.
        self.notify.notify_one();
    }
}

enum Listener {
    #[cfg(unix)]
    Unix(UnixListener),
    Tcp(TcpListener),
}

enum Accepted {
    #[cfg(unix)]
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Listener {
    async fn accept(&self) -> io::Result<Accepted> {
        match self {
            #[cfg(unix)]
            Listener::Unix(listener) => listener.accept().await.map(|(s, _)| Accepted::Unix(s)),
            Listener::Tcp(listener) => listener.accept().await.map(|(s, _)| Accepted::Tcp(s)),
        }
    }
}

/// Files owned by a running daemon, removed on drop.
struct Cleanup {
    socket_path: Option<PathBuf>,
    pid_file: PidFile,
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        // A daemon that replaced this one owns the socket path now.
        let replaced = !self.pid_file.is_current();
        if let Some(path) = self.socket_path.as_ref().filter(|_| !replaced) {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove socket {} on shutdown: {}", path.display(), e);
                }
            }
        }
        if let Err(e) = self.pid_file.release() {
            warn!("{}", e);
        }
    }
}

struct ConnectionContext {
    dispatcher: Dispatcher,
    store: SessionStore,
    lifecycle: Arc<Lifecycle>,
    shutdown: ShutdownHandle,
    max_request_bytes: usize,
}

impl ConnectionContext {
    /// Run one request line. The flag is set when the command closed the
    /// session and the daemon should stop.
    async fn handle_line(&self, line: &str) -> (Response, bool) {
        let command = match parse(line) {
            Ok(command) => command,
            Err(e) => {
                debug!("Rejected request: {}", e);
                return (Response::from_protocol_error(&e), false);
            }
        };

        if !self.lifecycle.accepts_commands() {
            return (Response::err(command.id, SHUTTING_DOWN_MESSAGE), false);
        }

        let closing = matches!(command.action, Action::Close);
        if closing && !self.lifecycle.begin_close() {
            return (Response::err(command.id, SHUTTING_DOWN_MESSAGE), false);
        }

        let response = self.dispatcher.execute(&self.store, command).await;
        if !closing && self.store.is_launched() {
            self.lifecycle.mark_launched();
        }
        (response, closing)
    }
}

/// The daemon server for one session.
pub struct DaemonServer {
    listener: Listener,
    endpoint: Endpoint,
    cleanup: Cleanup,
    context: Arc<ConnectionContext>,
    semaphore: Arc<Semaphore>,
    notify: Arc<Notify>,
    options: ServerOptions,
}

impl DaemonServer {
    /// Claim the session's PID file, then listen on `endpoint`.
    ///
    /// A socket left behind by a dead daemon is replaced; anything else at
    /// that path is refused.
    pub async fn bind(
        paths: &SessionPaths,
        endpoint: Endpoint,
        dispatcher: Dispatcher,
        options: ServerOptions,
    ) -> Result<Self, DaemonError> {
        std::fs::create_dir_all(paths.dir())?;

        let mut pid_file = PidFile::new(paths.pid_path());
        pid_file.claim()?;
        let mut cleanup = Cleanup {
            socket_path: None,
            pid_file,
        };

        let (listener, endpoint) = match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let listener = bind_unix(&path)?;
                cleanup.socket_path = Some(path.clone());
                (Listener::Unix(listener), Endpoint::Unix(path))
            }
            #[cfg(not(unix))]
            Endpoint::Unix(path) => {
                return Err(DaemonError::UnsafeSocketPath {
                    path,
                    reason: "Unix domain sockets are not available on this platform".to_string(),
                });
            }
            Endpoint::Tcp(addr) => {
                let listener = TcpListener::bind(addr).await?;
                let local = listener.local_addr()?;
                (Listener::Tcp(listener), Endpoint::Tcp(local))
            }
        };

        info!("Session '{}' listening on {}", paths.session(), endpoint);

        let lifecycle = Arc::new(Lifecycle::new());
        let notify = Arc::new(Notify::new());
        let shutdown = ShutdownHandle {
            notify: notify.clone(),
            lifecycle: lifecycle.clone(),
        };

        Ok(Self {
            listener,
            endpoint,
            cleanup,
            context: Arc::new(ConnectionContext {
                dispatcher,
                store: SessionStore::new(options.log_capacity),
                lifecycle,
                shutdown,
                max_request_bytes: options.max_request_bytes,
            }),
            semaphore: Arc::new(Semaphore::new(options.max_connections)),
            notify,
            options,
        })
    }

    /// The bound endpoint; TCP port 0 is replaced by the real port.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.context.shutdown.clone()
    }

    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        self.context.lifecycle.clone()
    }

    /// Serve until SIGTERM, SIGINT or SIGHUP, or until a `close` command.
    pub async fn run_until_signal(self) -> Result<(), DaemonError> {
        let signal = shutdown_signal()?;
        let handle = self.shutdown_handle();
        tokio::spawn(async move {
            let name = signal.await;
            info!("Received {}, shutting down", name);
            handle.shutdown();
        });
        self.run().await
    }

    /// Serve until shut down, then drain connections, release the engine
    /// and remove the socket and PID file.
    pub async fn run(self) -> Result<(), DaemonError> {
        let DaemonServer {
            listener,
            endpoint,
            cleanup,
            context,
            semaphore,
            notify,
            options,
        } = self;

        let mut connections: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = notify.notified() => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => {
                    let stream = match accepted {
                        Ok(stream) => stream,
                        Err(e) => {
                            error!("Accept error: {}", e);
                            continue;
                        }
                    };
                    let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                        warn!(
                            "Connection limit ({}) reached, rejecting new connection",
                            options.max_connections
                        );
                        continue;
                    };
                    debug!("Accepted new connection");
                    match stream {
                        #[cfg(unix)]
                        Accepted::Unix(stream) => {
                            connections.spawn(serve(stream, context.clone(), permit));
                        }
                        Accepted::Tcp(stream) => {
                            connections.spawn(serve(stream, context.clone(), permit));
                        }
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        context.lifecycle.begin_close();
        drop(listener);

        if !connections.is_empty() {
            info!(
                "Waiting for {} in-flight connection(s) to complete",
                connections.len()
            );
            let drained = tokio::time::timeout(options.shutdown_timeout, async {
                while connections.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!(
                    "Graceful shutdown timed out after {:?}, aborting {} connection(s)",
                    options.shutdown_timeout,
                    connections.len()
                );
                connections.abort_all();
                while connections.join_next().await.is_some() {}
            }
        }

        let released = release_engine(&context).await;
        if let Err(e) = context.lifecycle.transition(LifecycleState::Terminated) {
            warn!("{}", e);
        }
        drop(cleanup);
        info!("Daemon on {} stopped", endpoint);
        released
    }
}

async fn release_engine(context: &ConnectionContext) -> Result<(), DaemonError> {
    let engine = context.dispatcher.engine();
    if !engine.is_running() {
        return Ok(());
    }
    let result = engine.close().await;
    context.store.mark_closed();
    result.map_err(|e| DaemonError::EngineRelease(e.to_string()))
}

#[cfg(unix)]
fn bind_unix(path: &std::path::Path) -> Result<UnixListener, DaemonError> {
    use std::os::unix::fs::{FileTypeExt, PermissionsExt};

    let listener = match UnixListener::bind(path) {
        Ok(listener) => listener,
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            // We hold the PID file, so a listener here has lost its own.
            if std::os::unix::net::UnixStream::connect(path).is_ok() {
                return Err(DaemonError::UnsafeSocketPath {
                    path: path.to_path_buf(),
                    reason: "another process is listening on it".to_string(),
                });
            }

            let metadata = std::fs::symlink_metadata(path)?;
            if metadata.file_type().is_symlink() {
                return Err(DaemonError::UnsafeSocketPath {
                    path: path.to_path_buf(),
                    reason: "it is a symlink".to_string(),
                });
            }
            if !metadata.file_type().is_socket() {
                return Err(DaemonError::UnsafeSocketPath {
                    path: path.to_path_buf(),
                    reason: "it is not a socket".to_string(),
                });
            }

            info!("Removing stale socket {}", path.display());
            std::fs::remove_file(path)?;
            UnixListener::bind(path)?
        }
        Err(e) => return Err(e.into()),
    };

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(listener)
}

async fn serve<S>(stream: S, context: Arc<ConnectionContext>, permit: OwnedSemaphorePermit)
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let _permit = permit;
    if let Err(e) = handle_connection(stream, &context).await {
        error!("Connection error: {}", e);
    }
}

async fn handle_connection<S>(stream: S, context: &ConnectionContext) -> Result<(), DaemonError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    loop {
        let line = match read_line_bounded(&mut reader, context.max_request_bytes).await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Client disconnected");
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                // The rest of the stream cannot be framed reliably.
                let response = Response::err(UNKNOWN_ID, e.to_string());
                write_response(&mut writer, &response).await?;
                break;
            }
            Err(e) => return Err(e.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!("Received: {} bytes", trimmed.len());

        let (response, closing) = context.handle_line(trimmed).await;
        write_response(&mut writer, &response).await?;

        if closing {
            info!("Session closed by client");
            context.shutdown.shutdown();
        }
    }

    Ok(())
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<(), DaemonError>
where
    W: AsyncWrite + Unpin,
{
    let json = serialize_response(response)?;
    debug!("Sending: {}", json);
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read one line of at most `max_size` bytes, newline included.
///
/// Returns `None` at end of stream. Oversized lines and invalid UTF-8 are
/// reported as [`io::ErrorKind::InvalidData`].
pub(crate) async fn read_line_bounded<R>(
    reader: &mut R,
    max_size: usize,
) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    use tokio::io::AsyncBufReadExt;

    let mut bytes = Vec::new();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if bytes.is_empty() {
                return Ok(None);
            }
            break;
        }

        let newline = available.iter().position(|&b| b == b'\n');
        let take = newline.map(|p| p + 1).unwrap_or(available.len());

        if bytes.len() + take > max_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Request too large: exceeded {} byte limit", max_size),
            ));
        }

        bytes.extend_from_slice(&available[..take]);
        reader.consume(take);

        if newline.is_some() {
            break;
        }
    }

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid UTF-8 in request"))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
