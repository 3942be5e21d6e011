//! Signal handling for session daemons.

use tracing::info;

use crate::error::DaemonError;

/// Signal used to stop a running daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// Graceful shutdown (SIGTERM).
    Terminate,
    /// Immediate kill (SIGKILL).
    Kill,
}

impl std::fmt::Display for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopSignal::Terminate => write!(f, "SIGTERM"),
            StopSignal::Kill => write!(f, "SIGKILL"),
        }
    }
}

/// Resolve on the first SIGTERM, SIGINT or SIGHUP and name it.
///
/// Handlers are installed before the returned future is first polled, so
/// call this before announcing readiness.
#[cfg(unix)]
pub fn shutdown_signal()
-> Result<impl std::future::Future<Output = &'static str> + Send, DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let setup = |kind: SignalKind| signal(kind).map_err(|e| DaemonError::SignalSetup(e.to_string()));
    let mut sigterm = setup(SignalKind::terminate())?;
    let mut sigint = setup(SignalKind::interrupt())?;
    let mut sighup = setup(SignalKind::hangup())?;

    info!("OS signal handlers installed (SIGTERM, SIGINT, SIGHUP)");
    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
            _ = sighup.recv() => "SIGHUP",
        }
    })
}

#[cfg(not(unix))]
pub fn shutdown_signal()
-> Result<impl std::future::Future<Output = &'static str> + Send, DaemonError> {
    info!("OS signal handlers installed (Ctrl+C only)");
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
        "Ctrl+C"
    })
}

/// Send a stop signal to a running daemon process.
#[cfg(unix)]
pub fn send_signal_to_pid(pid: u32, signal: StopSignal) -> Result<(), DaemonError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| DaemonError::Custom(format!("PID {} out of range", pid)))?;
    let nix_signal = match signal {
        StopSignal::Terminate => Signal::SIGTERM,
        StopSignal::Kill => Signal::SIGKILL,
    };

    kill(Pid::from_raw(raw), nix_signal).map_err(|e| {
        DaemonError::Custom(format!("Failed to send {} to PID {}: {}", signal, pid, e))
    })?;

    info!("Sent {} to PID {}", signal, pid);
    Ok(())
}

#[cfg(not(unix))]
pub fn send_signal_to_pid(_pid: u32, _signal: StopSignal) -> Result<(), DaemonError> {
    Err(DaemonError::Custom(
        "Signal sending not supported on this platform".to_string(),
    ))
}
