//! Per-session PID file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::DaemonError;

/// Marks which process serves a session.
///
/// A file written by [`PidFile::claim`] is deleted again when the value is
/// dropped, unless another daemon has taken it over since. Files only
/// inspected are left alone.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    /// PID this value wrote.
    owned: Option<u32>,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn is_owned(&self) -> bool {
        self.owned.is_some()
    }

    /// Whether the file still holds the PID this value wrote.
    pub fn is_current(&self) -> bool {
        self.owned.is_some() && matches!(self.read(), Ok(pid) if pid == self.owned)
    }

    /// The recorded PID. `Ok(None)` when there is no file.
    pub fn read(&self) -> Result<Option<u32>, DaemonError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DaemonError::PidFile {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        contents
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DaemonError::CorruptPidFile {
                path: self.path.clone(),
                contents: contents.trim().to_string(),
            })
    }

    /// PID of a process that is still alive. Unreadable files count as stale.
    pub fn live_pid(&self) -> Option<u32> {
        match self.read() {
            Ok(pid) => pid.filter(|&pid| is_process_running(pid)),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    /// Record this process, replacing a file left by a dead one.
    pub fn claim(&mut self) -> Result<(), DaemonError> {
        if let Some(pid) = self.live_pid() {
            return Err(DaemonError::AlreadyRunning {
                path: self.path.clone(),
                pid,
            });
        }
        if self.exists() {
            warn!("Replacing stale PID file {}", self.path.display());
        }
        self.write(std::process::id())
    }

    pub fn write(&mut self, pid: u32) -> Result<(), DaemonError> {
        let io_err = |source| DaemonError::PidFile {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        fs::write(&self.path, pid.to_string()).map_err(io_err)?;
        self.owned = Some(pid);
        info!("Wrote PID {} to {}", pid, self.path.display());
        Ok(())
    }

    /// Delete the file. A file that is already gone is fine, and one that
    /// now names a different process is left in place.
    pub fn release(&mut self) -> Result<(), DaemonError> {
        if let Some(pid) = self.owned.take() {
            if let Ok(Some(current)) = self.read() {
                if current != pid {
                    debug!("{} now belongs to PID {}", self.path.display(), current);
                    return Ok(());
                }
            }
        }
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DaemonError::PidFile {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if self.owned.is_some() {
            if let Err(e) = self.release() {
                warn!("{}", e);
            }
        }
    }
}

/// Whether `pid` names a live process. Signal 0 probes without delivering;
/// `EPERM` means the process exists but belongs to someone else.
#[cfg(unix)]
pub fn is_process_running(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => matches!(kill(Pid::from_raw(raw), None), Ok(()) | Err(Errno::EPERM)),
        _ => false,
    }
}

#[cfg(not(unix))]
pub fn is_process_running(_pid: u32) -> bool {
    true
}

#[cfg(test)]
#[path = "pid_tests.rs"]
mod tests;
