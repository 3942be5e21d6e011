//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub logs: LogsConfig,
}

/// Session daemon settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding each session's socket and PID file.
    /// Defaults to the system temp directory.
    #[serde(default)]
    pub socket_dir: Option<PathBuf>,

    /// Grace period for in-flight connections on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Longest accepted request line, newline included.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// Where the daemon writes its rolling log files.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_dir: None,
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_connections: default_max_connections(),
            max_request_bytes: default_max_request_bytes(),
            log_dir: None,
        }
    }
}

impl DaemonConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_shutdown_timeout() -> u64 {
    5
}

fn default_max_connections() -> usize {
    64
}

fn default_max_request_bytes() -> usize {
    1024 * 1024
}

/// Browser launch defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Chrome binary; discovered automatically when unset.
    #[serde(default)]
    pub executable_path: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Attach to an already running browser instead of launching one.
    #[serde(default)]
    pub cdp_url: Option<String>,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Persistent profile; a throwaway one is used when unset.
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,

    /// Extra command-line switches for Chrome.
    #[serde(default)]
    pub args: Vec<String>,

    /// Unpacked extensions to load.
    #[serde(default)]
    pub extensions: Vec<PathBuf>,

    /// Actionability wait for element commands without a timeout.
    #[serde(default = "default_action_timeout")]
    pub action_timeout_ms: u64,

    /// Load wait for navigations without a timeout.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable_path: None,
            headless: default_true(),
            cdp_url: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            profile_dir: None,
            args: Vec::new(),
            extensions: Vec::new(),
            action_timeout_ms: default_action_timeout(),
            navigation_timeout_ms: default_navigation_timeout(),
        }
    }
}

impl BrowserConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

fn default_action_timeout() -> u64 {
    10_000
}

fn default_navigation_timeout() -> u64 {
    30_000
}

/// Session log buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Entries kept in each of the console, error and request logs.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    500
}
