//! Runtime options derived from the configuration file.

use std::time::Duration;

use agentbrowser_config::{BrowserConfig, Config, DaemonConfig};
use agentbrowser_engine::LaunchOptions;
use agentbrowser_session::DispatcherConfig;

/// Limits applied by the IPC server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub max_connections: usize,
    /// Longest request line accepted, newline included.
    pub max_request_bytes: usize,
    /// Grace period for in-flight connections on shutdown.
    pub shutdown_timeout: Duration,
    /// Capacity of each session log buffer.
    pub log_capacity: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ServerOptions {
    fn from(config: &Config) -> Self {
        let DaemonConfig {
            shutdown_timeout_secs,
            max_connections,
            max_request_bytes,
            ..
        } = config.daemon;
        Self {
            max_connections,
            max_request_bytes,
            shutdown_timeout: Duration::from_secs(shutdown_timeout_secs),
            log_capacity: config.logs.capacity,
        }
    }
}

/// Dispatcher defaults for the browser section.
pub fn dispatcher_config(browser: &BrowserConfig) -> DispatcherConfig {
    DispatcherConfig {
        launch: LaunchOptions {
            headless: browser.headless,
            executable_path: browser.executable_path.clone(),
            cdp_url: browser.cdp_url.clone(),
            viewport: Some((browser.viewport_width, browser.viewport_height)),
            profile_dir: browser.profile_dir.clone(),
            args: browser.args.clone(),
            extensions: browser.extensions.clone(),
        },
        action_timeout: browser.action_timeout(),
        navigation_timeout: browser.navigation_timeout(),
    }
}
