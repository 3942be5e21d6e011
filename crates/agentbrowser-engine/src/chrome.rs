//! Locating and launching a Chromium-family browser.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::types::LaunchOptions;

const PORT_FILE: &str = "DevToolsActivePort";
const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Find a Chrome executable in the usual install locations.
pub fn find_chrome() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    let paths: &[&str] = &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    ];

    #[cfg(target_os = "linux")]
    let paths: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ];

    #[cfg(target_os = "windows")]
    let paths: &[&str] = &[
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    let paths: &[&str] = &[];

    paths.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Command-line flags for a launch.
pub(crate) fn chrome_args(options: &LaunchOptions, profile_dir: &Path) -> Vec<String> {
    let mut args = vec![
        "--remote-debugging-port=0".to_string(),
        format!("--user-data-dir={}", profile_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-sync".to_string(),
        "--disable-translate".to_string(),
        "--metrics-recording-only".to_string(),
    ];

    if options.headless {
        args.push("--headless=new".to_string());
    }

    if let Some((width, height)) = options.viewport {
        args.push(format!("--window-size={},{}", width, height));
    }

    if !options.extensions.is_empty() {
        let list = options
            .extensions
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        args.push(format!("--disable-extensions-except={}", list));
        args.push(format!("--load-extension={}", list));
    }

    args.extend(options.args.iter().cloned());
    args.push("about:blank".to_string());
    args
}

/// Parse `DevToolsActivePort`: the port on the first line, the browser
/// target path on the second.
pub(crate) fn parse_port_file(contents: &str) -> Option<String> {
    let mut lines = contents.lines();
    let port: u16 = lines.next()?.trim().parse().ok()?;
    let path = lines.next()?.trim();
    if !path.starts_with('/') {
        return None;
    }
    Some(format!("ws://127.0.0.1:{}{}", port, path))
}

/// A browser process started by us.
pub(crate) struct ChromeProcess {
    child: Child,
    /// Throwaway profile, removed on drop.
    _temp_profile: Option<TempDir>,
    pub(crate) ws_url: String,
}

impl ChromeProcess {
    pub(crate) async fn launch(options: &LaunchOptions) -> Result<Self, EngineError> {
        let executable = options
            .executable_path
            .clone()
            .or_else(find_chrome)
            .ok_or_else(|| {
                EngineError::LaunchFailed(
                    "Chrome not found. Install Chrome or set AGENT_BROWSER_EXECUTABLE_PATH"
                        .to_string(),
                )
            })?;

        let (profile_dir, temp_profile) = match &options.profile_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                (dir.clone(), None)
            }
            None => {
                let temp = tempfile::Builder::new().prefix("agentbrowser-").tempdir()?;
                (temp.path().to_path_buf(), Some(temp))
            }
        };

        // A stale port file from an earlier run would point at a dead socket.
        let port_file = profile_dir.join(PORT_FILE);
        if port_file.exists() {
            if let Err(e) = std::fs::remove_file(&port_file) {
                warn!("Failed to remove stale {}: {}", PORT_FILE, e);
            }
        }

        info!(
            "Launching {} with profile at {}",
            executable.display(),
            profile_dir.display()
        );

        let mut child = Command::new(&executable)
            .args(chrome_args(options, &profile_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::LaunchFailed(format!("{}: {}", executable.display(), e)))?;

        info!("Chrome launched with PID: {:?}", child.id());

        let start = Instant::now();
        let ws_url = loop {
            if let Ok(contents) = tokio::fs::read_to_string(&port_file).await {
                if let Some(url) = parse_port_file(&contents) {
                    break url;
                }
            }
            if let Ok(Some(status)) = child.try_wait() {
                return Err(EngineError::LaunchFailed(format!(
                    "browser exited during startup ({})",
                    status
                )));
            }
            if start.elapsed() > STARTUP_TIMEOUT {
                let _ = child.kill().await;
                return Err(EngineError::LaunchFailed(
                    "browser did not open a DevTools port in time".to_string(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        };

        debug!("DevTools listening at {}", ws_url);
        Ok(Self {
            child,
            _temp_profile: temp_profile,
            ws_url,
        })
    }

    pub(crate) async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill browser process: {}", e);
        }
    }
}
