//! Sanity checks run by the daemon before it serves a session.

use std::fmt;

use crate::schema::{BrowserConfig, Config, DaemonConfig};

/// Upper bound for any per-command timeout, matching the protocol's cap.
pub const MAX_TIMEOUT_MS: u64 = 600_000;

const MIN_REQUEST_BYTES: usize = 1024;

/// A problem found at one config key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub path: &'static str,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors stop the daemon from starting; warnings are only logged.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: &'static str, message: impl Into<String>) {
        self.errors.push(Issue {
            path,
            message: message.into(),
        });
    }

    fn warn(&mut self, path: &'static str, message: impl Into<String>) {
        self.warnings.push(Issue {
            path,
            message: message.into(),
        });
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationReport {
        let mut report = ValidationReport::default();
        Self::check_daemon(&config.daemon, &mut report);
        Self::check_browser(&config.browser, &mut report);
        if config.logs.capacity == 0 {
            report.error("logs.capacity", "must be greater than 0");
        }
        report
    }

    fn check_daemon(daemon: &DaemonConfig, report: &mut ValidationReport) {
        if daemon.max_connections == 0 {
            report.error("daemon.max_connections", "must be greater than 0");
        }
        if daemon.max_request_bytes < MIN_REQUEST_BYTES {
            report.error(
                "daemon.max_request_bytes",
                format!("must be at least {} bytes", MIN_REQUEST_BYTES),
            );
        }
        if daemon.shutdown_timeout_secs > 60 {
            report.warn(
                "daemon.shutdown_timeout_secs",
                "over a minute; stopping the daemon may appear to hang",
            );
        }
    }

    fn check_browser(browser: &BrowserConfig, report: &mut ValidationReport) {
        if browser.viewport_width == 0 || browser.viewport_height == 0 {
            report.error("browser.viewport", "width and height must be non-zero");
        }

        let timeouts = [
            ("browser.action_timeout_ms", browser.action_timeout_ms),
            ("browser.navigation_timeout_ms", browser.navigation_timeout_ms),
        ];
        for (path, ms) in timeouts {
            if !(1..=MAX_TIMEOUT_MS).contains(&ms) {
                report.error(path, format!("must be between 1 and {} ms", MAX_TIMEOUT_MS));
            }
        }

        if let Some(cdp_url) = &browser.cdp_url {
            match url::Url::parse(cdp_url) {
                Ok(url) if matches!(url.scheme(), "ws" | "wss" | "http" | "https") => {}
                Ok(url) => report.error(
                    "browser.cdp_url",
                    format!("unsupported scheme '{}'", url.scheme()),
                ),
                Err(e) => report.error("browser.cdp_url", format!("not a URL ({})", e)),
            }
        }

        if let Some(exe) = browser.executable_path.as_deref().filter(|p| !p.exists()) {
            report.warn(
                "browser.executable_path",
                format!("{} does not exist", exe.display()),
            );
        }

        if browser.headless && !browser.extensions.is_empty() {
            report.warn(
                "browser.extensions",
                "old headless Chrome ignores extensions; run headed to be sure they load",
            );
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
