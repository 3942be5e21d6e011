//! agentbrowser - browser automation from the shell
//!
//! Main entry point for the CLI and the per-session daemon.

mod cli;
mod cmd_daemon;
mod commands;
mod output;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agentbrowser_config::{BrowserConfig, Config, ConfigLoader};
use agentbrowser_daemon::{
    daemon_status, ensure_daemon, DaemonClient, DaemonStatus, SessionPaths,
    DEFAULT_CLIENT_TIMEOUT,
};
use agentbrowser_protocol::{Action, Command, Response};

use crate::cli::{Cli, Commands, DaemonAction, GlobalArgs};
use crate::cmd_daemon::{browser_env, handle_daemon_command, spawn_options};
use crate::commands::build_action;
use crate::output::{render, render_error, render_json_error};

/// Log filter override, checked before `RUST_LOG`.
const ENV_LOG: &str = "AGENT_BROWSER_LOG";

/// Slack on top of the longest wait a command may do in the daemon.
const RESPONSE_MARGIN: Duration = Duration::from_secs(10);

/// Get the agentbrowser home directory (~/.agentbrowser).
fn agentbrowser_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".agentbrowser")
}

/// Set up logging.
///
/// The daemon logs to a daily file under `log_dir` as well as the console;
/// the CLI only reports warnings on stderr so stdout stays parseable.
fn init_tracing(log_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if log_dir.is_some() { "info" } else { "warn" };
    let env_filter = EnvFilter::try_from_env(ENV_LOG)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("agentbrowser")
                .filename_suffix("log")
                .max_log_files(30)
                .build(log_dir)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The worker flushes until the guard is dropped.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(log_dir.is_some()),
        )
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Resolve the configuration, then lay the command-line browser flags on top.
fn load_config(global: &GlobalArgs) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = ConfigLoader::resolve(global.config.as_deref())?;
    let overrides = browser_env(global);
    ConfigLoader::apply_env(&mut config, |key| {
        overrides
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
    })?;
    Ok(config)
}

/// How long the client waits for the daemon to answer `action`.
fn client_timeout(action: &Action, browser: &BrowserConfig, timeout: Option<u64>) -> Duration {
    let requested = match action {
        Action::Wait { timeout } => Some(*timeout),
        _ => timeout,
    };
    let longest = requested
        .map(Duration::from_millis)
        .unwrap_or_default()
        .max(browser.navigation_timeout())
        .max(browser.action_timeout());
    (longest + RESPONSE_MARGIN).max(DEFAULT_CLIENT_TIMEOUT)
}

/// Send one browser command through the session daemon, starting it first
/// if needed. Returns whether the command succeeded.
async fn run_browser_command(
    action: Action,
    global: &GlobalArgs,
    config: &Config,
    paths: &SessionPaths,
) -> Result<bool, Box<dyn std::error::Error>> {
    let command = Command::new(format!("cli-{}", std::process::id()), action);

    if command.action == Action::Close
        && !matches!(daemon_status(paths).await, DaemonStatus::Running { .. })
    {
        debug!("Session '{}' has no responsive daemon; nothing to close", paths.session());
        println!("{}", render(&Response::ok(command.id.clone(), json!({"closed": true})), global.json));
        return Ok(true);
    }

    if !ensure_daemon(paths, &spawn_options(global)?).await? {
        info!("Started daemon for session '{}'", paths.session());
    }

    let client = DaemonClient::new(paths.endpoint()).with_timeout(client_timeout(
        &command.action,
        &config.browser,
        global.timeout,
    ));
    let response = client.send(&command).await?;
    let rendered = render(&response, global.json);
    if response.is_success() || global.json {
        println!("{}", rendered);
    } else {
        eprintln!("{}", rendered);
    }
    Ok(response.is_success())
}

fn fail(message: &str, json: bool) -> ! {
    if json {
        println!("{}", render_json_error(message));
    } else {
        eprintln!("{}", render_error(message));
    }
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let global = cli.global;

    let config = match load_config(&global) {
        Ok(config) => config,
        Err(e) => fail(&e.to_string(), global.json),
    };

    let serving = matches!(
        cli.command,
        Commands::Daemon {
            action: DaemonAction::Start { foreground: true }
        }
    );
    let log_dir = serving.then(|| {
        config
            .daemon
            .log_dir
            .clone()
            .unwrap_or_else(|| agentbrowser_dir().join("logs"))
    });
    init_tracing(log_dir.as_deref())?;

    let paths = match SessionPaths::new(&global.session, config.daemon.socket_dir.as_deref()) {
        Ok(paths) => paths,
        Err(e) => fail(&e.to_string(), global.json),
    };

    match cli.command {
        Commands::Daemon { action } => {
            if let Err(e) = handle_daemon_command(action, &global, config, paths).await {
                fail(&e.to_string(), global.json);
            }
        }
        command => {
            let Some(action) = build_action(command, global.timeout) else {
                return Ok(());
            };
            match run_browser_command(action, &global, &config, &paths).await {
                Ok(true) => {}
                Ok(false) => std::process::exit(1),
                Err(e) => fail(&e.to_string(), global.json),
            }
        }
    }

    Ok(())
}
