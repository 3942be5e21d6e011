//! Daemon subcommand handlers, and starting the daemon on demand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use agentbrowser_config::{
    Config, ConfigValidator, ENV_EXECUTABLE_PATH, ENV_EXTENSIONS, ENV_HEADED,
};
use agentbrowser_daemon::{
    daemon_status, dispatcher_config, ensure_daemon, stop_daemon, DaemonServer, DaemonStatus,
    ServerOptions, SessionPaths, SpawnOptions,
};
use agentbrowser_engine::CdpEngine;
use agentbrowser_session::Dispatcher;

use crate::cli::{DaemonAction, GlobalArgs};

/// Handle daemon subcommands.
pub(crate) async fn handle_daemon_command(
    action: DaemonAction,
    global: &GlobalArgs,
    config: Config,
    paths: SessionPaths,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DaemonAction::Start { foreground: true } => run_foreground(config, paths).await,
        DaemonAction::Start { foreground: false } => daemon_start(global, &paths).await,
        DaemonAction::Stop { force } => daemon_stop(&paths, force).await,
        DaemonAction::Status => {
            print_status(&paths).await;
            Ok(())
        }
    }
}

/// Serve the session in this process until a signal or `close` arrives.
pub(crate) async fn run_foreground(
    config: Config,
    paths: SessionPaths,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = ConfigValidator::validate(&config);
    for warning in &report.warnings {
        warn!("Config: {}", warning);
    }
    if !report.is_valid() {
        for e in &report.errors {
            error!("Config: {}", e);
        }
        return Err(format!("Invalid configuration ({} errors)", report.errors.len()).into());
    }

    let dispatcher = Dispatcher::new(
        Arc::new(CdpEngine::new()),
        dispatcher_config(&config.browser),
    );
    let server = DaemonServer::bind(
        &paths,
        paths.endpoint(),
        dispatcher,
        ServerOptions::from(&config),
    )
    .await?;

    info!(
        "agentbrowser daemon for session '{}' listening on {}",
        paths.session(),
        server.endpoint()
    );
    server.run_until_signal().await?;
    info!("Daemon for session '{}' stopped", paths.session());
    Ok(())
}

/// Start a detached daemon unless one already serves the session.
async fn daemon_start(
    global: &GlobalArgs,
    paths: &SessionPaths,
) -> Result<(), Box<dyn std::error::Error>> {
    let already_running = ensure_daemon(paths, &spawn_options(global)?).await?;
    let verb = if already_running { "already running" } else { "started" };
    match daemon_status(paths).await {
        DaemonStatus::Running { pid } | DaemonStatus::Unresponsive { pid } => {
            println!("Daemon {} (session: {}, PID: {})", verb, paths.session(), pid);
        }
        DaemonStatus::NotRunning => {
            println!("Daemon {} (session: {})", verb, paths.session());
        }
    }
    Ok(())
}

async fn daemon_stop(paths: &SessionPaths, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Stopping daemon for session '{}'...", paths.session());
    let pid = stop_daemon(paths, force).await?;
    println!("Daemon stopped (session: {}, PID: {})", paths.session(), pid);
    Ok(())
}

async fn print_status(paths: &SessionPaths) {
    println!("agentbrowser Daemon Status");
    println!("==========================");
    println!("Session:  {}", paths.session());
    println!("Endpoint: {}", paths.endpoint());
    println!("PID File: {}", paths.pid_path().display());

    match daemon_status(paths).await {
        DaemonStatus::Running { pid } => println!("\nDaemon is RUNNING (PID: {})", pid),
        DaemonStatus::Unresponsive { pid } => {
            println!("\nDaemon is UNRESPONSIVE (PID: {} does not answer)", pid)
        }
        DaemonStatus::NotRunning => println!("\nDaemon is NOT RUNNING"),
    }
}

/// How to re-run this binary as the session's daemon.
///
/// Browser flags given on the command line travel as environment overrides
/// so the daemon resolves the same configuration.
pub(crate) fn spawn_options(global: &GlobalArgs) -> std::io::Result<SpawnOptions> {
    let mut args = vec!["--session".to_string(), global.session.clone()];
    if let Some(config) = &global.config {
        args.push("--config".to_string());
        args.push(absolute(config)?.display().to_string());
    }
    args.extend(["daemon", "start", "--foreground"].map(String::from));

    Ok(SpawnOptions {
        program: std::env::current_exe()?,
        args,
        envs: browser_env(global),
    })
}

/// Browser flags from the command line, as `AGENT_BROWSER_*` overrides.
pub(crate) fn browser_env(global: &GlobalArgs) -> Vec<(String, String)> {
    let mut envs = Vec::new();
    if global.headed {
        envs.push((ENV_HEADED.to_string(), "1".to_string()));
    }
    if let Some(path) = &global.executable_path {
        envs.push((ENV_EXECUTABLE_PATH.to_string(), path.clone()));
    }
    if !global.extensions.is_empty() {
        envs.push((ENV_EXTENSIONS.to_string(), global.extensions.join(",")));
    }
    envs
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
