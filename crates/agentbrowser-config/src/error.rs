use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config file at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `${VAR}` placeholder names an unset variable.
    #[error("Config references ${{{0}}}, which is not set")]
    UnsetVariable(String),

    #[error("Bad placeholder pattern: {0}")]
    Placeholder(String),

    /// An `AGENT_BROWSER_*` override could not be interpreted.
    #[error("{var}={value:?}: {reason}")]
    BadOverride {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}
