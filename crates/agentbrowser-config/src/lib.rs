//! # agentbrowser config
//!
//! TOML configuration for the session daemon and the browser it drives,
//! with `AGENT_BROWSER_*` environment overrides.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::{
    ConfigLoader, ENV_EXECUTABLE_PATH, ENV_EXTENSIONS, ENV_HEADED, ENV_SOCKET_DIR,
};
pub use schema::*;
pub use validator::{ConfigValidator, Issue, ValidationReport, MAX_TIMEOUT_MS};
