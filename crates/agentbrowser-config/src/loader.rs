//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;
use crate::schema::Config;

pub const ENV_HEADED: &str = "AGENT_BROWSER_HEADED";
pub const ENV_EXECUTABLE_PATH: &str = "AGENT_BROWSER_EXECUTABLE_PATH";
pub const ENV_EXTENSIONS: &str = "AGENT_BROWSER_EXTENSIONS";
pub const ENV_SOCKET_DIR: &str = "AGENT_BROWSER_SOCKET_DIR";

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        Self::expand_paths(&mut config);
        Ok(config)
    }

    /// Load `path` if given, otherwise the default file when it exists,
    /// otherwise built-in defaults. Environment overrides are applied last.
    pub fn resolve(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => {
                    debug!("Loading config from {}", path.display());
                    Self::load(&path)?
                }
                _ => Config::default(),
            },
        };
        Self::apply_env(&mut config, |key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// `~/.agentbrowser/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".agentbrowser").join("config.toml"))
    }

    /// Apply `AGENT_BROWSER_*` overrides read through `lookup`.
    pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_HEADED) {
            config.browser.headless = match value.trim() {
                "1" | "true" => false,
                "0" | "false" | "" => true,
                other => {
                    return Err(ConfigError::BadOverride {
                        var: ENV_HEADED,
                        value: other.to_string(),
                        reason: "expected 1 or 0",
                    });
                }
            };
        }
        if let Some(path) = lookup(ENV_EXECUTABLE_PATH).filter(|p| !p.is_empty()) {
            config.browser.executable_path = Some(PathBuf::from(Self::expand_path(&path)));
        }
        if let Some(list) = lookup(ENV_EXTENSIONS) {
            config.browser.extensions = list
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| PathBuf::from(Self::expand_path(p)))
                .collect();
        }
        if let Some(dir) = lookup(ENV_SOCKET_DIR).filter(|d| !d.is_empty()) {
            config.daemon.socket_dir = Some(PathBuf::from(Self::expand_path(&dir)));
        }
        Ok(())
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::Placeholder(e.to_string()))?;
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::UnsetVariable(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    fn expand_paths(config: &mut Config) {
        let expand = |path: &PathBuf| PathBuf::from(Self::expand_path(&path.to_string_lossy()));

        for path in [
            &mut config.daemon.socket_dir,
            &mut config.daemon.log_dir,
            &mut config.browser.executable_path,
            &mut config.browser.profile_dir,
        ]
        .into_iter()
        .flatten()
        {
            *path = expand(path);
        }
        for path in &mut config.browser.extensions {
            *path = expand(path);
        }
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.browser.headless);
        assert_eq!(config.browser.action_timeout_ms, 10_000);
        assert_eq!(config.browser.navigation_timeout_ms, 30_000);
        assert_eq!(config.daemon.max_request_bytes, 1024 * 1024);
        assert_eq!(config.logs.capacity, 500);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [daemon]
            socket_dir = "/run/agentbrowser"
            shutdown_timeout_secs = 10
            max_connections = 8

            [browser]
            headless = false
            cdp_url = "ws://127.0.0.1:9222/devtools/browser/abc"
            viewport_width = 1920
            viewport_height = 1080
            args = ["--lang=en-US"]
            action_timeout_ms = 5000

            [logs]
            capacity = 50
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.daemon.socket_dir, Some(PathBuf::from("/run/agentbrowser")));
        assert_eq!(config.daemon.shutdown_timeout().as_secs(), 10);
        assert_eq!(config.daemon.max_connections, 8);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.viewport_width, 1920);
        assert_eq!(config.browser.args, vec!["--lang=en-US".to_string()]);
        assert_eq!(config.browser.action_timeout().as_millis(), 5000);
        assert_eq!(config.browser.navigation_timeout_ms, 30_000);
        assert_eq!(config.logs.capacity, 50);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logs]").unwrap();
        writeln!(file, "capacity = 20").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.logs.capacity, 20);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/agentbrowser/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("[browser\nheadless = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("AB_TEST_PROFILE_DIR", "/tmp/ab-profile");
        }
        let content = "[browser]\nprofile_dir = \"${AB_TEST_PROFILE_DIR}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.browser.profile_dir, Some(PathBuf::from("/tmp/ab-profile")));
        unsafe {
            std::env::remove_var("AB_TEST_PROFILE_DIR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "[browser]\ncdp_url = \"${AB_TEST_UNSET_VAR_31337}\"";
        let result = ConfigLoader::load_str(content);
        assert!(matches!(result, Err(ConfigError::UnsetVariable(name)) if name == "AB_TEST_UNSET_VAR_31337"));
    }

    #[test]
    fn test_tilde_paths_are_expanded() {
        let content = "[daemon]\nlog_dir = \"~/agentbrowser-logs\"";
        let config = ConfigLoader::load_str(content).unwrap();
        let log_dir = config.daemon.log_dir.unwrap();
        assert!(!log_dir.to_string_lossy().starts_with('~'));
        assert!(log_dir.ends_with("agentbrowser-logs"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        ConfigLoader::apply_env(
            &mut config,
            lookup(&[
                (ENV_HEADED, "1"),
                (ENV_EXECUTABLE_PATH, "/opt/chrome/chrome"),
                (ENV_EXTENSIONS, "/ext/a, /ext/b,"),
                (ENV_SOCKET_DIR, "/run/ab"),
            ]),
        )
        .unwrap();

        assert!(!config.browser.headless);
        assert_eq!(
            config.browser.executable_path,
            Some(PathBuf::from("/opt/chrome/chrome"))
        );
        assert_eq!(
            config.browser.extensions,
            vec![PathBuf::from("/ext/a"), PathBuf::from("/ext/b")]
        );
        assert_eq!(config.daemon.socket_dir, Some(PathBuf::from("/run/ab")));
    }

    #[test]
    fn test_env_overrides_absent_keep_file_values() {
        let mut config = ConfigLoader::load_str("[browser]\nheadless = false").unwrap();
        ConfigLoader::apply_env(&mut config, lookup(&[])).unwrap();
        assert!(!config.browser.headless);
        assert!(config.browser.extensions.is_empty());
    }

    #[test]
    fn test_env_headed_rejects_garbage() {
        let mut config = Config::default();
        let result = ConfigLoader::apply_env(&mut config, lookup(&[(ENV_HEADED, "yes please")]));
        assert!(matches!(result, Err(ConfigError::BadOverride { var: ENV_HEADED, .. })));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        assert_eq!(ConfigLoader::expand_path("/usr/bin/chromium"), "/usr/bin/chromium");
    }
}
