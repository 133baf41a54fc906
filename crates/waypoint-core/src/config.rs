//! Client configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/waypoint/config.toml)
//! 3. Environment variables (WAYPOINT_* prefix)
//!
//! Environment variables take precedence over config file values.
//! A negative `api_port` puts the client in offline mode.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
const ENV_PREFIX: &str = "WAYPOINT";

/// Default backend port
pub const DEFAULT_API_PORT: i32 = 43098;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 8000;

/// Timeout used by directory imports
pub const DEFAULT_IMPORT_TIMEOUT_MS: u64 = 60000;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Backend port on 127.0.0.1; negative means offline
    #[serde(default = "default_api_port")]
    pub api_port: i32,

    /// Timeout for ordinary requests, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Timeout for directory imports, in milliseconds
    #[serde(default = "default_import_timeout_ms")]
    pub import_timeout_ms: u64,

    /// Optional log file (CLI logs to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            import_timeout_ms: DEFAULT_IMPORT_TIMEOUT_MS,
            log_file: None,
        }
    }
}

impl Config {
    /// Configuration for a given port with default timeouts
    pub fn with_port(api_port: i32) -> Self {
        Self {
            api_port,
            ..Self::default()
        }
    }

    /// Configuration that never touches the network
    pub fn offline() -> Self {
        Self::with_port(-1)
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (WAYPOINT_API_PORT, WAYPOINT_REQUEST_TIMEOUT_MS, ...)
    /// 2. Config file (~/.config/waypoint/config.toml or WAYPOINT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var(format!("{}_API_PORT", ENV_PREFIX)) {
            self.api_port = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}_API_PORT: {:?}", ENV_PREFIX, val))?;
        }

        if let Ok(val) = std::env::var(format!("{}_REQUEST_TIMEOUT_MS", ENV_PREFIX)) {
            self.request_timeout_ms = val.trim().parse().with_context(|| {
                format!("Invalid {}_REQUEST_TIMEOUT_MS: {:?}", ENV_PREFIX, val)
            })?;
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with WAYPOINT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("waypoint")
            .join("config.toml")
    }

    /// Whether every operation is short-circuited locally
    pub fn is_offline(&self) -> bool {
        self.api_port < 0
    }

    /// Backend base URL, or `None` in offline mode
    pub fn base_url(&self) -> Option<String> {
        if self.is_offline() {
            None
        } else {
            Some(format!("http://127.0.0.1:{}", self.api_port))
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn import_timeout(&self) -> Duration {
        Duration::from_millis(self.import_timeout_ms)
    }
}

fn default_api_port() -> i32 {
    DEFAULT_API_PORT
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_import_timeout_ms() -> u64 {
    DEFAULT_IMPORT_TIMEOUT_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "WAYPOINT_API_PORT",
        "WAYPOINT_REQUEST_TIMEOUT_MS",
        "WAYPOINT_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_port, 43098);
        assert_eq!(config.request_timeout_ms, 8000);
        assert_eq!(config.import_timeout_ms, 60000);
        assert!(!config.is_offline());
        assert_eq!(
            config.base_url().as_deref(),
            Some("http://127.0.0.1:43098")
        );
    }

    #[test]
    fn test_negative_port_is_offline() {
        let config = Config::with_port(-1);
        assert!(config.is_offline());
        assert!(config.base_url().is_none());

        // Port zero is still online
        assert!(!Config::with_port(0).is_offline());
    }

    #[test]
    fn test_env_override_port() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("WAYPOINT_API_PORT", "-1");
        config.apply_env_overrides().unwrap();
        assert!(config.is_offline());

        env::set_var("WAYPOINT_API_PORT", "not-a-port");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_env_override_timeout_and_log_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("WAYPOINT_REQUEST_TIMEOUT_MS", "250");
        env::set_var("WAYPOINT_LOG_FILE", "/tmp/waypoint.log");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/waypoint.log")));

        // Empty string clears it
        env::set_var("WAYPOINT_LOG_FILE", "");
        config.apply_env_overrides().unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_str(
            r#"
            api_port = 5000
            request_timeout_ms = 1500
        "#,
        )
        .unwrap();
        assert_eq!(config.api_port, 5000);
        assert_eq!(config.request_timeout_ms, 1500);
        // Unspecified keys keep their defaults
        assert_eq!(config.import_timeout_ms, 60000);
    }

    #[test]
    fn test_load_from_path() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_port = -1").unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert!(config.is_offline());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_path(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_serialization() {
        let config = Config {
            api_port: 9000,
            request_timeout_ms: 100,
            import_timeout_ms: 200,
            log_file: Some(PathBuf::from("/var/log/waypoint.log")),
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("api_port"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
