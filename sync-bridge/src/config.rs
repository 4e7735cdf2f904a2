//! Configuration loading for sync-bridge.
//!
//! Configuration is loaded from a TOML file. Every section is optional.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the session bridge.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Capacity limits.
    pub limits: LimitsConfig,
    /// Graceful unbind configuration.
    pub shutdown: ShutdownConfig,
    /// Log filter used by bindings that install a subscriber.
    pub logging: LoggingConfig,
}

/// Capacity limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum live sessions per bridge (default: 4096, 0 = unbounded).
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

/// Graceful unbind configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownConfig {
    /// How long a graceful unbind waits for in-flight calls (default: 5000ms).
    /// The session is aborted when the wait runs out.
    #[serde(default = "default_quiesce_timeout_ms")]
    pub quiesce_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default value functions
fn default_max_sessions() -> usize {
    4096
}

fn default_quiesce_timeout_ms() -> u64 {
    5000
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            quiesce_timeout_ms: default_quiesce_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl LimitsConfig {
    /// Session cap, or `None` when unbounded.
    pub fn session_limit(&self) -> Option<usize> {
        (self.max_sessions > 0).then_some(self.max_sessions)
    }
}

impl ShutdownConfig {
    /// Quiesce wait as a [`Duration`].
    pub fn quiesce_timeout(&self) -> Duration {
        Duration::from_millis(self.quiesce_timeout_ms)
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = BridgeConfig::default();
        assert_eq!(config.limits.max_sessions, 4096);
        assert_eq!(config.limits.session_limit(), Some(4096));
        assert_eq!(config.shutdown.quiesce_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[limits]
max_sessions = 16

[shutdown]
quiesce_timeout_ms = 250

[logging]
filter = "tether_sync_bridge=debug"
"#;
        let config = BridgeConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.limits.max_sessions, 16);
        assert_eq!(config.shutdown.quiesce_timeout_ms, 250);
        assert_eq!(config.logging.filter, "tether_sync_bridge=debug");
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = BridgeConfig::from_toml_str("[shutdown]\n").unwrap();
        assert_eq!(config.limits.max_sessions, 4096);
        assert_eq!(config.shutdown.quiesce_timeout_ms, 5000);

        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn zero_max_sessions_is_unbounded() {
        let config = BridgeConfig::from_toml_str("[limits]\nmax_sessions = 0\n").unwrap();
        assert_eq!(config.limits.session_limit(), None);
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let result = BridgeConfig::from_toml_str("[limits]\nmax_sessions = \"many\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[shutdown]\nquiesce_timeout_ms = 10").unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.shutdown.quiesce_timeout_ms, 10);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = BridgeConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
