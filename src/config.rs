//! Configuration management for Limitlab
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{LimitlabError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Limitlab
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Database location
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session countdown settings
    #[serde(default)]
    pub timer: TimerConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Attach a permissive CORS layer so the activity pages can be served
    /// from another origin
    #[serde(default = "default_cors_allow_any")]
    pub cors_allow_any: bool,
}

fn default_bind_address() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_cors_allow_any() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_allow_any: default_cors_allow_any(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Explicit database path. When unset the platform data directory is used.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// Session countdown configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Countdown length given to newly created timers
    #[serde(default = "default_duration_seconds")]
    pub default_duration_seconds: i64,

    /// Poll hint sent to clients before the countdown has started
    #[serde(default = "default_poll_pending")]
    pub poll_interval_pending_seconds: u64,

    /// Poll hint sent to clients once the countdown is running
    #[serde(default = "default_poll_started")]
    pub poll_interval_started_seconds: u64,
}

fn default_duration_seconds() -> i64 {
    90
}

/// Longest countdown accepted by [`Config::validate`]
pub const MAX_DURATION_SECONDS: i64 = 24 * 60 * 60;

fn default_poll_pending() -> u64 {
    5
}

fn default_poll_started() -> u64 {
    30
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_duration_seconds: default_duration_seconds(),
            poll_interval_pending_seconds: default_poll_pending(),
            poll_interval_started_seconds: default_poll_started(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "limitlab=info,tower_http=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LimitlabError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| LimitlabError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(bind) = std::env::var("LIMITLAB_BIND_ADDRESS") {
            self.server.bind_address = bind;
        }

        if let Ok(db_path) = std::env::var("LIMITLAB_DB_PATH") {
            self.storage.db_path = Some(PathBuf::from(db_path));
        }

        if let Ok(duration) = std::env::var("LIMITLAB_TIMER_DURATION_SECONDS") {
            if let Ok(value) = duration.parse() {
                self.timer.default_duration_seconds = value;
            } else {
                tracing::warn!("Invalid LIMITLAB_TIMER_DURATION_SECONDS: {}", duration);
            }
        }

        if let Ok(level) = std::env::var("LIMITLAB_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("LIMITLAB_JSON_LOGS") {
            match json.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.json_format = true,
                "0" | "false" | "no" => self.logging.json_format = false,
                _ => tracing::warn!("Invalid LIMITLAB_JSON_LOGS: {}", json),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(db_path) = &cli.db_path {
            self.storage.db_path = Some(PathBuf::from(db_path));
        }

        if let crate::cli::Commands::Serve { bind: Some(bind) } = &cli.command {
            self.server.bind_address = bind.clone();
        }

        if cli.verbose {
            self.logging.level = "limitlab=debug,tower_http=debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_address.trim().is_empty() {
            return Err(
                LimitlabError::Config("server.bind_address cannot be empty".to_string()).into(),
            );
        }

        if self.timer.default_duration_seconds <= 0 {
            return Err(LimitlabError::Config(
                "timer.default_duration_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.timer.default_duration_seconds > MAX_DURATION_SECONDS {
            return Err(LimitlabError::Config(format!(
                "timer.default_duration_seconds must not exceed {MAX_DURATION_SECONDS}"
            ))
            .into());
        }

        if self.timer.poll_interval_pending_seconds == 0
            || self.timer.poll_interval_started_seconds == 0
        {
            return Err(LimitlabError::Config(
                "timer poll intervals must be greater than 0".to_string(),
            )
            .into());
        }

        if self.timer.poll_interval_pending_seconds > self.timer.poll_interval_started_seconds {
            return Err(LimitlabError::Config(
                "timer.poll_interval_pending_seconds must not exceed poll_interval_started_seconds"
                    .to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "127.0.0.1:3001");
        assert!(config.server.cors_allow_any);
        assert_eq!(config.timer.default_duration_seconds, 90);
        assert_eq!(config.timer.poll_interval_pending_seconds, 5);
        assert_eq!(config.timer.poll_interval_started_seconds, 30);
        assert!(config.storage.db_path.is_none());
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_bind_address() {
        let mut config = Config::default();
        config.server.bind_address = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_duration() {
        let mut config = Config::default();
        config.timer.default_duration_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_duration_upper_bound() {
        let mut config = Config::default();
        config.timer.default_duration_seconds = MAX_DURATION_SECONDS;
        assert!(config.validate().is_ok());

        config.timer.default_duration_seconds = MAX_DURATION_SECONDS + 1;
        assert!(config.validate().is_err());

        config.timer.default_duration_seconds = i64::MAX / 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_poll_interval() {
        let mut config = Config::default();
        config.timer.poll_interval_pending_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_inverted_poll_intervals() {
        let mut config = Config::default();
        config.timer.poll_interval_pending_seconds = 60;
        config.timer.poll_interval_started_seconds = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
server:
  bind_address: "0.0.0.0:8080"
  cors_allow_any: false
storage:
  db_path: "/tmp/limitlab.db"
timer:
  default_duration_seconds: 120
logging:
  json_format: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert!(!config.server.cors_allow_any);
        assert_eq!(
            config.storage.db_path,
            Some(PathBuf::from("/tmp/limitlab.db"))
        );
        assert_eq!(config.timer.default_duration_seconds, 120);
        assert_eq!(config.timer.poll_interval_pending_seconds, 5);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.bind_address, default_bind_address());
        assert_eq!(config.timer.default_duration_seconds, 90);
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = Cli::default();
        let config = Config::load("/nonexistent/limitlab.yaml", &cli).unwrap();
        assert_eq!(config.timer.default_duration_seconds, 90);
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_fields() {
        std::env::set_var("LIMITLAB_BIND_ADDRESS", "0.0.0.0:9000");
        std::env::set_var("LIMITLAB_TIMER_DURATION_SECONDS", "45");
        std::env::set_var("LIMITLAB_JSON_LOGS", "true");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("LIMITLAB_BIND_ADDRESS");
        std::env::remove_var("LIMITLAB_TIMER_DURATION_SECONDS");
        std::env::remove_var("LIMITLAB_JSON_LOGS");

        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.timer.default_duration_seconds, 45);
        assert!(config.logging.json_format);
    }

    #[test]
    #[serial]
    fn test_invalid_duration_env_var_is_ignored() {
        std::env::set_var("LIMITLAB_TIMER_DURATION_SECONDS", "ninety");
        let mut config = Config::default();
        config.apply_env_vars();
        std::env::remove_var("LIMITLAB_TIMER_DURATION_SECONDS");

        assert_eq!(config.timer.default_duration_seconds, 90);
    }

    #[test]
    fn test_cli_overrides_bind_and_db_path() {
        let cli = Cli {
            config: None,
            db_path: Some("/tmp/override.db".to_string()),
            verbose: true,
            command: Commands::Serve {
                bind: Some("0.0.0.0:4000".to_string()),
            },
        };
        let mut config = Config::default();
        config.apply_cli_overrides(&cli);

        assert_eq!(config.server.bind_address, "0.0.0.0:4000");
        assert_eq!(
            config.storage.db_path,
            Some(PathBuf::from("/tmp/override.db"))
        );
        assert!(config.logging.level.contains("limitlab=debug"));
    }
}
