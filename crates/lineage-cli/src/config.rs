//! Configuration management for the lineage walker CLI.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values, which
//! take precedence over defaults. Command-line flags are applied on top by
//! the binary.
//!
//! # Example
//!
//! ```ignore
//! use lineage_cli::config::CliConfig;
//!
//! // Load from file with env overrides
//! let config = CliConfig::load("walk.yaml")?;
//!
//! // Or load from environment only
//! let config = CliConfig::from_env()?;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use lineage_domain::walker::{FanOut, FetchErrorPolicy, FetchPolicy, Traversal, WalkOptions};
use lineage_domain::{PageCache, PageCacheConfig};
use lineage_storage::MAX_PAGE_LIMIT;

/// Environment variable prefix: `LINEAGE_WALK__MAX_DEPTH` -> `walk.max_depth`.
const ENV_PREFIX: &str = "LINEAGE";

/// CLI configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CliConfig {
    /// Walk settings
    #[serde(default)]
    pub walk: WalkSettings,

    /// Relation store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Traversal settings.
///
/// # Example YAML Configuration
///
/// ```yaml
/// walk:
///   max_depth: 12
///   page_size: 50
///   traversal: bfs
///   stats_interval_ms: 500
///   on_fetch_error: fail
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WalkSettings {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Children requested per page (at most the store's page limit).
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Initial fan-out width.
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    #[serde(default = "default_hard_node_limit")]
    pub hard_node_limit: u64,

    #[serde(default)]
    pub traversal: Traversal,

    #[serde(default)]
    pub fan_out: FanOut,

    #[serde(default = "default_true")]
    pub adaptive_concurrency: bool,

    pub min_parallel: Option<usize>,

    pub max_parallel: Option<usize>,

    /// Minimum milliseconds between stats log lines; unset logs every update.
    pub stats_interval_ms: Option<u64>,

    /// Extra attempts for a failing relation read.
    #[serde(default)]
    pub fetch_retries: u32,

    #[serde(default = "default_fetch_backoff_ms")]
    pub fetch_backoff_ms: u64,

    #[serde(default)]
    pub on_fetch_error: FetchErrorPolicy,

    /// Maximum entries per page cache table.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            page_size: default_page_size(),
            parallel: default_parallel(),
            hard_node_limit: default_hard_node_limit(),
            traversal: Traversal::default(),
            fan_out: FanOut::default(),
            adaptive_concurrency: true,
            min_parallel: None,
            max_parallel: None,
            stats_interval_ms: None,
            fetch_retries: 0,
            fetch_backoff_ms: default_fetch_backoff_ms(),
            on_fetch_error: FetchErrorPolicy::default(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl WalkSettings {
    /// Builds walk options; callers add the cancellation token and observer.
    pub fn to_options(&self) -> WalkOptions {
        let mut options = WalkOptions::default()
            .with_max_depth(self.max_depth)
            .with_page_size(self.page_size)
            .with_parallel(self.parallel)
            .with_hard_node_limit(self.hard_node_limit)
            .with_traversal(self.traversal)
            .with_fan_out(self.fan_out)
            .with_adaptive_concurrency(self.adaptive_concurrency)
            .with_fetch_policy(FetchPolicy {
                retries: self.fetch_retries,
                backoff: Duration::from_millis(self.fetch_backoff_ms),
                on_error: self.on_fetch_error,
            })
            .with_page_cache(Arc::new(PageCache::new(
                PageCacheConfig::default().with_max_capacity(self.cache_capacity),
            )));
        options.min_parallel = self.min_parallel;
        options.max_parallel = self.max_parallel;
        if let Some(ms) = self.stats_interval_ms {
            options = options.with_stats_interval(Duration::from_millis(ms));
        }
        options
    }
}

fn default_max_depth() -> u32 {
    30
}

fn default_page_size() -> u64 {
    25
}

fn default_parallel() -> usize {
    6
}

fn default_hard_node_limit() -> u64 {
    20_000
}

fn default_fetch_backoff_ms() -> u64 {
    200
}

fn default_cache_capacity() -> u64 {
    250_000
}

fn default_true() -> bool {
    true
}

/// Relation store settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct StoreSettings {
    /// Path to a JSON fixture loaded into the memory store.
    pub fixture: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format
    #[serde(default)]
    pub json: bool,

    /// Log span enter/exit events (the walk runs inside a `lineage_walk` span)
    #[serde(default)]
    pub spans: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            spans: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl CliConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `LINEAGE_` and use `__` as
    /// separator, e.g. `LINEAGE_WALK__TRAVERSAL=bfs` overrides `walk.traversal`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&CliConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let cli_config: CliConfig = config.try_deserialize()?;
        cli_config.validate()?;

        Ok(cli_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&CliConfig::default())?)
            .add_source(env_source())
            .build()?;

        let cli_config: CliConfig = config.try_deserialize()?;
        cli_config.validate()?;

        Ok(cli_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let walk = &self.walk;

        if walk.max_depth == 0 {
            return Err(invalid("walk.max_depth must be at least 1"));
        }
        if walk.page_size == 0 || walk.page_size > MAX_PAGE_LIMIT {
            return Err(invalid(format!(
                "walk.page_size must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        if walk.parallel == 0 {
            return Err(invalid("walk.parallel must be at least 1"));
        }
        if walk.hard_node_limit == 0 {
            return Err(invalid("walk.hard_node_limit must be at least 1"));
        }
        if let (Some(min), Some(max)) = (walk.min_parallel, walk.max_parallel) {
            if min > max {
                return Err(invalid(format!(
                    "walk.min_parallel ({}) must not exceed walk.max_parallel ({})",
                    min, max
                )));
            }
        }
        // Every created node needs a metadata entry and at least one page
        // entry; a smaller cache evicts mid-walk and reads pages again.
        if walk.cache_capacity < walk.hard_node_limit {
            return Err(invalid(format!(
                "walk.cache_capacity ({}) must be at least walk.hard_node_limit ({})",
                walk.cache_capacity, walk.hard_node_limit
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
walk:
  max_depth: 12
  page_size: 50
  traversal: bfs
  fan_out: concurrent
  stats_interval_ms: 500
  on_fetch_error: fail
  fetch_retries: 2

store:
  fixture: family.json

logging:
  level: debug
  json: true
  spans: true
"#
        )
        .unwrap();

        let config = CliConfig::load(file.path()).unwrap();

        assert_eq!(config.walk.max_depth, 12);
        assert_eq!(config.walk.page_size, 50);
        assert_eq!(config.walk.traversal, Traversal::Bfs);
        assert_eq!(config.walk.fan_out, FanOut::Concurrent);
        assert_eq!(config.walk.stats_interval_ms, Some(500));
        assert_eq!(config.walk.on_fetch_error, FetchErrorPolicy::Fail);
        assert_eq!(config.walk.fetch_retries, 2);
        assert_eq!(config.walk.parallel, 6);
        assert_eq!(config.store.fixture.as_deref(), Some("family.json"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.logging.spans);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
walk:
  max_depth: 12
  traversal: dfs
"#
        )
        .unwrap();

        std::env::set_var("LINEAGE_WALK__TRAVERSAL", "bfs");
        std::env::set_var("LINEAGE_LOGGING__LEVEL", "error");

        let config = CliConfig::load(file.path());

        std::env::remove_var("LINEAGE_WALK__TRAVERSAL");
        std::env::remove_var("LINEAGE_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.walk.traversal, Traversal::Bfs); // Overridden by env
        assert_eq!(config.walk.max_depth, 12); // From file
        assert_eq!(config.logging.level, "error"); // Overridden by env
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("LINEAGE_WALK__HARD_NODE_LIMIT", "500");

        let config = CliConfig::from_env();

        std::env::remove_var("LINEAGE_WALK__HARD_NODE_LIMIT");

        let config = config.unwrap();
        assert_eq!(config.walk.hard_node_limit, 500);
        assert_eq!(config.walk.page_size, 25); // default
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = CliConfig::default();
        config.walk.page_size = MAX_PAGE_LIMIT + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("walk.page_size"));

        let mut config = CliConfig::default();
        config.walk.min_parallel = Some(8);
        config.walk.max_parallel = Some(2);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("walk.min_parallel"));

        let mut config = CliConfig::default();
        config.walk.hard_node_limit = 1_000;
        config.walk.cache_capacity = 999;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("walk.cache_capacity"));
        config.walk.cache_capacity = 1_000;
        assert!(config.validate().is_ok());

        let mut config = CliConfig::default();
        config.logging.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = CliConfig::load("/nonexistent/path/walk.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();

        let err = CliConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    /// Test: Default config is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.walk.max_depth, 30);
        assert_eq!(config.walk.hard_node_limit, 20_000);
        assert!(config.walk.adaptive_concurrency);
        assert!(config.store.fixture.is_none());
    }

    #[test]
    fn test_settings_map_to_walk_options() {
        let settings = WalkSettings {
            stats_interval_ms: Some(250),
            min_parallel: Some(2),
            fetch_retries: 3,
            ..WalkSettings::default()
        };

        let options = settings.to_options();

        assert_eq!(options.stats_interval, Some(Duration::from_millis(250)));
        assert_eq!(options.min_parallel, Some(2));
        assert_eq!(options.fetch.retries, 3);
        assert!(options.page_cache.is_some());
    }
}
