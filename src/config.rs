//! Configuration file handling
//!
//! Settings are read from `--config <path>` if given, otherwise from
//! `<config dir>/tailview/config.toml` when that file exists. Anything not set
//! in the file keeps its default; command-line flags are applied on top.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use tailview_client::{Backoff, Endpoints};
use tailview_logs::{ControllerConfig, DedupPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub buffer: BufferConfig,
    pub push: PushConfig,
}

/// Where the log backend lives
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub logs_path: String,
    pub delete_path: String,
    pub push_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            logs_path: "/api/logs".to_string(),
            delete_path: "/api/logs".to_string(),
            push_path: "/ws/logs".to_string(),
        }
    }
}

/// Memory and display limits
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub max_stored: usize,
    pub display_cap: usize,
    pub page_size: usize,
    pub dedup: DedupPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        let defaults = ControllerConfig::default();
        Self {
            max_stored: defaults.max_stored,
            display_cap: defaults.display_cap,
            page_size: defaults.page_size,
            dedup: defaults.dedup,
        }
    }
}

/// Push channel reconnect timing
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("tailview").join("config.toml"))
    }

    /// Load settings from `explicit`, or from the default location if present
    ///
    /// An explicitly named file must exist; a missing default file just
    /// means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content, &path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject settings the controller cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer.max_stored == 0 {
            return Err(ConfigError::Invalid("buffer.max_stored must be at least 1".into()));
        }
        if self.buffer.display_cap == 0 {
            return Err(ConfigError::Invalid("buffer.display_cap must be at least 1".into()));
        }
        if self.buffer.page_size == 0 {
            return Err(ConfigError::Invalid("buffer.page_size must be at least 1".into()));
        }
        if self.push.initial_backoff_ms == 0 {
            return Err(ConfigError::Invalid("push.initial_backoff_ms must be at least 1".into()));
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Result<Endpoints, tailview_client::ClientError> {
        Endpoints::new(
            &self.server.base_url,
            self.server.logs_path.as_str(),
            self.server.delete_path.as_str(),
            self.server.push_path.as_str(),
        )
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            max_stored: self.buffer.max_stored,
            display_cap: self.buffer.display_cap,
            page_size: self.buffer.page_size,
            dedup: self.buffer.dedup,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.push.initial_backoff_ms),
            Duration::from_millis(self.push.max_backoff_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Config, ConfigError> {
        Config::parse(content, Path::new("test.toml"))
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.buffer.max_stored, 2000);
        assert_eq!(config.buffer.display_cap, 1500);
        assert_eq!(config.buffer.page_size, 200);
        assert_eq!(config.buffer.dedup, DedupPolicy::Off);
        assert_eq!(config.server.push_path, "/ws/logs");
    }

    #[test]
    fn test_partial_sections() {
        let config = parse(
            r#"
            [server]
            base_url = "https://logs.example.com"

            [buffer]
            page_size = 50
            dedup = "identity"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.base_url, "https://logs.example.com");
        assert_eq!(config.server.logs_path, "/api/logs");
        assert_eq!(config.buffer.page_size, 50);
        assert_eq!(config.buffer.max_stored, 2000);
        assert_eq!(config.buffer.dedup, DedupPolicy::Identity);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse("[buffer]\nmax_stored = \"lots\"").unwrap_err();
        assert!(err.to_string().contains("test.toml"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.buffer.display_cap = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/tailview.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_backoff_from_settings() {
        let config = parse("[push]\ninitial_backoff_ms = 250\nmax_backoff_ms = 1000").unwrap();
        let backoff = config.backoff();
        assert_eq!(backoff.initial, Duration::from_millis(250));
        assert_eq!(backoff.max, Duration::from_secs(1));
    }
}
