//! Client configuration.
//!
//! Values resolve as: command-line flag (or its environment variable, which
//! clap folds into the flag) > config file > built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:5002/api";
pub const DEFAULT_VIEWER_URL: &str = "https://mozilla.github.io/pdf.js/web/viewer.html";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SETTLE_MS: u64 = 2000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

/// Resolved settings shared by the CLI and the TUI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The backend's citation endpoint.
    pub api_url: String,
    /// The third-party PDF viewer page.
    pub viewer_url: String,
    /// Upper bound on one request, connect to last byte.
    pub timeout: Duration,
    /// How long the viewer gets to load before the find command is sent.
    pub settle_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            viewer_url: DEFAULT_VIEWER_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }
}

/// The on-disk TOML file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub viewer_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub settle_ms: Option<u64>,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub viewer_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub settle_ms: Option<u64>,
}

impl FileConfig {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a config file. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// `{config_dir}/citesmart/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("citesmart").join("config.toml"))
}

impl Config {
    pub fn resolve(overrides: ConfigOverrides, file: FileConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs = overrides
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let settle_ms = overrides
            .settle_ms
            .or(file.settle_ms)
            .unwrap_or(DEFAULT_SETTLE_MS);

        Ok(Self {
            api_url: overrides
                .api_url
                .or(file.api_url)
                .unwrap_or(defaults.api_url),
            viewer_url: overrides
                .viewer_url
                .or(file.viewer_url)
                .unwrap_or(defaults.viewer_url),
            timeout: Duration::from_secs(timeout_secs),
            settle_delay: Duration::from_millis(settle_ms),
        })
    }

    /// Resolve against the file at `path`, or the default location when
    /// `path` is `None`.
    pub fn load(overrides: ConfigOverrides, path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => FileConfig::load(&p)?,
            None => FileConfig::default(),
        };
        Self::resolve(overrides, file)
    }
}
