//! Configuration management for hifiscout.
//!
//! Configuration is read from `~/.config/hifiscout/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sources::{BrowserConfig, HttpConfig};

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sources searched when neither include nor exclude is given.
    /// Empty means every registered source.
    pub default_sources: Vec<String>,
    pub search: SearchConfig,
    pub http: HttpConfig,
    pub browser: BrowserConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_sources: vec!["HifiTorget".to_string()],
            search: SearchConfig::default(),
            http: HttpConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

/// Deadlines for one search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Per-source search deadline in seconds (default: 60)
    pub source_timeout_secs: u64,

    /// Per-source deadline for releasing resources in seconds (default: 5)
    pub close_timeout_secs: u64,

    /// How long the binary waits for cleanup after Ctrl+C (default: 10)
    pub shutdown_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            source_timeout_secs: 60,
            close_timeout_secs: 5,
            shutdown_timeout_secs: 10,
        }
    }
}

impl SearchConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Load configuration from `path`, creating a commented default there
    /// when nothing exists yet.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/hifiscout/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("hifiscout").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::debug!(path = %path.display(), "wrote default config");
        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# hifiscout configuration
#
# Source names: HifiTorget, "HiFi Puls", Taktoton, "HiFi Experience",
# AudioPerformance, "Perfect Sense", Rehifi. A single word of a name is
# enough, e.g. "puls" or "experience".

# Sources searched when neither --include nor --exclude is given.
# An empty list searches every source.
default_sources = ["HifiTorget"]

[search]
# Deadline for each source's search, in seconds
source_timeout_secs = 60

# Deadline for each source to release its resources, in seconds
close_timeout_secs = 5

# How long to wait for cleanup after Ctrl+C, in seconds
shutdown_timeout_secs = 10

[http]
# Per-request timeout in seconds
timeout_secs = 30

user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"

[browser]
# Run browser in headless mode (no visible window)
headless = true

# Page load timeout in seconds
timeout_secs = 30

# Wait time after page load for dynamic content (milliseconds)
wait_after_load_ms = 1000

# Sources whose pages are rendered in headless Chrome instead of plain HTTP
sources = []
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
