//! Configuration management for airdrop-cli.
//!
//! Configuration is loaded from a TOML file (default: `airdrop.toml` in the
//! platform config directory). Every field has a default, so a missing file
//! is not an error unless it was named explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use airdrop_client::SessionConfig;

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "airdrop.toml";

/// Root configuration for airdrop-cli.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset (default: `airdrop=info`).
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "airdrop=info".to_string()
}

impl CliConfig {
    /// Load configuration from a file.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Find and load the effective configuration.
    ///
    /// An explicit path must exist. Otherwise the platform config directory
    /// is tried, then built-in defaults. Returns the file that was used.
    pub async fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            let config = Self::load(path).await?;
            return Ok((config, Some(path.to_path_buf())));
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                let config = Self::load(&path).await?;
                Ok((config, Some(path)))
            }
            _ => Ok((Self::default(), None)),
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

/// Get the default config file location for airdrop-cli.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "airdrop", "airdrop-cli")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
