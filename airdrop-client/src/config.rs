//! Configuration for an airdrop session.
//!
//! Every field has a default, so an empty `[session]` table (or no file at
//! all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionConfig {
    /// How long to wait for the daemon to report readiness (default: 15000).
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,
    /// Fetch the download directory along with device info (default: true).
    #[serde(default = "default_fetch_download_dir")]
    pub fetch_download_dir: bool,
}

impl SessionConfig {
    /// Readiness timeout as a duration.
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    /// Set the readiness timeout.
    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable or disable the download directory fetch.
    pub fn with_fetch_download_dir(mut self, enabled: bool) -> Self {
        self.fetch_download_dir = enabled;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: default_readiness_timeout_ms(),
            fetch_download_dir: default_fetch_download_dir(),
        }
    }
}

// Default value functions
fn default_readiness_timeout_ms() -> u64 {
    15_000
}

fn default_fetch_download_dir() -> bool {
    true
}
