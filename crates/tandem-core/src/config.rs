//! Controller configuration

use crate::{Error, Result, TrackKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable overriding [`ControllerConfig::base_url`]
pub const BASE_URL_ENV: &str = "TANDEM_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Playback controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Prefix for the playlist URIs of both tracks
    pub base_url: Url,
    /// Track whose time updates drive the displayed position
    pub clock_track: TrackKind,
    /// Default deadline for the loading-timeout hook (None = wait forever)
    pub loading_timeout_ms: Option<u64>,
    /// Number of notices kept for inspection
    pub notice_history: usize,
    /// Duration mismatch between tracks (seconds) that is worth a notice
    pub drift_warning_secs: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            clock_track: TrackKind::Video,
            loading_timeout_ms: None,
            notice_history: 64,
            drift_warning_secs: 1.0,
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is a valid literal")
}

impl ControllerConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Apply the `TANDEM_BASE_URL` override if it is set
    pub fn with_env(mut self) -> Result<Self> {
        if let Ok(value) = std::env::var(BASE_URL_ENV) {
            self.base_url = Url::parse(&value)?;
        }
        Ok(self)
    }

    /// Replace the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<()> {
        if self.base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "baseUrl {} cannot be used as a base",
                self.base_url
            )));
        }
        if self.notice_history == 0 {
            return Err(Error::InvalidConfig("noticeHistory must be > 0".into()));
        }
        if !self.drift_warning_secs.is_finite() || self.drift_warning_secs < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "driftWarningSecs must be >= 0, got {}",
                self.drift_warning_secs
            )));
        }
        Ok(())
    }

    /// Loading deadline as a [`Duration`]
    pub fn loading_timeout(&self) -> Option<Duration> {
        self.loading_timeout_ms.map(Duration::from_millis)
    }
}
