//! Handler configuration via a TOML file
//!
//! ```toml
//! # Thing whose shadow holds the light list
//! thing_name = "LeetoniaLinuxSystem"
//!
//! # WebSocket endpoint of the shadow store
//! store_url = "ws://127.0.0.1:8780"
//!
//! # Voice skill requests from any other application are rejected (optional)
//! application_id = "amzn1.ask.skill.04c3ebae-673e-48ed-8892-bb58feb3eb54"
//!
//! # Manufacturer reported in discovery (default "Intel")
//! manufacturer_name = "Intel"
//!
//! # How long to wait for the store to answer (default 10000)
//! request_timeout_ms = 10000
//! ```
//!
//! `SHADOW_THING_NAME`, `SHADOW_STORE_URL` and `SKILL_APPLICATION_ID` override
//! the file.

use crate::connection::DEFAULT_REQUEST_TIMEOUT;
use crate::error::{Result, ShadowError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `thing_name`
pub const ENV_THING_NAME: &str = "SHADOW_THING_NAME";
/// Environment variable overriding `store_url`
pub const ENV_STORE_URL: &str = "SHADOW_STORE_URL";
/// Environment variable overriding `application_id`
pub const ENV_APPLICATION_ID: &str = "SKILL_APPLICATION_ID";

/// Configuration shared by both front ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillConfig {
    /// Thing whose shadow holds the light list
    pub thing_name: String,
    /// WebSocket URL of the shadow store
    pub store_url: String,
    /// Voice skill application id, checked when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    /// Manufacturer reported for every discovered light
    #[serde(default = "default_manufacturer_name")]
    pub manufacturer_name: String,
    /// Store request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_manufacturer_name() -> String {
    "Intel".to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

impl SkillConfig {
    /// Create a configuration with defaults for everything but the store location
    pub fn new(thing_name: impl Into<String>, store_url: impl Into<String>) -> Self {
        Self {
            thing_name: thing_name.into(),
            store_url: store_url.into(),
            application_id: None,
            manufacturer_name: default_manufacturer_name(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SkillConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Read configuration from a file, then apply overrides found by `lookup`
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShadowError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let mut config: SkillConfig = toml::from_str(&content)?;
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Replace values with those found by `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(thing_name) = lookup(ENV_THING_NAME) {
            self.thing_name = thing_name;
        }
        if let Some(store_url) = lookup(ENV_STORE_URL) {
            self.store_url = store_url;
        }
        if let Some(application_id) = lookup(ENV_APPLICATION_ID) {
            self.application_id = Some(application_id).filter(|id| !id.is_empty());
        }
    }

    /// Check required values
    pub fn validate(&self) -> Result<()> {
        if self.thing_name.trim().is_empty() {
            return Err(ShadowError::Config("thing_name must not be empty".to_string()));
        }
        if self.store_url.trim().is_empty() {
            return Err(ShadowError::Config("store_url must not be empty".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ShadowError::Config("request_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Store request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
