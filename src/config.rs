use crate::capability::CapabilityMode;
use crate::error::{PdsError, Result};
use crate::protocol::DEFAULT_PORT;
use crate::types::Variant;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for one switcher, as supplied by the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdsConfig {
    /// Device address; empty means "not configured", no connection is made
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub variant: Variant,

    /// How optional inputs/outputs are discovered
    #[serde(default)]
    pub capability_mode: CapabilityMode,

    /// Interval between preview/program/logo polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Name used in log messages
    #[serde(default)]
    pub label: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_poll_interval_ms() -> u64 {
    4000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for PdsConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            variant: Variant::default(),
            capability_mode: CapabilityMode::default(),
            poll_interval_ms: default_poll_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            label: None,
        }
    }
}

impl PdsConfig {
    /// Configuration for a device at `host` using defaults for everything else
    pub fn new(host: impl Into<String>, variant: Variant) -> Self {
        Self {
            host: host.into(),
            variant,
            ..Self::default()
        }
    }

    /// Parse a host-provided JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(PdsError::InvalidConfig("port must not be 0".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(PdsError::InvalidConfig(
                "poll interval must be greater than 0".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(PdsError::InvalidConfig(
                "connect timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a connection should be attempted
    pub fn has_host(&self) -> bool {
        !self.host.trim().is_empty()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Label for log messages, falling back to the host
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.host)
    }
}
