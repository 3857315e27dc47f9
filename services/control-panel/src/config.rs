//! Configuration types for the control panel

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::registers::DisplaySpec;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub toasts: ToastConfig,
    /// Per-register unit/precision overrides on top of the built-in table
    #[serde(default)]
    pub display: HashMap<String, DisplaySpec>,
}

/// Where the register backend lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToastConfig {
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_history_size() -> usize {
    100
}

impl Config {
    /// Reject values the synchronizer cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.polling.interval_ms == 0 {
            return Err(crate::PanelError::Config(
                "polling.interval_ms must be greater than zero".to_string(),
            ));
        }
        let url = &self.backend.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(crate::PanelError::Config(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                url
            )));
        }
        Ok(())
    }
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::PanelError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
