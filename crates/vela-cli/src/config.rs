//! CLI configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vela_sdk::{ConnectorConfig, SessionConfig};

use crate::CliError;

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Default signing key (hex), used when `--key` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Fee increase for cancel and speed-up, in percent
    #[serde(default = "default_fee_bump_percent")]
    pub fee_bump_percent: u32,
    /// Simulate writes before sending them
    #[serde(default = "default_safe_mode")]
    pub safe_mode: bool,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_fee_bump_percent() -> u32 {
    ConnectorConfig::default().fee_bump_percent
}

fn default_safe_mode() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            private_key: None,
            fee_bump_percent: default_fee_bump_percent(),
            safe_mode: default_safe_mode(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".vela"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Connector settings derived from this config
    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            fee_bump_percent: self.fee_bump_percent,
            ..Default::default()
        }
    }

    /// Session settings derived from this config
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            safe_mode: self.safe_mode,
            ..Default::default()
        }
    }

    /// `explicit` if given, else the configured default key
    pub fn signing_key(&self, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| self.private_key.clone())
    }
}
