//! Connector and session configuration

use serde::{Deserialize, Serialize};

use crate::fees::{FeeBumpStrategy, DEFAULT_FEE_BUMP_PERCENT};
use crate::units::ETHER_DECIMALS;
use crate::SdkError;

/// Connector settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Fee increase applied by cancel/speed-up/change, in percent
    #[serde(default = "default_fee_bump_percent")]
    pub fee_bump_percent: u32,

    /// Fee bump formula
    #[serde(default)]
    pub fee_bump_strategy: FeeBumpStrategy,

    /// Ask the wallet for accounts (`eth_requestAccounts`) instead of reading
    /// already exposed ones
    #[serde(default)]
    pub request_accounts: bool,

    /// Interval between log filter polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_fee_bump_percent() -> u32 {
    DEFAULT_FEE_BUMP_PERCENT
}

fn default_poll_interval_ms() -> u64 {
    4000
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            fee_bump_percent: default_fee_bump_percent(),
            fee_bump_strategy: FeeBumpStrategy::default(),
            request_accounts: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ConnectorConfig {
    /// Load from a TOML string; missing fields take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self, SdkError> {
        Ok(toml::from_str(s)?)
    }
}

/// Contract session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Simulate writes before sending them
    #[serde(default = "default_true")]
    pub safe_mode: bool,

    /// Decimals of the native currency used to scale `value`
    #[serde(default = "default_denomination_decimals")]
    pub denomination_decimals: usize,
}

fn default_true() -> bool {
    true
}

fn default_denomination_decimals() -> usize {
    ETHER_DECIMALS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            safe_mode: true,
            denomination_decimals: ETHER_DECIMALS,
        }
    }
}

impl SessionConfig {
    /// Load from a TOML string; missing fields take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self, SdkError> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let connector = ConnectorConfig::default();
        assert_eq!(connector.fee_bump_percent, 10);
        assert_eq!(connector.fee_bump_strategy, FeeBumpStrategy::PercentageWithFloor);

        let session = SessionConfig::default();
        assert!(session.safe_mode);
        assert_eq!(session.denomination_decimals, 18);
    }

    #[test]
    fn test_partial_toml() {
        let config = ConnectorConfig::from_toml_str(
            "fee_bump_percent = 25\nfee_bump_strategy = \"percentage\"\n",
        )
        .unwrap();
        assert_eq!(config.fee_bump_percent, 25);
        assert_eq!(config.fee_bump_strategy, FeeBumpStrategy::Percentage);
        assert_eq!(config.poll_interval_ms, 4000);

        let session = SessionConfig::from_toml_str("safe_mode = false").unwrap();
        assert!(!session.safe_mode);
        assert_eq!(session.denomination_decimals, 18);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ConnectorConfig::from_toml_str("fee_bump_percent = \"ten\""),
            Err(SdkError::Config(_))
        ));
    }
}
