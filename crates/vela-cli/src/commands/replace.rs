//! `vela cancel` and `vela speed-up`: replace a pending transaction

use clap::Args;
use vela_abi::H256;
use vela_sdk::FeeOverride;

use crate::commands::{connect, print_record};
use crate::{config::Config, CliError};

/// Which replacement to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// Zero-value self-transfer at the same nonce
    Cancel,
    /// Same transaction with a higher fee
    SpeedUp,
}

/// Arguments shared by `vela cancel` and `vela speed-up`
#[derive(Debug, Args)]
pub struct ReplaceArgs {
    /// Hash of the pending transaction
    #[arg(long)]
    pub hash: String,
    /// Private key (hex); defaults to the configured key
    #[arg(short, long)]
    pub key: Option<String>,
    /// Explicit priority fee in wei (EIP-1559 transactions)
    #[arg(long, conflicts_with = "gas_price")]
    pub priority_fee: Option<u128>,
    /// Explicit gas price in wei (legacy transactions)
    #[arg(long)]
    pub gas_price: Option<u128>,
}

impl ReplaceArgs {
    pub async fn execute(self, kind: Replacement, config: &Config, json: bool) -> Result<(), CliError> {
        let hash = parse_hash(&self.hash)?;
        let fee_override = match (self.priority_fee, self.gas_price) {
            (Some(fee), _) => Some(FeeOverride::PriorityFee(fee)),
            (None, Some(price)) => Some(FeeOverride::GasPrice(price)),
            (None, None) => None,
        };

        let key = config.signing_key(self.key);
        let connector = connect(config, key.as_deref()).await?;
        let original = connector
            .client()
            .get_transaction(&hash)
            .await?
            .ok_or_else(|| CliError::NotFound(format!("transaction {}", self.hash)))?;

        let (replacement, title) = match kind {
            Replacement::Cancel => (
                connector.cancel_transaction(&original, fee_override).await?,
                "Cancellation sent",
            ),
            Replacement::SpeedUp => (
                connector.speed_up_transaction(&original, fee_override).await?,
                "Replacement sent",
            ),
        };
        print_record(&replacement, title, json)
    }
}

fn parse_hash(s: &str) -> Result<H256, CliError> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| CliError::InvalidInput(format!("transaction hash: {}", e)))?;
    if bytes.len() != 32 {
        return Err(CliError::InvalidInput(format!(
            "transaction hash must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(H256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hash() {
        let hash = parse_hash(&format!("0x{}", "ab".repeat(32))).unwrap();
        assert_eq!(hash, H256::repeat_byte(0xab));
        assert!(parse_hash(&"ab".repeat(32)).is_ok());
        assert!(matches!(parse_hash("0x1234"), Err(CliError::InvalidInput(_))));
        assert!(matches!(parse_hash("0xzz"), Err(CliError::InvalidInput(_))));
    }
}
