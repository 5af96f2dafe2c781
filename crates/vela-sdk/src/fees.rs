//! Fee market detection and fee-bump arithmetic
//!
//! All arithmetic is integer wei. Overflow surfaces as [`SdkError::NotANumber`].

use serde::{Deserialize, Serialize};

use crate::types::{FeeData, FeeFields};
use crate::SdkError;

/// Default fee bump, in percent
pub const DEFAULT_FEE_BUMP_PERCENT: u32 = 10;

/// Pricing scheme of the connected chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeeMarket {
    /// Not probed yet
    #[default]
    Unknown,
    /// Single gas price
    Legacy,
    /// Base fee plus priority fee
    Eip1559,
}

impl FeeMarket {
    /// Classify from a fee-data probe: a max fee figure means EIP-1559
    pub fn detect(fees: &FeeData) -> Self {
        if fees.max_fee_per_gas.is_some() {
            FeeMarket::Eip1559
        } else {
            FeeMarket::Legacy
        }
    }
}

/// How a fee grows on replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBumpStrategy {
    /// `fee * (100 + pct) / 100`, rounded down
    Percentage,
    /// As `Percentage`, but at least `fee + 1`
    #[default]
    PercentageWithFloor,
}

impl FeeBumpStrategy {
    /// Bump a single fee value
    pub fn bump(&self, fee: u128, percent: u32) -> Result<u128, SdkError> {
        let scaled = fee
            .checked_mul(100 + u128::from(percent))
            .map(|v| v / 100)
            .ok_or_else(|| SdkError::NotANumber(format!("fee {} overflows when bumped", fee)))?;
        match self {
            FeeBumpStrategy::Percentage => Ok(scaled),
            FeeBumpStrategy::PercentageWithFloor => {
                let floor = fee
                    .checked_add(1)
                    .ok_or_else(|| SdkError::NotANumber(format!("fee {} overflows", fee)))?;
                Ok(scaled.max(floor))
            }
        }
    }
}

/// Explicit fee for a replacement transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeOverride {
    /// New legacy gas price
    GasPrice(u128),
    /// New priority fee; the max fee is derived from it
    PriorityFee(u128),
}

/// Compute replacement fees for `original`.
///
/// Legacy: the override or the bumped gas price. EIP-1559: the override or
/// the bumped priority fee, and
/// `max_fee = max(bump(old_max_fee), old_max_fee - old_priority + new_priority)`.
pub fn bump_fees(
    original: &FeeFields,
    fee_override: Option<FeeOverride>,
    percent: u32,
    strategy: FeeBumpStrategy,
) -> Result<FeeFields, SdkError> {
    match *original {
        FeeFields::Legacy { gas_price } => {
            let gas_price = match fee_override {
                Some(FeeOverride::GasPrice(price)) => price,
                Some(FeeOverride::PriorityFee(_)) => {
                    return Err(SdkError::ParameterNotSupportedOnLegacyChain(
                        "maxPriorityFeePerGas".to_string(),
                    ))
                }
                None => strategy.bump(gas_price, percent)?,
            };
            Ok(FeeFields::Legacy { gas_price })
        }
        FeeFields::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => {
            let priority = match fee_override {
                Some(FeeOverride::PriorityFee(fee)) => fee,
                Some(FeeOverride::GasPrice(_)) => {
                    return Err(SdkError::InvalidParameter("gasPrice".to_string()))
                }
                None => strategy.bump(max_priority_fee_per_gas, percent)?,
            };
            let headroom = max_fee_per_gas.saturating_sub(max_priority_fee_per_gas);
            let derived = headroom
                .checked_add(priority)
                .ok_or_else(|| SdkError::NotANumber("maxFeePerGas overflow".to_string()))?;
            let max_fee = strategy.bump(max_fee_per_gas, percent)?.max(derived);
            Ok(FeeFields::Eip1559 {
                max_fee_per_gas: max_fee,
                max_priority_fee_per_gas: priority,
            })
        }
    }
}
