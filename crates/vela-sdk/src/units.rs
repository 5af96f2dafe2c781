//! Decimal <-> smallest-unit conversions

use primitive_types::U256;

use crate::SdkError;

/// Decimals of the native currency
pub const ETHER_DECIMALS: usize = 18;

/// Parse a non-negative decimal string into smallest units: `"1.5"` at 18 decimals
/// is `1_500_000_000_000_000_000`.
///
/// Rejects signs, exponents, empty input and more fractional digits than `decimals`.
pub fn parse_units(amount: &str, decimals: usize) -> Result<U256, SdkError> {
    let invalid = || SdkError::InvalidValueType(amount.to_string());

    let trimmed = amount.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > decimals {
        return Err(invalid());
    }

    let scale = pow10(decimals).ok_or_else(invalid)?;
    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|_| invalid())?
    };
    let fraction = if fraction.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals);
        U256::from_dec_str(&padded).map_err(|_| invalid())?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(invalid)
}

/// Format smallest units as a decimal string without trailing zeros
pub fn format_units(amount: U256, decimals: usize) -> String {
    // 10^decimals beyond U256 means the whole part is always zero.
    let (whole, fraction) = match pow10(decimals) {
        Some(scale) => (amount / scale, amount % scale),
        None => (U256::zero(), amount),
    };
    if fraction.is_zero() {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", fraction.to_string(), width = decimals);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Parse an ether amount into wei
pub fn parse_ether(amount: &str) -> Result<U256, SdkError> {
    parse_units(amount, ETHER_DECIMALS)
}

/// Format wei as ether
pub fn format_ether(wei: U256) -> String {
    format_units(wei, ETHER_DECIMALS)
}

fn pow10(exponent: usize) -> Option<U256> {
    (0..exponent).try_fold(U256::one(), |acc, _| acc.checked_mul(U256::from(10u8)))
}
