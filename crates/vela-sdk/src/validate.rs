//! Local request validation: parameter kinds and fee/gas overrides
//!
//! Everything here runs before any network call.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vela_abi::{Fragment, Token, TypeTag};

use crate::convert::{decimal_text, json_kind, param_to_token, to_big_int};
use crate::fees::FeeMarket;
use crate::SdkError;

/// Native value kind expected for an ABI type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    /// Text (addresses)
    Text,
    /// Integer, given as a number or an integer string
    Numeric,
    /// Boolean
    Boolean,
    /// Decimal fraction
    Decimal,
}

impl NativeKind {
    /// Kind for a type tag; `None` for types that are not kind-checked
    pub fn for_tag(tag: TypeTag) -> Option<Self> {
        match tag {
            TypeTag::Address => Some(NativeKind::Text),
            TypeTag::UInt | TypeTag::Int => Some(NativeKind::Numeric),
            TypeTag::Bool => Some(NativeKind::Boolean),
            TypeTag::Fixed => Some(NativeKind::Decimal),
            TypeTag::Other => None,
        }
    }
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NativeKind::Text => "string",
            NativeKind::Numeric => "number",
            NativeKind::Boolean => "boolean",
            NativeKind::Decimal => "decimal",
        })
    }
}

/// Check one value against the native kind of its ABI type
fn check_kind(name: &str, kind: NativeKind, value: &Value) -> Result<(), SdkError> {
    let ok = match kind {
        NativeKind::Text => value.is_string(),
        NativeKind::Boolean => value.is_boolean(),
        NativeKind::Decimal => decimal_text(value).is_some(),
        NativeKind::Numeric => {
            if to_big_int(value).is_some() {
                true
            } else {
                return Err(SdkError::NotBigNumberish(name.to_string()));
            }
        }
    };
    if ok {
        Ok(())
    } else {
        Err(SdkError::InvalidParamType {
            name: name.to_string(),
            expected: kind.to_string(),
            actual: json_kind(value).to_string(),
        })
    }
}

/// Check arity and kinds of `params` against `fragment`, then convert them to tokens.
///
/// Kind violations are all collected; a single one is returned as is, several as
/// [`SdkError::InvalidParams`].
pub fn check_params(fragment: &Fragment, params: &[Value]) -> Result<Vec<Token>, SdkError> {
    if params.len() != fragment.inputs.len() {
        return Err(SdkError::InvalidParameterCount {
            expected: fragment.inputs.len(),
            actual: params.len(),
        });
    }

    let mut errors = Vec::new();
    for (index, (input, value)) in fragment.inputs.iter().zip(params).enumerate() {
        let name = param_label(&input.name, index);
        if let Some(kind) = NativeKind::for_tag(input.kind.tag()) {
            if let Err(e) = check_kind(&name, kind, value) {
                errors.push(e);
            }
        }
    }
    if !errors.is_empty() {
        return Err(batch(errors));
    }

    let mut tokens = Vec::with_capacity(params.len());
    for (input, value) in fragment.inputs.iter().zip(params) {
        match param_to_token(input, value) {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(batch(errors))
    }
}

pub(crate) fn param_label(name: &str, index: usize) -> String {
    if name.is_empty() {
        format!("#{}", index)
    } else {
        name.to_string()
    }
}

fn batch(mut errors: Vec<SdkError>) -> SdkError {
    if errors.len() == 1 {
        errors.remove(0)
    } else {
        SdkError::InvalidParams(errors)
    }
}

/// Caller-supplied gas/fee overrides, as given (numbers or numeric strings)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
    /// Gas limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<Value>,
    /// Legacy gas price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<Value>,
    /// EIP-1559 max fee per gas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<Value>,
    /// EIP-1559 max priority fee per gas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<Value>,
    /// Sender nonce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Value>,
}

impl Overrides {
    /// Set the gas limit
    pub fn gas_limit(mut self, value: impl Into<Value>) -> Self {
        self.gas_limit = Some(value.into());
        self
    }

    /// Set the legacy gas price
    pub fn gas_price(mut self, value: impl Into<Value>) -> Self {
        self.gas_price = Some(value.into());
        self
    }

    /// Set the max fee per gas
    pub fn max_fee_per_gas(mut self, value: impl Into<Value>) -> Self {
        self.max_fee_per_gas = Some(value.into());
        self
    }

    /// Set the max priority fee per gas
    pub fn max_priority_fee_per_gas(mut self, value: impl Into<Value>) -> Self {
        self.max_priority_fee_per_gas = Some(value.into());
        self
    }

    /// Set the nonce
    pub fn nonce(mut self, value: impl Into<Value>) -> Self {
        self.nonce = Some(value.into());
        self
    }

    /// Validate against the connector's fee market.
    ///
    /// Fields must be non-negative integers. EIP-1559 fields are refused on a
    /// legacy chain. When both styles are given, `gasPrice` is dropped.
    pub fn resolve(&self, market: FeeMarket) -> Result<ResolvedOverrides, SdkError> {
        let mut resolved = ResolvedOverrides {
            gas_limit: integral(&self.gas_limit, "gasLimit")?,
            gas_price: integral(&self.gas_price, "gasPrice")?,
            max_fee_per_gas: integral(&self.max_fee_per_gas, "maxFeePerGas")?,
            max_priority_fee_per_gas: integral(
                &self.max_priority_fee_per_gas,
                "maxPriorityFeePerGas",
            )?,
            nonce: integral(&self.nonce, "nonce")?,
        };

        if market == FeeMarket::Legacy {
            if resolved.max_fee_per_gas.is_some() {
                return Err(SdkError::ParameterNotSupportedOnLegacyChain(
                    "maxFeePerGas".to_string(),
                ));
            }
            if resolved.max_priority_fee_per_gas.is_some() {
                return Err(SdkError::ParameterNotSupportedOnLegacyChain(
                    "maxPriorityFeePerGas".to_string(),
                ));
            }
        }

        if resolved.gas_price.is_some()
            && (resolved.max_fee_per_gas.is_some() || resolved.max_priority_fee_per_gas.is_some())
        {
            tracing::debug!("gasPrice dropped in favour of EIP-1559 fee fields");
            resolved.gas_price = None;
        }

        Ok(resolved)
    }
}

/// Validated overrides in wei / gas units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedOverrides {
    /// Gas limit
    pub gas_limit: Option<u64>,
    /// Legacy gas price
    pub gas_price: Option<u128>,
    /// EIP-1559 max fee per gas
    pub max_fee_per_gas: Option<u128>,
    /// EIP-1559 max priority fee per gas
    pub max_priority_fee_per_gas: Option<u128>,
    /// Sender nonce
    pub nonce: Option<u64>,
}

fn integral<T: TryFrom<u128>>(value: &Option<Value>, field: &str) -> Result<Option<T>, SdkError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let invalid = || SdkError::InvalidParameter(field.to_string());
    let n = to_big_int(value).ok_or_else(invalid)?;
    if n.negative || n.abs.bits() > 128 {
        return Err(invalid());
    }
    T::try_from(n.abs.as_u128()).map(Some).map_err(|_| invalid())
}
