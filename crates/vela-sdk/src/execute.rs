//! The execution pipeline: one entry point for every contract read and write

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info};
use vela_abi::{decode_function_output, encode_function_call, Fragment, FragmentKind, U256};

use crate::convert::outputs_to_value;
use crate::response::TransactionResponse;
use crate::session::{Binding, ContractSession};
use crate::types::CallRequest;
use crate::units::parse_units;
use crate::validate::{check_params, Overrides, ResolvedOverrides};
use crate::SdkError;

/// A single `execute` call
#[derive(Debug, Clone, Default)]
pub struct ExecuteRequest {
    /// Function name, or full signature for overloaded functions
    pub method: String,
    /// Amount of native currency to send, as a decimal string in whole units
    pub value: Option<String>,
    /// Arguments in declaration order
    pub params: Vec<Value>,
    /// Gas and fee overrides
    pub overrides: Overrides,
}

impl ExecuteRequest {
    /// Call `method` with no arguments
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    /// Set the arguments
    pub fn params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    /// Append one argument
    pub fn param(mut self, param: impl Into<Value>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Attach native currency
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set gas and fee overrides
    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Outcome of `execute`
#[derive(Debug, Clone)]
pub enum ExecuteResult {
    /// A transaction was sent
    Transaction(TransactionResponse),
    /// A read returned a value (`null` for functions without outputs)
    Value(Value),
}

impl ExecuteResult {
    /// Whether a transaction was sent
    pub fn is_transaction(&self) -> bool {
        matches!(self, ExecuteResult::Transaction(_))
    }

    /// The transaction, if one was sent
    pub fn transaction(&self) -> Option<&TransactionResponse> {
        match self {
            ExecuteResult::Transaction(tx) => Some(tx),
            ExecuteResult::Value(_) => None,
        }
    }

    /// The returned value, if this was a read
    pub fn value(&self) -> Option<&Value> {
        match self {
            ExecuteResult::Value(value) => Some(value),
            ExecuteResult::Transaction(_) => None,
        }
    }
}

impl ContractSession {
    /// Run a contract function.
    ///
    /// Request shape, parameter types and overrides are checked locally before
    /// any network call. View and pure functions are answered with `eth_call`.
    /// Other functions are simulated first when safe mode is on, then sent.
    ///
    /// Concurrent writes from the same signer are not serialized; callers that
    /// need a strict nonce order must await each write or pass explicit nonces.
    pub async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResult, SdkError> {
        let binding = self.binding()?;
        let fragment = resolve_method(&binding, &request.method)?;
        let value = self.check_value(&fragment, request.value.as_deref())?;
        let overrides = request
            .overrides
            .resolve(binding.connector.fee_market())?;
        let tokens = check_params(&fragment, &request.params)?;
        let data = Bytes::from(encode_function_call(&fragment, &tokens)?);

        let call = build_call(&binding, data, value, &overrides);

        if fragment.is_read_only() {
            debug!(method = %fragment.signature(), "reading contract");
            let output = binding
                .connector
                .call(call)
                .await
                .map_err(SdkError::transaction)?;
            let tokens = decode_function_output(&fragment, &output)
                .map_err(|e| SdkError::transaction(e.into()))?;
            return Ok(ExecuteResult::Value(outputs_to_value(&fragment.outputs, &tokens)));
        }

        if binding.connector.is_read_only() {
            return Err(SdkError::ReadOnly("execute".to_string()));
        }

        if self.config().safe_mode {
            debug!(method = %fragment.signature(), "simulating transaction");
            binding
                .connector
                .call(call.clone())
                .await
                .map_err(SdkError::transaction)?;
        }

        let record = binding
            .connector
            .send_transaction(call)
            .await
            .map_err(SdkError::transaction)?;
        info!(method = %fragment.signature(), hash = ?record.hash, nonce = record.nonce, "transaction sent");

        Ok(ExecuteResult::Transaction(TransactionResponse::new(
            record,
            binding.connector.clone(),
            Some(fragment),
        )))
    }

    fn check_value(&self, fragment: &Fragment, value: Option<&str>) -> Result<Option<U256>, SdkError> {
        match (fragment.is_payable(), value) {
            (true, None) => Err(SdkError::PayableMethodRequiresValue(fragment.signature())),
            (false, Some(_)) => Err(SdkError::NotPayableMethodWithValue(fragment.signature())),
            (false, None) => Ok(None),
            (true, Some(value)) => {
                parse_units(value, self.config().denomination_decimals).map(Some)
            }
        }
    }
}

/// Look `method` up in the dispatch table
fn resolve_method(binding: &Binding, method: &str) -> Result<Fragment, SdkError> {
    let key: String = method.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(fragment) = binding.dispatch.get(&key) {
        return Ok(fragment.clone());
    }

    let name = key.split('(').next().unwrap_or(&key);
    let candidates: Vec<String> = binding
        .abi
        .overloads(FragmentKind::Function, name)
        .iter()
        .map(|f| f.signature())
        .collect();
    if candidates.is_empty() {
        Err(SdkError::UnknownMethod(method.to_string()))
    } else {
        Err(SdkError::UnknownMethodWithRecommendation {
            method: method.to_string(),
            candidates,
        })
    }
}

fn build_call(
    binding: &Binding,
    data: Bytes,
    value: Option<U256>,
    overrides: &ResolvedOverrides,
) -> CallRequest {
    CallRequest {
        from: *binding.from.read(),
        to: Some(binding.address),
        gas: overrides.gas_limit,
        gas_price: overrides.gas_price,
        max_fee_per_gas: overrides.max_fee_per_gas,
        max_priority_fee_per_gas: overrides.max_priority_fee_per_gas,
        nonce: overrides.nonce,
        value,
        data: Some(data),
    }
}
