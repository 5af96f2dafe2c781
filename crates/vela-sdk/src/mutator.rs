//! Replacement transactions: cancel, speed up, change parameters
//!
//! Every replacement reuses the original nonce and gas limit and pays a bumped fee.

use bytes::Bytes;
use primitive_types::U256;
use serde_json::{Map, Value};
use tracing::info;
use vela_abi::{decode_function_input, encode_function_call, Fragment};

use crate::client::hex_address;
use crate::connector::Connector;
use crate::convert::token_to_value;
use crate::fees::{bump_fees, FeeOverride};
use crate::types::{CallRequest, FeeFields, TransactionRecord};
use crate::validate::check_params;
use crate::SdkError;

impl Connector {
    /// Replace `tx` with a zero-value self-transfer carrying no data
    pub async fn cancel_transaction(
        &self,
        tx: &TransactionRecord,
        fee_override: Option<FeeOverride>,
    ) -> Result<TransactionRecord, SdkError> {
        self.require_sender("cancelTransaction", tx)?;
        let replacement = self
            .replace(tx, Some(tx.from), U256::zero(), Bytes::new(), fee_override)
            .await?;
        info!(original = ?tx.hash, replacement = ?replacement.hash, nonce = tx.nonce, "transaction cancelled");
        Ok(replacement)
    }

    /// Resend `tx` unchanged with a higher fee
    pub async fn speed_up_transaction(
        &self,
        tx: &TransactionRecord,
        fee_override: Option<FeeOverride>,
    ) -> Result<TransactionRecord, SdkError> {
        self.require_sender("speedUpTransaction", tx)?;
        let replacement = self
            .replace(tx, tx.to, tx.value, tx.data.clone(), fee_override)
            .await?;
        info!(original = ?tx.hash, replacement = ?replacement.hash, nonce = tx.nonce, "transaction sped up");
        Ok(replacement)
    }

    /// Resend `tx` with some call arguments replaced, by parameter name.
    ///
    /// The original call data is decoded with `fragment`; `new_values` are merged
    /// over the decoded arguments and checked like fresh parameters.
    pub async fn change_transaction(
        &self,
        tx: &TransactionRecord,
        fragment: &Fragment,
        new_values: &Map<String, Value>,
        fee_override: Option<FeeOverride>,
    ) -> Result<TransactionRecord, SdkError> {
        self.require_sender("changeTransaction", tx)?;

        let decoded = decode_function_input(fragment, &tx.data)?;
        let mut params: Vec<Value> = fragment
            .inputs
            .iter()
            .zip(&decoded)
            .map(|(input, token)| token_to_value(token, &input.kind, &input.components))
            .collect();

        for (name, value) in new_values {
            let index = fragment
                .inputs
                .iter()
                .position(|input| !input.name.is_empty() && input.name == *name)
                .ok_or_else(|| SdkError::InvalidParameter(name.clone()))?;
            params[index] = value.clone();
        }

        let tokens = check_params(fragment, &params)?;
        let data = Bytes::from(encode_function_call(fragment, &tokens)?);

        let replacement = self
            .replace(tx, tx.to, tx.value, data, fee_override)
            .await?;
        info!(original = ?tx.hash, replacement = ?replacement.hash, nonce = tx.nonce, "transaction changed");
        Ok(replacement)
    }

    /// A replacement must be signed by the account that sent `tx`
    fn require_sender(&self, operation: &str, tx: &TransactionRecord) -> Result<(), SdkError> {
        let signer = self.require_signer(operation)?.address();
        if signer != tx.from {
            return Err(SdkError::NoAccount(format!(
                "{} needs the sender {} but the signer is {}",
                operation,
                hex_address(&tx.from),
                hex_address(&signer)
            )));
        }
        Ok(())
    }

    async fn replace(
        &self,
        tx: &TransactionRecord,
        to: Option<vela_abi::Address>,
        value: U256,
        data: Bytes,
        fee_override: Option<FeeOverride>,
    ) -> Result<TransactionRecord, SdkError> {
        let fees = bump_fees(
            &tx.fees,
            fee_override,
            self.config().fee_bump_percent,
            self.config().fee_bump_strategy,
        )?;

        let mut request = CallRequest {
            from: Some(tx.from),
            to,
            gas: Some(tx.gas_limit),
            nonce: Some(tx.nonce),
            value: Some(value),
            data: Some(data),
            ..Default::default()
        };
        match fees {
            FeeFields::Legacy { gas_price } => request.gas_price = Some(gas_price),
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                request.max_fee_per_gas = Some(max_fee_per_gas);
                request.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
            }
        }

        self.send_transaction(request)
            .await
            .map_err(SdkError::transaction)
    }
}
