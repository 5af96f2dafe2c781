//! RpcClient - JSON-RPC calls used by the connector and sessions

use std::sync::Arc;

use bytes::Bytes;
use primitive_types::{H256, U256};
use serde_json::Value;
use vela_abi::Address;

use crate::transport::{deserialize_response, MockTransport, Transport};
use crate::types::{BlockId, CallRequest, FeeData, Log, LogFilter, TransactionRecord};
use crate::SdkError;

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Priority fee assumed when the node cannot suggest one (1.5 gwei)
pub const FALLBACK_PRIORITY_FEE: u128 = 1_500_000_000;

/// Thin typed wrapper over a [`Transport`]
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
}

impl RpcClient {
    /// Create a client over HTTP
    #[cfg(feature = "http")]
    pub fn http(url: &str) -> Self {
        Self::with_transport(HttpTransport::new(url))
    }

    /// Create a client with mock transport (for testing)
    pub fn new_mock() -> Self {
        Self::with_transport(MockTransport::new())
    }

    /// Create a client with a custom transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Helper method to make RPC request and deserialize
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        let value = self.transport.request_json(method, params).await?;
        deserialize_response(value)
    }

    // ==================== Chain Info ====================

    /// Get the chain ID
    pub async fn chain_id(&self) -> Result<u64, SdkError> {
        let result: String = self.request("eth_chainId", vec![]).await?;
        parse_hex_u64(&result)
    }

    /// Get the current gas price
    pub async fn gas_price(&self) -> Result<u128, SdkError> {
        let result: String = self.request("eth_gasPrice", vec![]).await?;
        parse_hex_u128(&result)
    }

    /// Get the suggested priority fee
    pub async fn max_priority_fee_per_gas(&self) -> Result<u128, SdkError> {
        let result: String = self.request("eth_maxPriorityFeePerGas", vec![]).await?;
        parse_hex_u128(&result)
    }

    /// Get the current block number
    pub async fn block_number(&self) -> Result<u64, SdkError> {
        let result: String = self.request("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&result)
    }

    /// Base fee of a block, `None` on chains without one
    pub async fn base_fee(&self, block: BlockId) -> Result<Option<u128>, SdkError> {
        let result: Value = self
            .request(
                "eth_getBlockByNumber",
                vec![serde_json::to_value(block)?, Value::Bool(false)],
            )
            .await?;
        result
            .get("baseFeePerGas")
            .and_then(Value::as_str)
            .map(parse_hex_u128)
            .transpose()
    }

    /// Probe current fee figures.
    ///
    /// With a base fee, `max_fee_per_gas = 2 * base_fee + priority_fee`.
    pub async fn fee_data(&self) -> Result<FeeData, SdkError> {
        let gas_price = self.gas_price().await.ok();
        let base_fee = self.base_fee(BlockId::Latest).await?;

        let Some(base_fee) = base_fee else {
            return Ok(FeeData {
                gas_price,
                ..Default::default()
            });
        };

        let priority = match self.max_priority_fee_per_gas().await {
            Ok(fee) => fee,
            Err(e) => {
                tracing::debug!(error = %e, "priority fee unavailable, using fallback");
                FALLBACK_PRIORITY_FEE
            }
        };
        let max_fee = base_fee
            .checked_mul(2)
            .and_then(|b| b.checked_add(priority))
            .ok_or_else(|| SdkError::NotANumber("maxFeePerGas overflow".to_string()))?;

        Ok(FeeData {
            gas_price,
            base_fee_per_gas: Some(base_fee),
            max_fee_per_gas: Some(max_fee),
            max_priority_fee_per_gas: Some(priority),
        })
    }

    // ==================== Accounts ====================

    /// Accounts already exposed by the node or wallet
    pub async fn accounts(&self) -> Result<Vec<Address>, SdkError> {
        let result: Vec<String> = self.request("eth_accounts", vec![]).await?;
        result.iter().map(|a| parse_hex_address(a)).collect()
    }

    /// Ask the wallet to grant accounts
    pub async fn request_accounts(&self) -> Result<Vec<Address>, SdkError> {
        let result: Vec<String> = self.request("eth_requestAccounts", vec![]).await?;
        result.iter().map(|a| parse_hex_address(a)).collect()
    }

    /// Get the balance of an address
    pub async fn get_balance(&self, address: &Address, block: BlockId) -> Result<U256, SdkError> {
        let result: String = self
            .request(
                "eth_getBalance",
                vec![
                    Value::String(hex_address(address)),
                    serde_json::to_value(block)?,
                ],
            )
            .await?;
        parse_hex_u256(&result)
    }

    /// Get the nonce (transaction count) of an address
    pub async fn get_nonce(&self, address: &Address, block: BlockId) -> Result<u64, SdkError> {
        let result: String = self
            .request(
                "eth_getTransactionCount",
                vec![
                    Value::String(hex_address(address)),
                    serde_json::to_value(block)?,
                ],
            )
            .await?;
        parse_hex_u64(&result)
    }

    // ==================== Transactions ====================

    /// Fetch a transaction by hash
    pub async fn get_transaction(&self, hash: &H256) -> Result<Option<TransactionRecord>, SdkError> {
        let result: Value = self
            .request(
                "eth_getTransactionByHash",
                vec![Value::String(format!("{:?}", hash))],
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        TransactionRecord::from_rpc(&result).map(Some)
    }

    /// Send a raw transaction (RLP-encoded bytes)
    pub async fn send_raw_transaction(&self, tx: &[u8]) -> Result<H256, SdkError> {
        let hex = format!("0x{}", hex::encode(tx));
        let result: String = self
            .request("eth_sendRawTransaction", vec![Value::String(hex)])
            .await?;
        parse_hex_h256(&result)
    }

    /// Submit an unsigned transaction for the node/wallet to sign
    pub async fn send_transaction(&self, request: &CallRequest) -> Result<H256, SdkError> {
        let result: String = self
            .request("eth_sendTransaction", vec![serde_json::to_value(request)?])
            .await?;
        parse_hex_h256(&result)
    }

    // ==================== Call & Estimation ====================

    /// Execute a call (read-only, does not create transaction)
    pub async fn call(&self, request: &CallRequest, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_call",
                vec![serde_json::to_value(request)?, serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    /// Estimate gas for a transaction
    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, SdkError> {
        let result: String = self
            .request("eth_estimateGas", vec![serde_json::to_value(request)?])
            .await?;
        parse_hex_u64(&result)
    }

    // ==================== Logs ====================

    /// Query logs over a block range
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, SdkError> {
        let result: Vec<Value> = self
            .request("eth_getLogs", vec![serde_json::to_value(filter)?])
            .await?;
        result.iter().map(Log::from_rpc).collect()
    }

    /// Install a log filter, returning its id
    pub async fn new_filter(&self, filter: &LogFilter) -> Result<String, SdkError> {
        self.request("eth_newFilter", vec![serde_json::to_value(filter)?])
            .await
    }

    /// Logs matched since the last poll
    pub async fn get_filter_changes(&self, id: &str) -> Result<Vec<Log>, SdkError> {
        let result: Vec<Value> = self
            .request("eth_getFilterChanges", vec![Value::String(id.to_string())])
            .await?;
        result.iter().map(Log::from_rpc).collect()
    }

    /// Remove a log filter
    pub async fn uninstall_filter(&self, id: &str) -> Result<bool, SdkError> {
        self.request("eth_uninstallFilter", vec![Value::String(id.to_string())])
            .await
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").finish_non_exhaustive()
    }
}

// ==================== Helper Functions ====================

/// Full 0x-prefixed lowercase hex of an address
pub fn hex_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Parse a 0x-prefixed (or bare) 20-byte address
pub fn parse_address(s: &str) -> Result<Address, SdkError> {
    parse_hex_address(s).map_err(|_| SdkError::InvalidAddress(s.to_string()))
}

pub(crate) fn parse_hex_address(s: &str) -> Result<Address, SdkError> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
    if bytes.len() != 20 {
        return Err(SdkError::InvalidAddress(s.to_string()));
    }
    Ok(Address::from_slice(&bytes))
}

pub(crate) fn parse_hex_h256(s: &str) -> Result<H256, SdkError> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
    if bytes.len() != 32 {
        return Err(SdkError::InvalidHex(format!("expected 32 bytes: {}", s)));
    }
    Ok(H256::from_slice(&bytes))
}

pub(crate) fn parse_hex_u64(s: &str) -> Result<u64, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| SdkError::InvalidHex(e.to_string()))
}

pub(crate) fn parse_hex_u128(s: &str) -> Result<u128, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u128::from_str_radix(s, 16).map_err(|e| SdkError::InvalidHex(e.to_string()))
}

pub(crate) fn parse_hex_u256(s: &str) -> Result<U256, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(s, 16).map_err(|e| SdkError::InvalidHex(format!("{:?}", e)))
}

pub(crate) fn parse_hex_bytes(s: &str) -> Result<Bytes, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(Bytes::new());
    }
    let bytes = hex::decode(s)?;
    Ok(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_client_mock_chain_id() {
        let client = RpcClient::new_mock();
        assert_eq!(client.chain_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_client_mock_block_number() {
        let client = RpcClient::new_mock();
        assert_eq!(client.block_number().await.unwrap(), 256);
    }

    #[tokio::test]
    async fn test_fee_data_with_base_fee() {
        let client = RpcClient::new_mock();
        let fees = client.fee_data().await.unwrap();
        assert_eq!(fees.base_fee_per_gas, Some(1_000_000_000));
        assert_eq!(fees.max_priority_fee_per_gas, Some(1_000_000_000));
        assert_eq!(fees.max_fee_per_gas, Some(3_000_000_000));
    }

    #[tokio::test]
    async fn test_fee_data_priority_fallback() {
        let transport = MockTransport::new();
        transport.set_error("eth_maxPriorityFeePerGas", -32601, "not supported");
        let client = RpcClient::with_transport(transport);

        let fees = client.fee_data().await.unwrap();
        assert_eq!(fees.max_priority_fee_per_gas, Some(FALLBACK_PRIORITY_FEE));
        assert_eq!(fees.max_fee_per_gas, Some(2_000_000_000 + FALLBACK_PRIORITY_FEE));
    }

    #[tokio::test]
    async fn test_fee_data_without_base_fee() {
        let transport = MockTransport::new();
        transport.set_response("eth_getBlockByNumber", json!({ "number": "0x100" }));
        let client = RpcClient::with_transport(transport);

        let fees = client.fee_data().await.unwrap();
        assert_eq!(fees.max_fee_per_gas, None);
        assert_eq!(fees.gas_price, Some(1_000_000_000));
    }

    #[tokio::test]
    async fn test_get_transaction_missing() {
        let client = RpcClient::new_mock();
        let tx = client.get_transaction(&H256::zero()).await.unwrap();
        assert!(tx.is_none());
    }

    #[tokio::test]
    async fn test_accounts_parsed() {
        let transport = MockTransport::new();
        transport.set_response(
            "eth_accounts",
            json!(["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"]),
        );
        let client = RpcClient::with_transport(transport);
        let accounts = client.accounts().await.unwrap();
        assert_eq!(hex_address(&accounts[0]), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x1").unwrap(), 1);
        assert_eq!(parse_hex_u64("0x100").unwrap(), 256);
        assert_eq!(parse_hex_u64("100").unwrap(), 256);
    }

    #[test]
    fn test_parse_hex_u256() {
        let result = parse_hex_u256("0xde0b6b3a7640000").unwrap();
        assert_eq!(result, U256::from(1_000_000_000_000_000_000u128));
    }

    #[test]
    fn test_parse_hex_bytes_empty() {
        assert!(parse_hex_bytes("0x").unwrap().is_empty());
    }

    #[test]
    fn test_parse_address_rejects_short() {
        assert!(matches!(parse_address("0x1234"), Err(SdkError::InvalidAddress(_))));
    }
}
