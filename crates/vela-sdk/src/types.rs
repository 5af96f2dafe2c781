//! SDK types

use bytes::Bytes;
use primitive_types::{H256, U256};
use serde::ser::SerializeMap;
use serde::Serialize;
use serde_json::Value;
use vela_abi::Address;

use crate::client::{hex_address, parse_hex_address, parse_hex_bytes, parse_hex_h256, parse_hex_u128, parse_hex_u256, parse_hex_u64};
use crate::SdkError;

/// Block identifier for RPC queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockId {
    /// Block number
    Number(u64),
    /// Latest block
    #[default]
    Latest,
    /// Pending block (includes pending transactions)
    Pending,
    /// Earliest block (genesis)
    Earliest,
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            BlockId::Number(n) => serializer.serialize_str(&format!("0x{:x}", n)),
            BlockId::Latest => serializer.serialize_str("latest"),
            BlockId::Pending => serializer.serialize_str("pending"),
            BlockId::Earliest => serializer.serialize_str("earliest"),
        }
    }
}

/// Call request for eth_call, eth_estimateGas and eth_sendTransaction
#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    /// Sender address
    pub from: Option<Address>,
    /// Recipient address
    pub to: Option<Address>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price (legacy)
    pub gas_price: Option<u128>,
    /// Max fee per gas (EIP-1559)
    pub max_fee_per_gas: Option<u128>,
    /// Max priority fee per gas (EIP-1559)
    pub max_priority_fee_per_gas: Option<u128>,
    /// Sender nonce
    pub nonce: Option<u64>,
    /// Value to transfer
    pub value: Option<U256>,
    /// Input data
    pub data: Option<Bytes>,
}

impl Serialize for CallRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;

        if let Some(from) = &self.from {
            map.serialize_entry("from", &hex_address(from))?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", &hex_address(to))?;
        }
        if let Some(gas) = &self.gas {
            map.serialize_entry("gas", &format!("0x{:x}", gas))?;
        }
        if let Some(gas_price) = &self.gas_price {
            map.serialize_entry("gasPrice", &format!("0x{:x}", gas_price))?;
        }
        if let Some(max_fee) = &self.max_fee_per_gas {
            map.serialize_entry("maxFeePerGas", &format!("0x{:x}", max_fee))?;
        }
        if let Some(max_priority) = &self.max_priority_fee_per_gas {
            map.serialize_entry("maxPriorityFeePerGas", &format!("0x{:x}", max_priority))?;
        }
        if let Some(nonce) = &self.nonce {
            map.serialize_entry("nonce", &format!("0x{:x}", nonce))?;
        }
        if let Some(value) = &self.value {
            map.serialize_entry("value", &format!("{:#x}", value))?;
        }
        if let Some(data) = &self.data {
            map.serialize_entry("data", &format!("0x{}", hex::encode(data)))?;
        }

        map.end()
    }
}

/// Current network fee figures.
///
/// `max_fee_per_gas` is present only on chains whose latest block reports a base fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeData {
    /// Legacy gas price
    pub gas_price: Option<u128>,
    /// Base fee of the latest block
    pub base_fee_per_gas: Option<u128>,
    /// Suggested max fee per gas
    pub max_fee_per_gas: Option<u128>,
    /// Suggested max priority fee per gas
    pub max_priority_fee_per_gas: Option<u128>,
}

/// Fee fields of a transaction: either a single gas price or the EIP-1559 pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeFields {
    /// Legacy pricing
    Legacy {
        /// Gas price in wei
        gas_price: u128,
    },
    /// EIP-1559 pricing
    Eip1559 {
        /// Max fee per gas in wei
        max_fee_per_gas: u128,
        /// Max priority fee per gas in wei
        max_priority_fee_per_gas: u128,
    },
}

impl FeeFields {
    /// Whether these are EIP-1559 fields
    pub fn is_eip1559(&self) -> bool {
        matches!(self, FeeFields::Eip1559 { .. })
    }
}

/// A submitted transaction.
///
/// Treated as immutable: replacements are new records reusing the nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Transaction hash
    pub hash: H256,
    /// Sender
    pub from: Address,
    /// Recipient
    pub to: Option<Address>,
    /// Sender nonce
    pub nonce: u64,
    /// Value in wei
    pub value: U256,
    /// Call data
    pub data: Bytes,
    /// Pricing
    pub fees: FeeFields,
    /// Gas limit
    pub gas_limit: u64,
    /// Chain the transaction was signed for
    pub chain_id: u64,
}

impl TransactionRecord {
    /// Parse an `eth_getTransactionByHash` result
    pub fn from_rpc(value: &Value) -> Result<Self, SdkError> {
        let field = |name: &str| -> Result<&str, SdkError> {
            value
                .get(name)
                .and_then(Value::as_str)
                .ok_or_else(|| SdkError::MissingField(name.to_string()))
        };
        let optional = |name: &str| value.get(name).and_then(Value::as_str);

        let fees = match (optional("maxFeePerGas"), optional("maxPriorityFeePerGas")) {
            (Some(max_fee), Some(priority)) => FeeFields::Eip1559 {
                max_fee_per_gas: parse_hex_u128(max_fee)?,
                max_priority_fee_per_gas: parse_hex_u128(priority)?,
            },
            _ => FeeFields::Legacy {
                gas_price: parse_hex_u128(field("gasPrice")?)?,
            },
        };

        Ok(Self {
            hash: parse_hex_h256(field("hash")?)?,
            from: parse_hex_address(field("from")?)?,
            to: optional("to").map(parse_hex_address).transpose()?,
            nonce: parse_hex_u64(field("nonce")?)?,
            value: parse_hex_u256(field("value")?)?,
            data: parse_hex_bytes(optional("input").or(optional("data")).unwrap_or("0x"))?,
            fees,
            gas_limit: parse_hex_u64(field("gas")?)?,
            chain_id: optional("chainId").map(parse_hex_u64).transpose()?.unwrap_or(0),
        })
    }
}

impl Serialize for TransactionRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("hash", &format!("{:?}", self.hash))?;
        map.serialize_entry("from", &hex_address(&self.from))?;
        if let Some(to) = &self.to {
            map.serialize_entry("to", &hex_address(to))?;
        }
        map.serialize_entry("nonce", &format!("0x{:x}", self.nonce))?;
        map.serialize_entry("value", &format!("{:#x}", self.value))?;
        map.serialize_entry("input", &format!("0x{}", hex::encode(&self.data)))?;
        match self.fees {
            FeeFields::Legacy { gas_price } => {
                map.serialize_entry("gasPrice", &format!("0x{:x}", gas_price))?;
            }
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                map.serialize_entry("maxFeePerGas", &format!("0x{:x}", max_fee_per_gas))?;
                map.serialize_entry(
                    "maxPriorityFeePerGas",
                    &format!("0x{:x}", max_priority_fee_per_gas),
                )?;
            }
        }
        map.serialize_entry("gas", &format!("0x{:x}", self.gas_limit))?;
        map.serialize_entry("chainId", &format!("0x{:x}", self.chain_id))?;
        map.end()
    }
}

/// A raw contract log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Topics (topic0 is the event signature hash unless anonymous)
    pub topics: Vec<H256>,
    /// Non-indexed data
    pub data: Bytes,
    /// Block number, if mined
    pub block_number: Option<u64>,
    /// Transaction hash, if mined
    pub transaction_hash: Option<H256>,
}

impl Log {
    /// Parse a log object from `eth_getLogs` / `eth_getFilterChanges`
    pub fn from_rpc(value: &Value) -> Result<Self, SdkError> {
        let address = value
            .get("address")
            .and_then(Value::as_str)
            .ok_or_else(|| SdkError::MissingField("address".to_string()))?;
        let topics = value
            .get("topics")
            .and_then(Value::as_array)
            .ok_or_else(|| SdkError::MissingField("topics".to_string()))?
            .iter()
            .map(|t| {
                t.as_str()
                    .ok_or_else(|| SdkError::InvalidHex(t.to_string()))
                    .and_then(parse_hex_h256)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let optional = |name: &str| value.get(name).and_then(Value::as_str);

        Ok(Self {
            address: parse_hex_address(address)?,
            topics,
            data: parse_hex_bytes(optional("data").unwrap_or("0x"))?,
            block_number: optional("blockNumber").map(parse_hex_u64).transpose()?,
            transaction_hash: optional("transactionHash").map(parse_hex_h256).transpose()?,
        })
    }
}

/// Log filter for eth_getLogs / eth_newFilter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Contract address
    pub address: Option<Address>,
    /// First block (inclusive)
    pub from_block: Option<BlockId>,
    /// Last block (inclusive)
    pub to_block: Option<BlockId>,
    /// Positional topics; `None` matches anything at that position
    pub topics: Vec<Option<H256>>,
}

impl Serialize for LogFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if let Some(address) = &self.address {
            map.serialize_entry("address", &hex_address(address))?;
        }
        if let Some(from) = &self.from_block {
            map.serialize_entry("fromBlock", from)?;
        }
        if let Some(to) = &self.to_block {
            map.serialize_entry("toBlock", to)?;
        }
        // Trailing wildcards are dropped; nodes treat missing positions as wildcards.
        let used = self
            .topics
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |i| i + 1);
        let topics: Vec<Value> = self.topics[..used]
            .iter()
            .map(|t| match t {
                Some(topic) => Value::String(format!("{:?}", topic)),
                None => Value::Null,
            })
            .collect();
        map.serialize_entry("topics", &topics)?;
        map.end()
    }
}
