//! Transaction builder and signer

use bytes::Bytes;
use primitive_types::{H256, U256};
use rlp::RlpStream;
use vela_abi::{keccak256, Address};

use crate::types::FeeFields;
use crate::{SdkError, Wallet};

/// EIP-2718 type byte of EIP-1559 transactions
const EIP1559_TX_TYPE: u8 = 0x02;

/// Signed, encoded transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Raw bytes
    pub raw: Bytes,
    /// Transaction hash (keccak256 of the raw bytes)
    pub hash: H256,
}

/// Transaction builder with fluent API
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    chain_id: u64,
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    gas_price: Option<u128>,
    max_fee_per_gas: Option<u128>,
    max_priority_fee_per_gas: Option<u128>,
    to: Option<Address>,
    value: U256,
    data: Bytes,
}

impl TxBuilder {
    /// Create a new transaction builder
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Set the gas limit
    pub fn gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    /// Set the gas price (for legacy transactions)
    pub fn gas_price(mut self, price: u128) -> Self {
        self.gas_price = Some(price);
        self
    }

    /// Set max fee per gas (for EIP-1559 transactions)
    pub fn max_fee_per_gas(mut self, fee: u128) -> Self {
        self.max_fee_per_gas = Some(fee);
        self
    }

    /// Set max priority fee per gas (for EIP-1559 transactions)
    pub fn max_priority_fee_per_gas(mut self, fee: u128) -> Self {
        self.max_priority_fee_per_gas = Some(fee);
        self
    }

    /// Set whichever fee fields `fees` carries
    pub fn fees(self, fees: FeeFields) -> Self {
        match fees {
            FeeFields::Legacy { gas_price } => self.gas_price(gas_price),
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => self
                .max_fee_per_gas(max_fee_per_gas)
                .max_priority_fee_per_gas(max_priority_fee_per_gas),
        }
    }

    /// Set the recipient address
    pub fn to(mut self, address: Address) -> Self {
        self.to = Some(address);
        self
    }

    /// Set the value to transfer (in wei)
    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Set the input data
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Sign as EIP-1559 when a max fee is set, legacy otherwise
    pub fn sign(&self, wallet: &Wallet) -> Result<SignedTransaction, SdkError> {
        if self.max_fee_per_gas.is_some() {
            self.sign_eip1559(wallet)
        } else {
            self.sign_legacy(wallet)
        }
    }

    /// Sign and encode a legacy (EIP-155) transaction
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing (nonce, gas_limit,
    /// gas_price) or the chain ID is 0.
    pub fn sign_legacy(&self, wallet: &Wallet) -> Result<SignedTransaction, SdkError> {
        self.require_chain_id()?;
        let nonce = self.required(self.nonce, "nonce")?;
        let gas_limit = self.required(self.gas_limit, "gas_limit")?;
        let gas_price = self.required(self.gas_price, "gas_price")?;

        let mut unsigned = RlpStream::new_list(9);
        unsigned
            .append(&nonce)
            .append(&U256::from(gas_price))
            .append(&gas_limit);
        self.append_call(&mut unsigned);
        unsigned.append(&self.chain_id).append(&0u8).append(&0u8);

        let signature = wallet.sign_hash(&keccak256(&unsigned.out()))?;
        let v = u64::from(signature.recovery_id) + self.chain_id * 2 + 35;

        let mut signed = RlpStream::new_list(9);
        signed
            .append(&nonce)
            .append(&U256::from(gas_price))
            .append(&gas_limit);
        self.append_call(&mut signed);
        signed
            .append(&v)
            .append(&U256::from_big_endian(&signature.r))
            .append(&U256::from_big_endian(&signature.s));

        Ok(finish(signed.out().to_vec()))
    }

    /// Sign and encode an EIP-1559 (type 2) transaction
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing (nonce, gas_limit,
    /// max fees) or the chain ID is 0.
    pub fn sign_eip1559(&self, wallet: &Wallet) -> Result<SignedTransaction, SdkError> {
        self.require_chain_id()?;
        let nonce = self.required(self.nonce, "nonce")?;
        let gas_limit = self.required(self.gas_limit, "gas_limit")?;
        let max_fee = self.required(self.max_fee_per_gas, "max_fee_per_gas")?;
        let max_priority =
            self.required(self.max_priority_fee_per_gas, "max_priority_fee_per_gas")?;

        let fields = |stream: &mut RlpStream| {
            stream
                .append(&self.chain_id)
                .append(&nonce)
                .append(&U256::from(max_priority))
                .append(&U256::from(max_fee))
                .append(&gas_limit);
            self.append_call(stream);
            stream.begin_list(0);
        };

        let mut unsigned = RlpStream::new_list(9);
        fields(&mut unsigned);
        let mut payload = vec![EIP1559_TX_TYPE];
        payload.extend_from_slice(&unsigned.out());
        let signature = wallet.sign_hash(&keccak256(&payload))?;

        let mut signed = RlpStream::new_list(12);
        fields(&mut signed);
        signed
            .append(&signature.recovery_id)
            .append(&U256::from_big_endian(&signature.r))
            .append(&U256::from_big_endian(&signature.s));

        let mut raw = vec![EIP1559_TX_TYPE];
        raw.extend_from_slice(&signed.out());
        Ok(finish(raw))
    }

    fn append_call(&self, stream: &mut RlpStream) {
        match &self.to {
            Some(to) => stream.append(to),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value).append(&self.data.to_vec());
    }

    fn require_chain_id(&self) -> Result<(), SdkError> {
        if self.chain_id == 0 {
            return Err(SdkError::InvalidChainId(
                "Chain ID cannot be 0 - replay protection requires a valid chain ID".to_string(),
            ));
        }
        Ok(())
    }

    fn required<T>(&self, field: Option<T>, name: &str) -> Result<T, SdkError> {
        field.ok_or_else(|| SdkError::MissingField(name.to_string()))
    }
}

fn finish(raw: Vec<u8>) -> SignedTransaction {
    SignedTransaction {
        hash: keccak256(&raw),
        raw: Bytes::from(raw),
    }
}
