//! SDK error types

use thiserror::Error;
use vela_abi::AbiError;

/// SDK error type
#[derive(Debug, Error)]
pub enum SdkError {
    // ==================== Lifecycle ====================
    /// Session used before activation completed
    #[error("SDK not initialized: activate the session first")]
    SdkNotInitialized,

    /// Another activation is still pending
    #[error("Activation already in progress")]
    ActivationInProgress,

    /// Activation failed; the session stays inactive
    #[error("Activation failed: {0}")]
    ActivationFailed(#[source] Box<SdkError>),

    /// A supplied connector has not been activated
    #[error("Provider not initialized: activate the connector first")]
    ProviderNotInitialized,

    // ==================== Resolution ====================
    /// No function matches the requested method
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// No exact match, but overloads with the same name exist
    #[error("Unknown method: {method}. Did you mean one of: {}", .candidates.join(", "))]
    UnknownMethodWithRecommendation {
        /// Requested method
        method: String,
        /// Signatures sharing the requested name
        candidates: Vec<String>,
    },

    // ==================== Request shape ====================
    /// Payable method called without a value
    #[error("Method {0} is payable and requires a value")]
    PayableMethodRequiresValue(String),

    /// Value sent to a non-payable method
    #[error("Method {0} is not payable but a value was given")]
    NotPayableMethodWithValue(String),

    /// Value is not a valid decimal amount
    #[error("Invalid value: {0}")]
    InvalidValueType(String),

    /// Wrong number of parameters
    #[error("Invalid parameter count: expected {expected}, got {actual}")]
    InvalidParameterCount {
        /// Declared input count
        expected: usize,
        /// Supplied parameter count
        actual: usize,
    },

    /// Parameter has the wrong native kind
    #[error("Invalid type for parameter {name}: expected {expected}, got {actual}")]
    InvalidParamType {
        /// Parameter name (or position when unnamed)
        name: String,
        /// Expected kind or ABI type
        expected: String,
        /// Supplied kind
        actual: String,
    },

    /// Numeric parameter cannot be coerced to an integer
    #[error("Parameter {0} is not a big number")]
    NotBigNumberish(String),

    /// Invalid named parameter or override field
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// EIP-1559 field used against a legacy chain
    #[error("Parameter {0} is not supported on a legacy chain")]
    ParameterNotSupportedOnLegacyChain(String),

    /// Every parameter violation found in one request
    #[error("Invalid parameters: {}", join_errors(.0))]
    InvalidParams(Vec<SdkError>),

    // ==================== Execution ====================
    /// Simulation or submission failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(#[source] Box<SdkError>),

    // ==================== Connector ====================
    /// Network endpoint unreachable
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// No signer account could be acquired
    #[error("No account available: {0}")]
    NoAccount(String),

    /// Write operation attempted without a signer
    #[error("Connector is read-only, cannot {0}")]
    ReadOnly(String),

    /// Fee value is not a usable number
    #[error("Not a number: {0}")]
    NotANumber(String),

    // ==================== ABI ====================
    /// ABI parsing, codec or conformance error
    #[error(transparent)]
    Abi(#[from] AbiError),

    // ==================== Events ====================
    /// Event not declared by the bound ABI
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Event filter names an unknown input or carries a mismatching value
    #[error("Invalid event parameter: {0}")]
    InvalidEventParameter(String),

    /// Required disambiguation missing
    #[error("Missing parameter: {0}")]
    MissingParam(String),

    // ==================== Plumbing ====================
    /// Transport/network error
    #[error("Transport error: {0}")]
    Transport(String),

    /// RPC error from node
    #[error("RPC error: {code} - {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid chain ID
    #[error("Invalid chain ID: {0}")]
    InvalidChainId(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),
}

impl SdkError {
    /// Wrap as an activation failure
    pub(crate) fn activation(self) -> Self {
        match self {
            already @ SdkError::ActivationFailed(_) => already,
            other => SdkError::ActivationFailed(Box::new(other)),
        }
    }

    /// Wrap as a transaction failure
    pub(crate) fn transaction(self) -> Self {
        match self {
            already @ SdkError::TransactionFailed(_) => already,
            other => SdkError::TransactionFailed(Box::new(other)),
        }
    }

    /// Violations carried by a batch error, or the error itself
    pub fn violations(&self) -> Vec<&SdkError> {
        match self {
            SdkError::InvalidParams(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}

fn join_errors(errors: &[SdkError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SdkError {
    fn from(e: toml::de::Error) -> Self {
        SdkError::Config(e.to_string())
    }
}
