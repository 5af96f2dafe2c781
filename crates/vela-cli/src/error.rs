//! CLI error types

use thiserror::Error;
use vela_abi::AbiError;
use vela_sdk::SdkError;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid command-line input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The ABI violates the requested standard
    #[error("ABI does not conform to {standard}: {count} violation(s)")]
    NonConformant {
        /// Standard checked against
        standard: String,
        /// Number of violations
        count: usize,
    },

    /// SDK error
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// ABI error
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),
}
