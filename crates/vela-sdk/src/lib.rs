//! # vela-sdk
//!
//! Execute functions of any EVM contract through a runtime-described ABI.
//!
//! ## Features
//!
//! - **Connector**: endpoint session with an optional signer and fee-market detection
//! - **ContractSession**: binds a contract, checks its ABI against a standard,
//!   and runs every read and write through one `execute` pipeline
//! - **TransactionResponse**: cancel, speed up or change a sent transaction
//! - **Events**: connector signal relay and contract log subscriptions
//! - **Wallet / TxBuilder**: local secp256k1 signing of legacy and EIP-1559 transactions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use vela_abi::Abi;
//! use vela_sdk::{ActivateOptions, Connection, ContractSession, ExecuteRequest, MockTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let abi = Abi::from_human_readable(&[
//!         "function transfer(address to, uint256 amount) returns (bool)",
//!     ])?;
//!
//!     let session = ContractSession::new();
//!     session
//!         .activate(ActivateOptions {
//!             address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
//!             abi,
//!             connection: Connection::Transport {
//!                 transport: Arc::new(MockTransport::new()),
//!                 private_key: Some(
//!                     "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
//!                 ),
//!             },
//!         })
//!         .await?;
//!
//!     let result = session
//!         .execute(
//!             ExecuteRequest::new("transfer")
//!                 .param("0x70997970c51812dc3a010c7d01b50e0d17dc79c8")
//!                 .param("1"),
//!         )
//!         .await?;
//!
//!     if let Some(tx) = result.transaction() {
//!         println!("sent {:?}", tx.record().hash);
//!         let faster = tx.speed_up(None).await?;
//!         println!("replaced by {:?}", faster.record().hash);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
pub mod config;
mod connector;
pub mod convert;
mod error;
mod events;
mod execute;
pub mod fees;
mod mutator;
mod response;
mod session;
mod transport;
mod tx;
pub mod types;
pub mod units;
pub mod validate;
mod wallet;

// Re-export main types
pub use client::{hex_address, parse_address, RpcClient, FALLBACK_PRIORITY_FEE};
pub use config::{ConnectorConfig, SessionConfig};
pub use connector::{Connector, ConnectorEvent, ConnectorState, Signer};
pub use error::SdkError;
pub use events::{DecodedLog, EventCallback, SessionEvent, SessionListener};
pub use execute::{ExecuteRequest, ExecuteResult};
pub use fees::{FeeBumpStrategy, FeeMarket, FeeOverride};
pub use response::TransactionResponse;
pub use session::{ActivateOptions, Connection, ContractSession, SessionState};
pub use transport::MockTransport;

/// Re-export Transport trait for custom implementations
pub use transport::Transport;
pub use tx::{SignedTransaction, TxBuilder};
pub use types::{BlockId, CallRequest, FeeData, FeeFields, Log, LogFilter, TransactionRecord};
pub use units::{format_ether, format_units, parse_ether, parse_units};
pub use validate::{Overrides, ResolvedOverrides};
pub use wallet::{Signature, Wallet};

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export ABI primitives for convenience
pub use vela_abi::{Abi, Address, Fragment, Standard, H256, U256};
