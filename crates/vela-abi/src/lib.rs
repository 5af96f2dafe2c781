//! # vela-abi
//!
//! Contract ABI support for the Vela SDK.
//!
//! ## Features
//!
//! - **Abi / Fragment**: JSON and human-readable ABI parsing, signature lookup
//! - **encode / decode**: Solidity ABI encoding of calls, return data and logs
//! - **validate_abi**: batch conformance check of an ABI against a reference standard
//! - **Standard**: ERC-20 / ERC-721 / ERC-1155 required-fragment tables
//!
//! ## Example
//!
//! ```rust
//! use vela_abi::{validate_abi, Abi, AbiError, AbiViolation, Standard};
//!
//! let candidate = Abi::from_human_readable(&[
//!     "function balanceOf(address) view returns (uint256)",
//! ]).unwrap();
//!
//! match validate_abi(&Standard::Erc20.abi().unwrap(), &candidate) {
//!     Err(AbiError::NonConformant(violations)) => {
//!         assert!(violations.iter().any(|v| matches!(v, AbiViolation::ItemNotFound { .. })));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod abi;
mod conformance;
mod decode;
mod encode;
mod error;
mod fragment;
mod hash;
mod standards;
mod types;

pub use abi::Abi;
pub use conformance::{implements_function, validate_abi};
pub use decode::{decode, decode_function_input, decode_function_output, decode_log};
pub use encode::{encode, encode_function_call, encode_topic};
pub use error::{AbiError, AbiViolation, IoSide, ItemKind};
pub use fragment::{Fragment, FragmentKind, Param, StateMutability};
pub use hash::{function_selector, keccak256};
pub use standards::Standard;
pub use types::{parse_type, Address, ParamType, Token, TypeTag, I256};

pub use primitive_types::{H256, U256};
