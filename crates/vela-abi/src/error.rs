//! ABI error types

use std::fmt;

use thiserror::Error;

/// ABI error type
#[derive(Debug, Error)]
pub enum AbiError {
    /// A type string or ABI document could not be parsed
    #[error("ABI parse error: {0}")]
    Parse(String),

    /// ABI encoding error
    #[error("ABI encoding error: {0}")]
    Encode(String),

    /// ABI decoding error
    #[error("ABI decoding error: {0}")]
    Decode(String),

    /// Candidate ABI does not conform to a reference standard
    #[error("ABI does not conform: {}", join_violations(.0))]
    NonConformant(Vec<AbiViolation>),
}

impl From<serde_json::Error> for AbiError {
    fn from(e: serde_json::Error) -> Self {
        AbiError::Parse(e.to_string())
    }
}

/// Kind of ABI item checked by the conformance validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Callable function
    Function,
    /// Log event
    Event,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Function => f.write_str("function"),
            ItemKind::Event => f.write_str("event"),
        }
    }
}

/// Which parameter list of an item is at fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoSide {
    /// Inputs
    Input,
    /// Outputs (functions only)
    Output,
}

impl fmt::Display for IoSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoSide::Input => f.write_str("input"),
            IoSide::Output => f.write_str("output"),
        }
    }
}

/// One conformance violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiViolation {
    /// Required item is missing from the candidate
    ItemNotFound {
        /// Signature of the required item
        name: String,
        /// Item kind
        kind: ItemKind,
    },
    /// Parameter counts differ
    IoLengthMismatch {
        /// Signature of the required item
        name: String,
        /// Item kind
        kind: ItemKind,
        /// Offending side
        io: IoSide,
    },
    /// Parameter counts match but the ordered types differ
    IoTypesMismatch {
        /// Signature of the required item
        name: String,
        /// Item kind
        kind: ItemKind,
        /// Offending side
        io: IoSide,
    },
}

impl fmt::Display for AbiViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiViolation::ItemNotFound { name, kind } => {
                write!(f, "{} {} not found", kind, name)
            }
            AbiViolation::IoLengthMismatch { name, kind, io } => {
                write!(f, "{} {} has a different number of {}s", kind, name, io)
            }
            AbiViolation::IoTypesMismatch { name, kind, io } => {
                write!(f, "{} {} has mismatching {} types", kind, name, io)
            }
        }
    }
}

fn join_violations(violations: &[AbiViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
