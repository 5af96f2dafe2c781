//! ABI type definitions

use std::fmt;
use std::str::FromStr;

use primitive_types::{H160, U256};

use crate::AbiError;

/// 20-byte account address
pub type Address = H160;

/// Solidity ABI token (a decoded or to-be-encoded value)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Address (20 bytes)
    Address(Address),
    /// Unsigned integer (8-256 bits)
    Uint(U256),
    /// Signed integer (8-256 bits)
    Int(I256),
    /// Boolean
    Bool(bool),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// Fixed-size bytes (1-32)
    FixedBytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Dynamic array
    Array(Vec<Token>),
    /// Fixed-size array
    FixedArray(Vec<Token>),
    /// Tuple (struct)
    Tuple(Vec<Token>),
}

/// Signed 256-bit integer in sign-magnitude form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct I256 {
    /// Absolute value
    pub abs: U256,
    /// Sign (true if negative)
    pub negative: bool,
}

impl I256 {
    /// Create a new I256. Negative zero is normalised to zero.
    pub fn new(abs: U256, negative: bool) -> Self {
        Self {
            abs,
            negative: negative && !abs.is_zero(),
        }
    }

    /// Create from i128
    pub fn from_i128(value: i128) -> Self {
        Self::new(U256::from(value.unsigned_abs()), value < 0)
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.abs.is_zero()
    }

    /// Two's complement 256-bit representation
    pub fn to_twos_complement(&self) -> U256 {
        if self.negative {
            (!self.abs).overflowing_add(U256::one()).0
        } else {
            self.abs
        }
    }

    /// Parse a two's complement 256-bit word
    pub fn from_twos_complement(word: U256) -> Self {
        if word.bit(255) {
            Self::new((!word).overflowing_add(U256::one()).0, true)
        } else {
            Self::new(word, false)
        }
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.abs)
        } else {
            write!(f, "{}", self.abs)
        }
    }
}

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Address
    Address,
    /// Unsigned integer with bit size (8, 16, ..., 256)
    Uint(usize),
    /// Signed integer with bit size
    Int(usize),
    /// Boolean
    Bool,
    /// Dynamic bytes
    Bytes,
    /// Fixed-size bytes (size 1-32)
    FixedBytes(usize),
    /// UTF-8 string
    String,
    /// Fixed-point decimal, carried on the wire as a scaled integer
    Fixed {
        /// `fixed` (true) or `ufixed` (false)
        signed: bool,
        /// Bit size of the scaled integer
        bits: usize,
        /// Number of decimal places
        decimals: usize,
    },
    /// Dynamic array
    Array(Box<ParamType>),
    /// Fixed-size array
    FixedArray(Box<ParamType>, usize),
    /// Tuple
    Tuple(Vec<ParamType>),
}

/// Coarse classification of a parameter type.
///
/// Drives the native value-kind check performed before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// `address`
    Address,
    /// `uintN`
    UInt,
    /// `intN`
    Int,
    /// `bool`
    Bool,
    /// `fixedMxN` / `ufixedMxN`
    Fixed,
    /// Anything else (strings, bytes, arrays, tuples)
    Other,
}

impl ParamType {
    /// Check if this type is dynamic (variable length)
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(types) => types.iter().any(|t| t.is_dynamic()),
            _ => false,
        }
    }

    /// Type tag used for value-kind checks
    pub fn tag(&self) -> TypeTag {
        match self {
            ParamType::Address => TypeTag::Address,
            ParamType::Uint(_) => TypeTag::UInt,
            ParamType::Int(_) => TypeTag::Int,
            ParamType::Bool => TypeTag::Bool,
            ParamType::Fixed { .. } => TypeTag::Fixed,
            _ => TypeTag::Other,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => f.write_str("address"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Int(bits) => write!(f, "int{}", bits),
            ParamType::Bool => f.write_str("bool"),
            ParamType::Bytes => f.write_str("bytes"),
            ParamType::FixedBytes(size) => write!(f, "bytes{}", size),
            ParamType::String => f.write_str("string"),
            ParamType::Fixed {
                signed,
                bits,
                decimals,
            } => {
                let prefix = if *signed { "fixed" } else { "ufixed" };
                write!(f, "{}{}x{}", prefix, bits, decimals)
            }
            ParamType::Array(inner) => write!(f, "{}[]", inner),
            ParamType::FixedArray(inner, size) => write!(f, "{}[{}]", inner, size),
            ParamType::Tuple(types) => {
                f.write_str("(")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", t)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for ParamType {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s)
    }
}

/// Parse a canonical type string (e.g. "uint256", "address[]", "(uint8,bool)")
pub fn parse_type(s: &str) -> Result<ParamType, AbiError> {
    let s = s.trim();

    if let Some(body) = s.strip_suffix(']') {
        let open = body
            .rfind('[')
            .ok_or_else(|| AbiError::Parse(format!("Unbalanced array type: {}", s)))?;
        let inner = parse_type(&body[..open])?;
        let size = &body[open + 1..];
        if size.is_empty() {
            return Ok(ParamType::Array(Box::new(inner)));
        }
        let size: usize = size
            .parse()
            .map_err(|_| AbiError::Parse(format!("Invalid array size: {}", size)))?;
        return Ok(ParamType::FixedArray(Box::new(inner), size));
    }

    if let Some(body) = s.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        let types = split_top_level(body)
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .map(parse_type)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(ParamType::Tuple(types));
    }

    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        "fixed" => {
            return Ok(ParamType::Fixed {
                signed: true,
                bits: 128,
                decimals: 18,
            })
        }
        "ufixed" => {
            return Ok(ParamType::Fixed {
                signed: false,
                bits: 128,
                decimals: 18,
            })
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("uint") {
        return Ok(ParamType::Uint(parse_int_bits(rest)?));
    }
    if let Some(rest) = s.strip_prefix("int") {
        return Ok(ParamType::Int(parse_int_bits(rest)?));
    }
    if let Some(rest) = s.strip_prefix("ufixed") {
        let (bits, decimals) = parse_fixed_dims(rest)?;
        return Ok(ParamType::Fixed {
            signed: false,
            bits,
            decimals,
        });
    }
    if let Some(rest) = s.strip_prefix("fixed") {
        let (bits, decimals) = parse_fixed_dims(rest)?;
        return Ok(ParamType::Fixed {
            signed: true,
            bits,
            decimals,
        });
    }
    if let Some(rest) = s.strip_prefix("bytes") {
        let size: usize = rest
            .parse()
            .map_err(|_| AbiError::Parse(format!("Invalid bytes size: {}", rest)))?;
        if size == 0 || size > 32 {
            return Err(AbiError::Parse(format!("Invalid bytes size: {}", size)));
        }
        return Ok(ParamType::FixedBytes(size));
    }

    Err(AbiError::Parse(format!("Unknown type: {}", s)))
}

fn parse_int_bits(rest: &str) -> Result<usize, AbiError> {
    if rest.is_empty() {
        return Ok(256);
    }
    let bits: usize = rest
        .parse()
        .map_err(|_| AbiError::Parse(format!("Invalid integer size: {}", rest)))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(AbiError::Parse(format!("Invalid integer size: {}", bits)));
    }
    Ok(bits)
}

fn parse_fixed_dims(rest: &str) -> Result<(usize, usize), AbiError> {
    let (bits, decimals) = rest
        .split_once('x')
        .ok_or_else(|| AbiError::Parse(format!("Invalid fixed type suffix: {}", rest)))?;
    let bits = parse_int_bits(bits)?;
    let decimals: usize = decimals
        .parse()
        .map_err(|_| AbiError::Parse(format!("Invalid fixed decimals: {}", decimals)))?;
    if decimals > 80 {
        return Err(AbiError::Parse(format!("Invalid fixed decimals: {}", decimals)));
    }
    Ok((bits, decimals))
}

/// Split on commas that are not nested inside parentheses
pub(crate) fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
