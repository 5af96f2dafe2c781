//! ABI encoding

use primitive_types::{H256, U256};

use crate::fragment::Fragment;
use crate::hash::keccak256;
use crate::types::{ParamType, Token};
use crate::AbiError;

/// Encode tokens against their declared types (head/tail layout)
pub fn encode(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
    if types.len() != tokens.len() {
        return Err(AbiError::Encode(format!(
            "Expected {} values, got {}",
            types.len(),
            tokens.len()
        )));
    }

    let head_size: usize = types.iter().map(head_length).sum();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (param_type, token) in types.iter().zip(tokens) {
        if param_type.is_dynamic() {
            head.extend_from_slice(&word(U256::from(head_size + tail.len())));
            tail.extend(encode_token(param_type, token)?);
        } else {
            head.extend(encode_token(param_type, token)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

/// Encode a call to `fragment` (selector + arguments)
pub fn encode_function_call(fragment: &Fragment, tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
    let mut data = fragment.selector().to_vec();
    data.extend(encode(&fragment.input_types(), tokens)?);
    Ok(data)
}

/// Encode an indexed event argument as a log topic.
///
/// Value types occupy one word; dynamic and composite types are hashed.
pub fn encode_topic(param_type: &ParamType, token: &Token) -> Result<H256, AbiError> {
    match (param_type, token) {
        (ParamType::String, Token::String(s)) => Ok(keccak256(s.as_bytes())),
        (ParamType::Bytes, Token::Bytes(b)) => Ok(keccak256(b)),
        (ParamType::Array(_), _) | (ParamType::FixedArray(..), _) | (ParamType::Tuple(_), _) => {
            let packed = encode_token(param_type, token)?;
            Ok(keccak256(&packed))
        }
        _ => Ok(H256::from_slice(&encode_token(param_type, token)?)),
    }
}

fn head_length(param_type: &ParamType) -> usize {
    match param_type {
        ParamType::FixedArray(inner, size) if !inner.is_dynamic() => head_length(inner) * size,
        ParamType::Tuple(types) if !param_type.is_dynamic() => types.iter().map(head_length).sum(),
        _ => 32,
    }
}

fn encode_token(param_type: &ParamType, token: &Token) -> Result<Vec<u8>, AbiError> {
    let encoded = match (param_type, token) {
        (ParamType::Address, Token::Address(addr)) => {
            let mut buf = [0u8; 32];
            buf[12..].copy_from_slice(addr.as_bytes());
            buf.to_vec()
        }
        (ParamType::Uint(bits), Token::Uint(value)) => {
            if value.bits() > *bits {
                return Err(AbiError::Encode(format!(
                    "Value {} does not fit in uint{}",
                    value, bits
                )));
            }
            word(*value).to_vec()
        }
        (ParamType::Int(bits), Token::Int(value))
        | (
            ParamType::Fixed {
                signed: true, bits, ..
            },
            Token::Int(value),
        ) => {
            let limit = U256::one() << (*bits - 1);
            let fits = if value.negative {
                value.abs <= limit
            } else {
                value.abs < limit
            };
            if !fits {
                return Err(AbiError::Encode(format!(
                    "Value {} does not fit in int{}",
                    value, bits
                )));
            }
            word(value.to_twos_complement()).to_vec()
        }
        (
            ParamType::Fixed {
                signed: false, bits, ..
            },
            Token::Uint(value),
        ) => {
            if value.bits() > *bits {
                return Err(AbiError::Encode(format!(
                    "Value {} does not fit in {} bits",
                    value, bits
                )));
            }
            word(*value).to_vec()
        }
        (ParamType::Bool, Token::Bool(b)) => word(U256::from(u8::from(*b))).to_vec(),
        (ParamType::FixedBytes(size), Token::FixedBytes(data)) => {
            if data.len() > *size {
                return Err(AbiError::Encode(format!(
                    "{} bytes do not fit in bytes{}",
                    data.len(),
                    size
                )));
            }
            let mut buf = [0u8; 32];
            buf[..data.len()].copy_from_slice(data);
            buf.to_vec()
        }
        (ParamType::Bytes, Token::Bytes(data)) => encode_bytes(data),
        (ParamType::String, Token::String(s)) => encode_bytes(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(tokens)) => {
            let mut result = word(U256::from(tokens.len())).to_vec();
            let inner_types = vec![(**inner).clone(); tokens.len()];
            result.extend(encode(&inner_types, tokens)?);
            result
        }
        (ParamType::FixedArray(inner, size), Token::FixedArray(tokens)) => {
            if tokens.len() != *size {
                return Err(AbiError::Encode(format!(
                    "Expected {} array elements, got {}",
                    size,
                    tokens.len()
                )));
            }
            encode(&vec![(**inner).clone(); *size], tokens)?
        }
        (ParamType::Tuple(types), Token::Tuple(tokens)) => encode(types, tokens)?,
        (expected, actual) => {
            return Err(AbiError::Encode(format!(
                "Cannot encode {:?} as {}",
                actual, expected
            )));
        }
    };
    Ok(encoded)
}

/// Convert U256 to a 32-byte big-endian word
fn word(value: U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut result = word(U256::from(data.len())).to_vec();
    let padded_len = data.len().div_ceil(32) * 32;
    let mut padded = vec![0u8; padded_len];
    padded[..data.len()].copy_from_slice(data);
    result.extend(padded);
    result
}
