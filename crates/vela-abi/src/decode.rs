//! ABI decoding

use primitive_types::{H256, U256};

use crate::fragment::Fragment;
use crate::types::{Address, ParamType, Token, I256};
use crate::AbiError;

/// Decode tokens from ABI-encoded data
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_params(types, data, 0)
}

/// Decode the arguments of a call to `fragment` (selector included)
pub fn decode_function_input(fragment: &Fragment, data: &[u8]) -> Result<Vec<Token>, AbiError> {
    if data.len() < 4 {
        return Err(AbiError::Decode("Call data shorter than a selector".to_string()));
    }
    if data[..4] != fragment.selector() {
        return Err(AbiError::Decode(format!(
            "Call data selector 0x{} does not match {}",
            hex::encode(&data[..4]),
            fragment.signature()
        )));
    }
    decode(&fragment.input_types(), &data[4..])
}

/// Decode the return data of a call to `fragment`
pub fn decode_function_output(fragment: &Fragment, data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode(&fragment.output_types(), data)
}

/// Decode a log emitted by `event`, returning the arguments in declaration order.
///
/// Indexed dynamic arguments only survive as their hash and come back as
/// `Token::FixedBytes`.
pub fn decode_log(event: &Fragment, topics: &[H256], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let mut indexed_topics = if event.anonymous {
        topics.iter()
    } else {
        match topics.split_first() {
            Some((topic0, rest)) if *topic0 == event.topic() => rest.iter(),
            _ => {
                return Err(AbiError::Decode(format!(
                    "Log topic does not match event {}",
                    event.signature()
                )))
            }
        }
    };

    let data_types: Vec<ParamType> = event
        .inputs
        .iter()
        .filter(|p| !p.indexed)
        .map(|p| p.kind.clone())
        .collect();
    let mut data_tokens = decode(&data_types, data)?.into_iter();

    let mut tokens = Vec::with_capacity(event.inputs.len());
    for input in &event.inputs {
        if input.indexed {
            let topic = indexed_topics.next().ok_or_else(|| {
                AbiError::Decode(format!("Missing topic for indexed {}", input.name))
            })?;
            if input.kind.is_dynamic() || matches!(input.kind, ParamType::FixedArray(..) | ParamType::Tuple(_)) {
                tokens.push(Token::FixedBytes(topic.as_bytes().to_vec()));
            } else {
                let (token, _) = decode_token(&input.kind, topic.as_bytes(), 0)?;
                tokens.push(token);
            }
        } else {
            let token = data_tokens
                .next()
                .ok_or_else(|| AbiError::Decode("Log data ended early".to_string()))?;
            tokens.push(token);
        }
    }
    Ok(tokens)
}

/// Decode `types` laid out head/tail starting at `base`.
///
/// Offsets of dynamic members are relative to `base`.
fn decode_params(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, AbiError> {
    let mut offset = base;
    let mut tokens = Vec::with_capacity(types.len());

    for param_type in types {
        if param_type.is_dynamic() {
            let relative = read_usize(data, offset)?;
            let start = base
                .checked_add(relative)
                .ok_or_else(|| AbiError::Decode("Offset overflow".to_string()))?;
            let (token, _) = decode_token(param_type, data, start)?;
            tokens.push(token);
            offset += 32;
        } else {
            let (token, consumed) = decode_token(param_type, data, offset)?;
            tokens.push(token);
            offset += consumed;
        }
    }

    Ok(tokens)
}

/// Decode a single token whose encoding starts at `offset`.
///
/// Returns the token and the number of head bytes it occupied.
fn decode_token(param_type: &ParamType, data: &[u8], offset: usize) -> Result<(Token, usize), AbiError> {
    match param_type {
        ParamType::Address => {
            let bytes = read_word(data, offset)?;
            Ok((Token::Address(Address::from_slice(&bytes[12..])), 32))
        }
        ParamType::Uint(_) | ParamType::Fixed { signed: false, .. } => {
            let value = U256::from_big_endian(read_word(data, offset)?);
            Ok((Token::Uint(value), 32))
        }
        ParamType::Int(_) | ParamType::Fixed { signed: true, .. } => {
            let value = U256::from_big_endian(read_word(data, offset)?);
            Ok((Token::Int(I256::from_twos_complement(value)), 32))
        }
        ParamType::Bool => {
            let bytes = read_word(data, offset)?;
            Ok((Token::Bool(bytes[31] != 0), 32))
        }
        ParamType::FixedBytes(size) => {
            let bytes = read_word(data, offset)?;
            Ok((Token::FixedBytes(bytes[..*size].to_vec()), 32))
        }
        ParamType::Bytes => Ok((Token::Bytes(read_bytes(data, offset)?), 32)),
        ParamType::String => {
            let bytes = read_bytes(data, offset)?;
            let s = String::from_utf8(bytes)
                .map_err(|e| AbiError::Decode(format!("Invalid UTF-8: {}", e)))?;
            Ok((Token::String(s), 32))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, offset)?;
            // Every element needs at least one word, which bounds hostile lengths.
            check_length(data, offset + 32 + len.saturating_mul(32))?;
            let types = vec![(**inner).clone(); len];
            let tokens = decode_params(&types, data, offset + 32)?;
            Ok((Token::Array(tokens), 32))
        }
        ParamType::FixedArray(inner, size) => {
            let types = vec![(**inner).clone(); *size];
            let tokens = decode_params(&types, data, offset)?;
            let consumed = if param_type.is_dynamic() { 32 } else { 32 * static_words(param_type) };
            Ok((Token::FixedArray(tokens), consumed))
        }
        ParamType::Tuple(types) => {
            let tokens = decode_params(types, data, offset)?;
            let consumed = if param_type.is_dynamic() { 32 } else { 32 * static_words(param_type) };
            Ok((Token::Tuple(tokens), consumed))
        }
    }
}

fn static_words(param_type: &ParamType) -> usize {
    match param_type {
        ParamType::FixedArray(inner, size) => static_words(inner) * size,
        ParamType::Tuple(types) => types.iter().map(static_words).sum(),
        _ => 1,
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    check_length(data, offset.saturating_add(32))?;
    Ok(&data[offset..offset + 32])
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(read_word(data, offset)?);
    if value > U256::from(u32::MAX) {
        return Err(AbiError::Decode(format!("Length or offset too large: {}", value)));
    }
    Ok(value.as_usize())
}

fn read_bytes(data: &[u8], offset: usize) -> Result<Vec<u8>, AbiError> {
    let len = read_usize(data, offset)?;
    check_length(data, offset + 32 + len)?;
    Ok(data[offset + 32..offset + 32 + len].to_vec())
}

fn check_length(data: &[u8], required: usize) -> Result<(), AbiError> {
    if data.len() < required {
        return Err(AbiError::Decode(format!(
            "Insufficient data: need {} bytes, have {}",
            required,
            data.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode, encode_function_call, encode_topic};

    fn addr() -> Address {
        Address::from_slice(&hex::decode("742d35cc6634c0532925a3b844bc9e7595f0ab3d").unwrap())
    }

    #[test]
    fn test_decode_static_values() {
        let mut encoded = [0u8; 64];
        encoded[12..32].copy_from_slice(addr().as_bytes());
        encoded[63] = 100;

        let tokens = decode(&[ParamType::Address, ParamType::Uint(256)], &encoded).unwrap();
        assert_eq!(tokens, vec![Token::Address(addr()), Token::Uint(U256::from(100))]);
    }

    #[test]
    fn test_decode_int_negative() {
        let tokens = decode(&[ParamType::Int(256)], &[0xffu8; 32]).unwrap();
        assert_eq!(tokens[0], Token::Int(I256::from_i128(-1)));
    }

    #[test]
    fn test_decode_string() {
        let mut encoded = vec![0u8; 96];
        encoded[31] = 32;
        encoded[63] = 5;
        encoded[64..69].copy_from_slice(b"hello");

        let tokens = decode(&[ParamType::String], &encoded).unwrap();
        assert_eq!(tokens[0], Token::String("hello".to_string()));
    }

    #[test]
    fn test_decode_nested_dynamic_array() {
        let types = vec![
            ParamType::Uint(8),
            ParamType::Array(Box::new(ParamType::String)),
        ];
        let tokens = vec![
            Token::Uint(U256::from(3)),
            Token::Array(vec![Token::String("a".into()), Token::String("bc".into())]),
        ];
        let encoded = encode(&types, &tokens).unwrap();
        assert_eq!(decode(&types, &encoded).unwrap(), tokens);
    }

    #[test]
    fn test_decode_static_tuple_consumes_all_words() {
        let types = vec![
            ParamType::Tuple(vec![ParamType::Uint(256), ParamType::Bool]),
            ParamType::Address,
        ];
        let tokens = vec![
            Token::Tuple(vec![Token::Uint(U256::from(9)), Token::Bool(true)]),
            Token::Address(addr()),
        ];
        let encoded = encode(&types, &tokens).unwrap();
        assert_eq!(encoded.len(), 96);
        assert_eq!(decode(&types, &encoded).unwrap(), tokens);
    }

    #[test]
    fn test_decode_insufficient_data() {
        assert!(decode(&[ParamType::Uint(256)], &[0u8; 16]).is_err());
    }

    #[test]
    fn test_decode_function_input_checks_selector() {
        let f = Fragment::parse("function transfer(address to, uint256 amount)").unwrap();
        let args = vec![Token::Address(addr()), Token::Uint(U256::from(5))];
        let data = encode_function_call(&f, &args).unwrap();
        assert_eq!(decode_function_input(&f, &data).unwrap(), args);

        let other = Fragment::parse("function approve(address to, uint256 amount)").unwrap();
        assert!(decode_function_input(&other, &data).is_err());
    }

    #[test]
    fn test_decode_log() {
        let event = Fragment::parse(
            "event Transfer(address indexed from, address indexed to, uint256 value)",
        )
        .unwrap();
        let from = encode_topic(&ParamType::Address, &Token::Address(addr())).unwrap();
        let to = encode_topic(&ParamType::Address, &Token::Address(Address::zero())).unwrap();
        let data = encode(&[ParamType::Uint(256)], &[Token::Uint(U256::from(42))]).unwrap();

        let tokens = decode_log(&event, &[event.topic(), from, to], &data).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Address(addr()),
                Token::Address(Address::zero()),
                Token::Uint(U256::from(42)),
            ]
        );

        assert!(decode_log(&event, &[H256::zero(), from, to], &data).is_err());
    }
}
