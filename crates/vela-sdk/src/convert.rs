//! JSON value <-> ABI token conversion

use primitive_types::U256;
use serde_json::{Map, Value};
use vela_abi::{Param, ParamType, Token, I256};

use crate::client::{hex_address, parse_hex_address};
use crate::units::{format_units, parse_units};
use crate::SdkError;

/// Name of a JSON value's kind, as reported in type errors
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce a JSON value to an arbitrary-precision integer.
///
/// Accepts integral numbers, decimal strings with an optional leading `-`, and
/// `0x` hex strings.
pub fn to_big_int(value: &Value) -> Option<I256> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Some(I256::new(U256::from(v), false))
            } else if let Some(v) = n.as_i64() {
                Some(I256::from_i128(i128::from(v)))
            } else {
                None
            }
        }
        Value::String(s) => parse_big_int(s.trim()),
        _ => None,
    }
}

fn parse_big_int(s: &str) -> Option<I256> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let abs = if let Some(hex) = digits.strip_prefix("0x") {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        U256::from_str_radix(hex, 16).ok()?
    } else {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        U256::from_dec_str(digits).ok()?
    };
    Some(I256::new(abs, negative))
}

/// Decimal text of a JSON number or string, if it is one
pub fn decimal_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            let unsigned = s.strip_prefix('-').unwrap_or(s);
            let valid = !unsigned.is_empty()
                && unsigned != "."
                && unsigned.bytes().filter(|b| *b == b'.').count() <= 1
                && unsigned.bytes().all(|b| b.is_ascii_digit() || b == b'.');
            valid.then(|| s.to_string())
        }
        _ => None,
    }
}

/// Convert a JSON argument into a token of `param`'s type
pub fn param_to_token(param: &Param, value: &Value) -> Result<Token, SdkError> {
    value_to_token(&param.name, &param.kind, &param.components, value)
}

/// Convert a JSON value into a token of type `kind`.
///
/// `components` names tuple members, allowing tuples to be given as objects.
pub fn value_to_token(
    name: &str,
    kind: &ParamType,
    components: &[Param],
    value: &Value,
) -> Result<Token, SdkError> {
    let mismatch = || SdkError::InvalidParamType {
        name: name.to_string(),
        expected: kind.to_string(),
        actual: describe(value),
    };

    let token = match kind {
        ParamType::Address => {
            let s = value.as_str().ok_or_else(mismatch)?;
            Token::Address(parse_hex_address(s).map_err(|_| mismatch())?)
        }
        ParamType::Uint(_) => {
            let n = to_big_int(value).ok_or_else(|| SdkError::NotBigNumberish(name.to_string()))?;
            if n.negative {
                return Err(mismatch());
            }
            Token::Uint(n.abs)
        }
        ParamType::Int(_) => {
            let n = to_big_int(value).ok_or_else(|| SdkError::NotBigNumberish(name.to_string()))?;
            Token::Int(n)
        }
        ParamType::Bool => Token::Bool(value.as_bool().ok_or_else(mismatch)?),
        ParamType::String => Token::String(value.as_str().ok_or_else(mismatch)?.to_string()),
        ParamType::Bytes => Token::Bytes(hex_value(value).ok_or_else(mismatch)?),
        ParamType::FixedBytes(size) => {
            let bytes = hex_value(value).ok_or_else(mismatch)?;
            if bytes.len() > *size {
                return Err(mismatch());
            }
            Token::FixedBytes(bytes)
        }
        ParamType::Fixed {
            signed, decimals, ..
        } => {
            let text = decimal_text(value).ok_or_else(mismatch)?;
            let (negative, digits) = match text.strip_prefix('-') {
                Some(rest) => (true, rest.to_string()),
                None => (false, text),
            };
            let scaled = parse_units(&digits, *decimals).map_err(|_| mismatch())?;
            match (signed, negative) {
                (true, _) => Token::Int(I256::new(scaled, negative)),
                (false, false) => Token::Uint(scaled),
                (false, true) => return Err(mismatch()),
            }
        }
        ParamType::Array(inner) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            Token::Array(
                items
                    .iter()
                    .map(|item| value_to_token(name, inner, components, item))
                    .collect::<Result<_, _>>()?,
            )
        }
        ParamType::FixedArray(inner, size) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            if items.len() != *size {
                return Err(mismatch());
            }
            Token::FixedArray(
                items
                    .iter()
                    .map(|item| value_to_token(name, inner, components, item))
                    .collect::<Result<_, _>>()?,
            )
        }
        ParamType::Tuple(types) => {
            let members: Vec<&Value> = match value {
                Value::Array(items) if items.len() == types.len() => items.iter().collect(),
                Value::Object(map) if components.len() == types.len() => components
                    .iter()
                    .map(|c| map.get(&c.name).ok_or_else(mismatch))
                    .collect::<Result<_, _>>()?,
                _ => return Err(mismatch()),
            };
            let mut tokens = Vec::with_capacity(types.len());
            for (i, (member_type, member)) in types.iter().zip(members).enumerate() {
                let (member_name, member_components) = match components.get(i) {
                    Some(c) => (format!("{}.{}", name, c.name), c.components.as_slice()),
                    None => (format!("{}.{}", name, i), &[][..]),
                };
                tokens.push(value_to_token(&member_name, member_type, member_components, member)?);
            }
            Token::Tuple(tokens)
        }
    };
    Ok(token)
}

/// Render a token as JSON: addresses and bytes as 0x hex, integers as decimal
/// strings, fixed-point values unscaled
pub fn token_to_value(token: &Token, kind: &ParamType, components: &[Param]) -> Value {
    match (token, kind) {
        (Token::Address(a), _) => Value::String(hex_address(a)),
        (Token::Uint(v), ParamType::Fixed { decimals, .. }) => {
            Value::String(format_units(*v, *decimals))
        }
        (Token::Int(v), ParamType::Fixed { decimals, .. }) => {
            let sign = if v.negative { "-" } else { "" };
            Value::String(format!("{}{}", sign, format_units(v.abs, *decimals)))
        }
        (Token::Uint(v), _) => Value::String(v.to_string()),
        (Token::Int(v), _) => Value::String(v.to_string()),
        (Token::Bool(b), _) => Value::Bool(*b),
        (Token::String(s), _) => Value::String(s.clone()),
        (Token::Bytes(b), _) | (Token::FixedBytes(b), _) => {
            Value::String(format!("0x{}", hex::encode(b)))
        }
        (Token::Array(items), ParamType::Array(inner))
        | (Token::FixedArray(items), ParamType::FixedArray(inner, _)) => Value::Array(
            items
                .iter()
                .map(|t| token_to_value(t, inner, components))
                .collect(),
        ),
        (Token::Tuple(items), ParamType::Tuple(types)) if components.len() == items.len() => {
            let mut map = Map::new();
            for ((item, member_type), component) in items.iter().zip(types).zip(components) {
                map.insert(
                    component.name.clone(),
                    token_to_value(item, member_type, &component.components),
                );
            }
            Value::Object(map)
        }
        (Token::Tuple(items), ParamType::Tuple(types)) => Value::Array(
            items
                .iter()
                .zip(types)
                .map(|(t, k)| token_to_value(t, k, &[]))
                .collect(),
        ),
        (Token::Array(items), _) | (Token::FixedArray(items), _) | (Token::Tuple(items), _) => {
            Value::Array(
                items
                    .iter()
                    .map(|t| token_to_value(t, &ParamType::Bytes, &[]))
                    .collect(),
            )
        }
    }
}

/// Render decoded outputs: nothing as `null`, one value as itself, several as an array
pub fn outputs_to_value(params: &[Param], tokens: &[Token]) -> Value {
    let mut values: Vec<Value> = params
        .iter()
        .zip(tokens)
        .map(|(p, t)| token_to_value(t, &p.kind, &p.components))
        .collect();
    match values.len() {
        0 => Value::Null,
        1 => values.remove(0),
        _ => Value::Array(values),
    }
}

fn hex_value(value: &Value) -> Option<Vec<u8>> {
    let s = value.as_str()?;
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string {:?}", s),
        other => json_kind(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vela_abi::Fragment;

    #[test]
    fn test_big_int_coercion() {
        assert_eq!(to_big_int(&json!(5)), Some(I256::from_i128(5)));
        assert_eq!(to_big_int(&json!(-5)), Some(I256::from_i128(-5)));
        assert_eq!(to_big_int(&json!("0x10")), Some(I256::from_i128(16)));
        assert_eq!(
            to_big_int(&json!("115792089237316195423570985008687907853269984665640564039457584007913129639935")),
            Some(I256::new(U256::MAX, false))
        );
        assert_eq!(to_big_int(&json!("1.5")), None);
        assert_eq!(to_big_int(&json!(1.5)), None);
        assert_eq!(to_big_int(&json!("abc")), None);
        assert_eq!(to_big_int(&json!(true)), None);
    }

    #[test]
    fn test_scalar_conversion() {
        let addr = Param::new("to", ParamType::Address);
        let token = param_to_token(&addr, &json!("0x70997970c51812dc3a010c7d01b50e0d17dc79c8")).unwrap();
        assert_eq!(
            token_to_value(&token, &addr.kind, &[]),
            json!("0x70997970c51812dc3a010c7d01b50e0d17dc79c8")
        );

        let amount = Param::new("amount", ParamType::Uint(256));
        assert_eq!(param_to_token(&amount, &json!("1")).unwrap(), Token::Uint(U256::one()));
        assert!(matches!(
            param_to_token(&amount, &json!("one")),
            Err(SdkError::NotBigNumberish(n)) if n == "amount"
        ));
    }

    #[test]
    fn test_fixed_point_scaling() {
        let price = Param::new(
            "price",
            ParamType::Fixed {
                signed: true,
                bits: 128,
                decimals: 2,
            },
        );
        let token = param_to_token(&price, &json!("-1.25")).unwrap();
        assert_eq!(token, Token::Int(I256::from_i128(-125)));
        assert_eq!(token_to_value(&token, &price.kind, &[]), json!("-1.25"));

        let token = param_to_token(&price, &json!(3.5)).unwrap();
        assert_eq!(token, Token::Int(I256::from_i128(350)));
    }

    #[test]
    fn test_tuple_by_name_and_position() {
        let f = Fragment::parse("function submit((address owner, uint256 amount) order)").unwrap();
        let param = &f.inputs[0];

        let by_name = param_to_token(
            param,
            &json!({"owner": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8", "amount": 7}),
        )
        .unwrap();
        let by_position = param_to_token(
            param,
            &json!(["0x70997970c51812dc3a010c7d01b50e0d17dc79c8", "7"]),
        )
        .unwrap();
        assert_eq!(by_name, by_position);

        let rendered = token_to_value(&by_name, &param.kind, &param.components);
        assert_eq!(rendered["amount"], json!("7"));
    }

    #[test]
    fn test_outputs_to_value() {
        let f = Fragment::parse("function f() view returns (uint256, bool)").unwrap();
        let value = outputs_to_value(&f.outputs, &[Token::Uint(U256::from(3)), Token::Bool(true)]);
        assert_eq!(value, json!(["3", true]));
        assert_eq!(outputs_to_value(&[], &[]), Value::Null);
    }
}
