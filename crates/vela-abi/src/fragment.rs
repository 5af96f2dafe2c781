//! ABI fragments (functions and events)

use std::fmt;
use std::str::FromStr;

use primitive_types::H256;

use crate::abi::wrap_array_suffix;
use crate::hash::{function_selector, keccak256};
use crate::types::{parse_type, split_top_level, ParamType};
use crate::AbiError;

/// Function or event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Callable function
    Function,
    /// Log event
    Event,
}

/// Function state mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateMutability {
    /// Does not read state
    Pure,
    /// Reads but does not modify state
    View,
    /// Modifies state, rejects value
    #[default]
    NonPayable,
    /// Modifies state, accepts value
    Payable,
}

impl FromStr for StateMutability {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pure" => Ok(StateMutability::Pure),
            "view" | "constant" => Ok(StateMutability::View),
            "nonpayable" => Ok(StateMutability::NonPayable),
            "payable" => Ok(StateMutability::Payable),
            other => Err(AbiError::Parse(format!("Unknown state mutability: {}", other))),
        }
    }
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StateMutability::Pure => "pure",
            StateMutability::View => "view",
            StateMutability::NonPayable => "nonpayable",
            StateMutability::Payable => "payable",
        })
    }
}

/// Named, typed parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name (may be empty)
    pub name: String,
    /// Parameter type
    pub kind: ParamType,
    /// Indexed flag (event inputs only)
    pub indexed: bool,
    /// Component names for tuple types, in order (empty otherwise)
    pub components: Vec<Param>,
}

impl Param {
    /// Create an unindexed parameter
    pub fn new(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: false,
            components: Vec::new(),
        }
    }
}

/// A parsed function or event. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Item name
    pub name: String,
    /// Function or event
    pub kind: FragmentKind,
    /// Ordered inputs
    pub inputs: Vec<Param>,
    /// Ordered outputs (functions only)
    pub outputs: Vec<Param>,
    /// State mutability (functions only)
    pub state_mutability: StateMutability,
    /// Anonymous flag (events only)
    pub anonymous: bool,
}

impl Fragment {
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.kind.to_string()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// Function selector
    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }

    /// Event topic (keccak256 of the signature)
    pub fn topic(&self) -> H256 {
        keccak256(self.signature().as_bytes())
    }

    /// Whether the function accepts native value
    pub fn is_payable(&self) -> bool {
        self.state_mutability == StateMutability::Payable
    }

    /// Whether the function is `view` or `pure`
    pub fn is_read_only(&self) -> bool {
        matches!(
            self.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    /// Input types in declaration order
    pub fn input_types(&self) -> Vec<ParamType> {
        self.inputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// Output types in declaration order
    pub fn output_types(&self) -> Vec<ParamType> {
        self.outputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// Parse a human-readable declaration.
    ///
    /// ```
    /// use vela_abi::Fragment;
    ///
    /// let f = Fragment::parse("function allowance(address owner, address spender) view returns (uint256)").unwrap();
    /// assert_eq!(f.signature(), "allowance(address,address)");
    /// assert!(f.is_read_only());
    /// ```
    pub fn parse(declaration: &str) -> Result<Self, AbiError> {
        let declaration = declaration.trim().trim_end_matches(';');
        let (kind, rest) = if let Some(rest) = declaration.strip_prefix("function ") {
            (FragmentKind::Function, rest)
        } else if let Some(rest) = declaration.strip_prefix("event ") {
            (FragmentKind::Event, rest)
        } else {
            return Err(AbiError::Parse(format!(
                "Expected 'function' or 'event': {}",
                declaration
            )));
        };

        let open = rest
            .find('(')
            .ok_or_else(|| AbiError::Parse(format!("Missing parameter list: {}", declaration)))?;
        let name = rest[..open].trim().to_string();
        if name.is_empty() {
            return Err(AbiError::Parse(format!("Missing name: {}", declaration)));
        }
        let close = matching_paren(rest, open)?;
        let inputs = parse_param_list(&rest[open + 1..close], kind == FragmentKind::Event)?;
        let tail = rest[close + 1..].trim();

        let mut fragment = Fragment {
            name,
            kind,
            inputs,
            outputs: Vec::new(),
            state_mutability: StateMutability::NonPayable,
            anonymous: false,
        };

        let mut words = tail;
        while !words.is_empty() {
            if let Some(after) = words.strip_prefix("returns") {
                let after = after.trim_start();
                if !after.starts_with('(') {
                    return Err(AbiError::Parse(format!("Malformed returns: {}", declaration)));
                }
                let end = matching_paren(after, 0)?;
                fragment.outputs = parse_param_list(&after[1..end], false)?;
                words = after[end + 1..].trim_start();
                continue;
            }
            let (word, remainder) = words.split_once(' ').unwrap_or((words, ""));
            match word {
                "anonymous" if kind == FragmentKind::Event => fragment.anonymous = true,
                "external" | "public" => {}
                other if kind == FragmentKind::Function => {
                    fragment.state_mutability = other.parse()?;
                }
                other => {
                    return Err(AbiError::Parse(format!("Unexpected modifier: {}", other)));
                }
            }
            words = remainder.trim_start();
        }

        Ok(fragment)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

fn matching_paren(s: &str, open: usize) -> Result<usize, AbiError> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + i);
                }
            }
            _ => {}
        }
    }
    Err(AbiError::Parse(format!("Unbalanced parentheses: {}", s)))
}

fn parse_param_list(body: &str, allow_indexed: bool) -> Result<Vec<Param>, AbiError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(body)
        .into_iter()
        .map(|raw| parse_param(raw.trim(), allow_indexed))
        .collect()
}

fn parse_param(raw: &str, allow_indexed: bool) -> Result<Param, AbiError> {
    // The type may itself contain spaces inside a tuple, so split after its closing paren.
    let (type_part, rest) = if raw.starts_with('(') {
        let close = matching_paren(raw, 0)?;
        let suffix_end = raw[close + 1..]
            .find(' ')
            .map(|i| close + 1 + i)
            .unwrap_or(raw.len());
        (&raw[..suffix_end], raw[suffix_end..].trim())
    } else {
        raw.split_once(' ').unwrap_or((raw, ""))
    };

    let mut param = if type_part.starts_with('(') {
        let close = matching_paren(type_part, 0)?;
        let components = parse_param_list(&type_part[1..close], false)?;
        let tuple = ParamType::Tuple(components.iter().map(|c| c.kind.clone()).collect());
        Param {
            components,
            ..Param::new("", wrap_array_suffix(tuple, &type_part[close + 1..])?)
        }
    } else {
        Param::new("", parse_type(type_part)?)
    };
    for word in rest.split_whitespace() {
        match word {
            "indexed" if allow_indexed => param.indexed = true,
            "memory" | "calldata" | "storage" => {}
            name if param.name.is_empty() => param.name = name.to_string(),
            other => {
                return Err(AbiError::Parse(format!("Unexpected token in parameter: {}", other)));
            }
        }
    }
    Ok(param)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_function() {
        let f = Fragment::parse("function transfer(address to, uint256 amount) returns (bool)")
            .unwrap();
        assert_eq!(f.kind, FragmentKind::Function);
        assert_eq!(f.signature(), "transfer(address,uint256)");
        assert_eq!(f.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(f.inputs[0].name, "to");
        assert_eq!(f.outputs.len(), 1);
        assert_eq!(f.state_mutability, StateMutability::NonPayable);
        assert!(!f.is_payable());
    }

    #[test]
    fn test_parse_payable_without_names() {
        let f = Fragment::parse("function deposit() payable").unwrap();
        assert!(f.is_payable());
        assert!(f.inputs.is_empty());
    }

    #[test]
    fn test_parse_event_with_indexed() {
        let f = Fragment::parse(
            "event Transfer(address indexed from, address indexed to, uint256 value)",
        )
        .unwrap();
        assert_eq!(f.kind, FragmentKind::Event);
        assert!(f.inputs[0].indexed);
        assert!(f.inputs[1].indexed);
        assert!(!f.inputs[2].indexed);
        assert_eq!(f.inputs[2].name, "value");
    }

    #[test]
    fn test_parse_tuple_param() {
        let f = Fragment::parse("function submit((address,uint256) order, bytes sig) external")
            .unwrap();
        assert_eq!(f.signature(), "submit((address,uint256),bytes)");
        assert_eq!(f.inputs[0].name, "order");

        let named = Fragment::parse("function batch((address owner, uint256 amount)[] orders)")
            .unwrap();
        assert_eq!(named.signature(), "batch((address,uint256)[])");
        let names: Vec<&str> = named.inputs[0].components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["owner", "amount"]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Fragment::parse("constructor(uint256)").is_err());
        assert!(Fragment::parse("function broken(uint256").is_err());
        assert!(Fragment::parse("function f() sometimes").is_err());
    }
}
