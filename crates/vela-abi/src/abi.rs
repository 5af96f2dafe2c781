//! Contract ABI document

use serde::Deserialize;

use crate::fragment::{Fragment, FragmentKind, Param, StateMutability};
use crate::types::{parse_type, ParamType};
use crate::AbiError;

/// Parsed contract ABI: the functions and events it declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abi {
    fragments: Vec<Fragment>,
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(rename = "type", default = "default_item_type")]
    item_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    #[serde(rename = "stateMutability")]
    state_mutability: Option<String>,
    constant: Option<bool>,
    payable: Option<bool>,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Deserialize)]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    param_type: String,
    #[serde(default)]
    indexed: bool,
    #[serde(default)]
    components: Vec<RawParam>,
}

fn default_item_type() -> String {
    "function".to_string()
}

impl RawParam {
    fn into_param(self) -> Result<Param, AbiError> {
        let components = self
            .components
            .into_iter()
            .map(RawParam::into_param)
            .collect::<Result<Vec<_>, _>>()?;
        let kind = match self.param_type.strip_prefix("tuple") {
            Some(suffix) => {
                let tuple = ParamType::Tuple(components.iter().map(|c| c.kind.clone()).collect());
                wrap_array_suffix(tuple, suffix)?
            }
            None => parse_type(&self.param_type)?,
        };
        Ok(Param {
            name: self.name,
            kind,
            indexed: self.indexed,
            components,
        })
    }
}

pub(crate) fn wrap_array_suffix(mut inner: ParamType, mut suffix: &str) -> Result<ParamType, AbiError> {
    while let Some(rest) = suffix.strip_prefix('[') {
        let close = rest
            .find(']')
            .ok_or_else(|| AbiError::Parse(format!("Unbalanced array suffix: {}", suffix)))?;
        inner = match &rest[..close] {
            "" => ParamType::Array(Box::new(inner)),
            size => ParamType::FixedArray(
                Box::new(inner),
                size.parse()
                    .map_err(|_| AbiError::Parse(format!("Invalid array size: {}", size)))?,
            ),
        };
        suffix = &rest[close + 1..];
    }
    if !suffix.is_empty() {
        return Err(AbiError::Parse(format!("Invalid tuple suffix: {}", suffix)));
    }
    Ok(inner)
}

impl Abi {
    /// Build an ABI from already parsed fragments
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    /// Parse a solc-style JSON ABI.
    ///
    /// Constructor, fallback, receive and error items are skipped.
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let items: Vec<RawItem> = serde_json::from_str(json)?;
        Self::from_raw_items(items)
    }

    /// Parse a JSON ABI already held as a `serde_json::Value`
    pub fn from_value(value: serde_json::Value) -> Result<Self, AbiError> {
        let items: Vec<RawItem> = serde_json::from_value(value)?;
        Self::from_raw_items(items)
    }

    fn from_raw_items(items: Vec<RawItem>) -> Result<Self, AbiError> {
        let mut fragments = Vec::with_capacity(items.len());
        for item in items {
            let kind = match item.item_type.as_str() {
                "function" => FragmentKind::Function,
                "event" => FragmentKind::Event,
                _ => continue,
            };
            if item.name.is_empty() {
                return Err(AbiError::Parse(format!("Unnamed {} item", item.item_type)));
            }
            let state_mutability = match (&item.state_mutability, item.constant, item.payable) {
                (Some(m), _, _) => m.parse()?,
                (None, Some(true), _) => StateMutability::View,
                (None, _, Some(true)) => StateMutability::Payable,
                _ => StateMutability::NonPayable,
            };
            fragments.push(Fragment {
                name: item.name,
                kind,
                inputs: item
                    .inputs
                    .into_iter()
                    .map(RawParam::into_param)
                    .collect::<Result<_, _>>()?,
                outputs: item
                    .outputs
                    .into_iter()
                    .map(RawParam::into_param)
                    .collect::<Result<_, _>>()?,
                state_mutability,
                anonymous: item.anonymous,
            });
        }
        Ok(Self { fragments })
    }

    /// Parse a list of human-readable declarations
    pub fn from_human_readable<S: AsRef<str>>(lines: &[S]) -> Result<Self, AbiError> {
        let fragments = lines
            .iter()
            .map(|l| Fragment::parse(l.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { fragments })
    }

    /// All fragments in declaration order
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// All functions
    pub fn functions(&self) -> impl Iterator<Item = &Fragment> {
        self.of_kind(FragmentKind::Function)
    }

    /// All events
    pub fn events(&self) -> impl Iterator<Item = &Fragment> {
        self.of_kind(FragmentKind::Event)
    }

    fn of_kind(&self, kind: FragmentKind) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(move |f| f.kind == kind)
    }

    /// Every item of `kind` sharing `name`
    pub fn overloads(&self, kind: FragmentKind, name: &str) -> Vec<&Fragment> {
        self.of_kind(kind).filter(|f| f.name == name).collect()
    }

    /// Resolve by exact signature, or by bare name when it is not overloaded
    pub fn resolve(&self, kind: FragmentKind, name_or_signature: &str) -> Option<&Fragment> {
        let key = name_or_signature.replace(' ', "");
        if key.contains('(') {
            return self.of_kind(kind).find(|f| f.signature() == key);
        }
        match self.overloads(kind, &key).as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    /// Resolve a function
    pub fn function(&self, name_or_signature: &str) -> Option<&Fragment> {
        self.resolve(FragmentKind::Function, name_or_signature)
    }

    /// Resolve an event
    pub fn event(&self, name_or_signature: &str) -> Option<&Fragment> {
        self.resolve(FragmentKind::Event, name_or_signature)
    }
}
