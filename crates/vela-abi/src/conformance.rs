//! ABI conformance checks against a reference standard

use crate::error::{AbiViolation, IoSide, ItemKind};
use crate::fragment::{Fragment, FragmentKind, Param};
use crate::{Abi, AbiError};

/// Check that `candidate` declares every function and event of `standard`
/// with the same input (and, for functions, output) types.
///
/// All violations are collected and returned together.
pub fn validate_abi(standard: &Abi, candidate: &Abi) -> Result<(), AbiError> {
    let violations: Vec<AbiViolation> = standard
        .fragments()
        .iter()
        .flat_map(|required| check_item(required, standard, candidate))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(AbiError::NonConformant(violations))
    }
}

/// Whether `abi` declares a function `name`, optionally with exactly `param_types`.
///
/// Never fails: unparsable type strings simply yield `false`.
pub fn implements_function(abi: &Abi, name: &str, param_types: Option<&[&str]>) -> bool {
    match param_types {
        None => !abi.overloads(FragmentKind::Function, name).is_empty(),
        Some(types) => {
            let canonical: Result<Vec<String>, _> = types
                .iter()
                .map(|t| t.parse::<crate::ParamType>().map(|p| p.to_string()))
                .collect();
            match canonical {
                Ok(types) => abi
                    .function(&format!("{}({})", name, types.join(",")))
                    .is_some(),
                Err(_) => false,
            }
        }
    }
}

fn check_item(required: &Fragment, standard: &Abi, candidate: &Abi) -> Vec<AbiViolation> {
    let kind = match required.kind {
        FragmentKind::Function => ItemKind::Function,
        FragmentKind::Event => ItemKind::Event,
    };
    let name = required.signature();

    // A bare-name match only stands in for a name the standard does not overload
    let overloaded = standard.overloads(required.kind, &required.name).len() > 1;
    let found = candidate.resolve(required.kind, &name).or_else(|| {
        if overloaded {
            None
        } else {
            candidate.overloads(required.kind, &required.name).into_iter().next()
        }
    });
    let Some(found) = found else {
        return vec![AbiViolation::ItemNotFound { name, kind }];
    };

    let mut sides = vec![(IoSide::Input, &required.inputs, &found.inputs)];
    if required.kind == FragmentKind::Function {
        sides.push((IoSide::Output, &required.outputs, &found.outputs));
    }

    sides
        .into_iter()
        .filter_map(|(io, expected, actual)| {
            let name = name.clone();
            if expected.len() != actual.len() {
                Some(AbiViolation::IoLengthMismatch { name, kind, io })
            } else if !same_types(expected, actual) {
                Some(AbiViolation::IoTypesMismatch { name, kind, io })
            } else {
                None
            }
        })
        .collect()
}

fn same_types(a: &[Param], b: &[Param]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.kind == y.kind)
}
