//! `vela validate-abi`: check an ABI against a token standard

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;
use vela_abi::{validate_abi, AbiError, Standard};

use crate::commands::load_abi;
use crate::{config::Config, output::Output, CliError};

/// Arguments of `vela validate-abi`
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Standard to check against: erc20, erc721 or erc1155
    #[arg(short, long)]
    pub standard: Standard,
    /// ABI file (JSON or one declaration per line)
    #[arg(long)]
    pub abi: PathBuf,
}

impl ValidateArgs {
    pub fn execute(self, _config: &Config, json: bool) -> Result<(), CliError> {
        let candidate = load_abi(&self.abi)?;
        let violations = match validate_abi(&self.standard.abi()?, &candidate) {
            Ok(()) => Vec::new(),
            Err(AbiError::NonConformant(violations)) => violations,
            Err(e) => return Err(e.into()),
        };

        if violations.is_empty() {
            Output::new(json)
                .field("standard", &self.standard.to_string())
                .field_value("conformant", Value::Bool(true))
                .line(format!("ABI conforms to {}", self.standard))
                .print();
            return Ok(());
        }

        let mut out = Output::new(json)
            .field("standard", &self.standard.to_string())
            .field_value("conformant", Value::Bool(false))
            .field_value(
                "violations",
                Value::Array(violations.iter().map(|v| Value::String(v.to_string())).collect()),
            )
            .line(format!("ABI does not conform to {}:", self.standard));
        for violation in &violations {
            out = out.line(format!("  - {}", violation));
        }
        out.print();

        Err(CliError::NonConformant {
            standard: self.standard.to_string(),
            count: violations.len(),
        })
    }
}
