//! Subcommands and the helpers they share

pub mod events;
pub mod exec;
pub mod replace;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use vela_abi::Abi;
use vela_sdk::{hex_address, Connector, TransactionRecord};

use crate::{config::Config, output::Output, CliError};

/// Load an ABI file: a JSON array, a build artifact with an `abi` member, or
/// one human-readable declaration per line (`#` starts a comment line)
pub fn load_abi(path: &Path) -> Result<Abi, CliError> {
    let content = std::fs::read_to_string(path)?;
    let trimmed = content.trim_start();

    if trimmed.starts_with('[') {
        return Ok(Abi::from_json(&content)?);
    }
    if trimmed.starts_with('{') {
        let artifact: Value = serde_json::from_str(&content)?;
        let abi = artifact
            .get("abi")
            .cloned()
            .ok_or_else(|| CliError::InvalidInput(format!("{}: no `abi` member", path.display())))?;
        return Ok(Abi::from_value(abi)?);
    }

    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();
    Ok(Abi::from_human_readable(&lines)?)
}

/// Build and activate a connector for the configured endpoint
pub async fn connect(config: &Config, key: Option<&str>) -> Result<Arc<Connector>, CliError> {
    let mut connector = Connector::http(&config.rpc_url).with_config(config.connector_config());
    if let Some(key) = key {
        connector = connector.with_private_key(key)?;
    }
    connector.activate().await?;
    tracing::debug!(rpc = %config.rpc_url, "connector ready");
    Ok(Arc::new(connector))
}

/// Transaction descriptor as printed by every command that sends one
pub fn print_record(record: &TransactionRecord, title: &str, json: bool) -> Result<(), CliError> {
    let mut out = Output::new(json)
        .field_value("transaction", serde_json::to_value(record)?)
        .line(title)
        .line(format!("  Hash:  {:?}", record.hash))
        .line(format!("  From:  {}", hex_address(&record.from)))
        .line(format!("  Nonce: {}", record.nonce))
        .line(format!("  Gas:   {}", record.gas_limit));
    if let Some(to) = &record.to {
        out = out.line(format!("  To:    {}", hex_address(to)));
    }
    out.print();
    Ok(())
}
