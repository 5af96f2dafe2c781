//! `vela events`: list past logs of one contract event

use std::path::PathBuf;

use clap::Args;
use serde_json::{json, Value};
use vela_sdk::{ActivateOptions, BlockId, Connection, ContractSession};

use crate::commands::{connect, load_abi};
use crate::{config::Config, output::plain, output::Output, CliError};

/// Arguments of `vela events`
#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Contract address
    #[arg(long)]
    pub address: String,
    /// ABI file (JSON or one declaration per line)
    #[arg(long)]
    pub abi: PathBuf,
    /// Event name or signature
    #[arg(short, long)]
    pub event: String,
    /// First block: a number, `earliest` or `latest`
    #[arg(long, value_parser = parse_block)]
    pub from_block: BlockId,
    /// Last block (inclusive)
    #[arg(long, value_parser = parse_block, default_value = "latest")]
    pub to_block: BlockId,
    /// Argument filter as `name=value`; repeatable
    #[arg(short, long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, Value)>,
}

impl EventsArgs {
    pub async fn execute(self, config: &Config, json: bool) -> Result<(), CliError> {
        let abi = load_abi(&self.abi)?;
        let connector = connect(config, None).await?;
        let session = ContractSession::new().with_config(config.session_config());
        session
            .activate(ActivateOptions {
                address: self.address,
                abi,
                connection: Connection::Connector(connector),
            })
            .await?;

        let result = session
            .events_between_blocks(&self.event, self.from_block, self.to_block, &self.filters)
            .await;
        session.deactivate().await?;
        let logs = result?;

        let mut out = Output::new(json).field_u64("count", logs.len() as u64);
        let mut entries = Vec::with_capacity(logs.len());
        for decoded in &logs {
            let block = decoded
                .log
                .block_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| "pending".to_string());
            let args: Vec<String> = decoded
                .args
                .iter()
                .map(|(name, value)| format!("{}={}", name, plain(value)))
                .collect();
            out = out.line(format!("[{}] {} {}", block, decoded.event, args.join(" ")));
            entries.push(json!({
                "event": decoded.event,
                "blockNumber": decoded.log.block_number,
                "transactionHash": decoded.log.transaction_hash.map(|h| format!("{:?}", h)),
                "args": decoded.args,
            }));
        }
        if logs.is_empty() {
            out = out.line("No matching events");
        }
        out.field_value("events", Value::Array(entries)).print();
        Ok(())
    }
}

/// Parse a block argument: decimal or `0x` number, `earliest`, `latest` or `pending`
pub fn parse_block(s: &str) -> Result<BlockId, String> {
    match s {
        "latest" => Ok(BlockId::Latest),
        "earliest" => Ok(BlockId::Earliest),
        "pending" => Ok(BlockId::Pending),
        _ => {
            let number = match s.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => s.parse(),
            };
            number
                .map(BlockId::Number)
                .map_err(|_| format!("invalid block: {}", s))
        }
    }
}

/// Parse `name=value`; the value is read as JSON, falling back to a plain string
pub fn parse_filter(s: &str) -> Result<(String, Value), String> {
    let (name, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {}", s))?;
    if name.is_empty() {
        return Err(format!("missing parameter name in {}", s));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block() {
        assert_eq!(parse_block("latest").unwrap(), BlockId::Latest);
        assert_eq!(parse_block("earliest").unwrap(), BlockId::Earliest);
        assert_eq!(parse_block("1200").unwrap(), BlockId::Number(1200));
        assert_eq!(parse_block("0x10").unwrap(), BlockId::Number(16));
        assert!(parse_block("yesterday").is_err());
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("from=0x70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap(),
            ("from".to_string(), json!("0x70997970c51812dc3a010c7d01b50e0d17dc79c8"))
        );
        assert_eq!(parse_filter("value=100").unwrap(), ("value".to_string(), json!(100)));
        assert_eq!(parse_filter("ok=true").unwrap(), ("ok".to_string(), json!(true)));
        assert!(parse_filter("novalue").is_err());
        assert!(parse_filter("=1").is_err());
    }
}
