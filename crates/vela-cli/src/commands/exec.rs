//! `vela exec`: run one contract function through the execution pipeline

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;
use vela_sdk::{ActivateOptions, Connection, ContractSession, ExecuteRequest, ExecuteResult, Overrides};

use crate::commands::{connect, load_abi, print_record};
use crate::{config::Config, output::plain, output::Output, CliError};

/// Arguments of `vela exec`
#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Contract address
    #[arg(long)]
    pub address: String,
    /// ABI file (JSON or one declaration per line)
    #[arg(long)]
    pub abi: PathBuf,
    /// Function name or signature, e.g. `transfer` or `mint(address,uint256)`
    #[arg(short, long)]
    pub method: String,
    /// Arguments as a JSON array
    #[arg(short, long, default_value = "[]")]
    pub params: String,
    /// Native currency to send, in whole units (payable functions only)
    #[arg(long)]
    pub value: Option<String>,
    /// Private key (hex); defaults to the configured key
    #[arg(short, long)]
    pub key: Option<String>,
    /// Send writes without simulating them first
    #[arg(long)]
    pub no_safe_mode: bool,
    /// Gas limit override
    #[arg(long)]
    pub gas_limit: Option<u64>,
    /// Nonce override
    #[arg(long)]
    pub nonce: Option<u64>,
}

impl ExecArgs {
    pub async fn execute(self, config: &Config, json: bool) -> Result<(), CliError> {
        let abi = load_abi(&self.abi)?;
        let params = parse_params(&self.params)?;

        let mut session_config = config.session_config();
        if self.no_safe_mode {
            session_config.safe_mode = false;
        }

        let key = config.signing_key(self.key);
        let connector = connect(config, key.as_deref()).await?;
        let session = ContractSession::new().with_config(session_config);
        session
            .activate(ActivateOptions {
                address: self.address,
                abi,
                connection: Connection::Connector(connector),
            })
            .await?;

        let mut overrides = Overrides::default();
        if let Some(gas_limit) = self.gas_limit {
            overrides = overrides.gas_limit(gas_limit);
        }
        if let Some(nonce) = self.nonce {
            overrides = overrides.nonce(nonce);
        }
        let mut request = ExecuteRequest::new(self.method)
            .params(params)
            .overrides(overrides);
        if let Some(value) = self.value {
            request = request.value(value);
        }

        let result = session.execute(request).await;
        session.deactivate().await?;

        match result? {
            ExecuteResult::Transaction(tx) => print_record(tx.record(), "Transaction sent", json),
            ExecuteResult::Value(value) => {
                Output::new(json)
                    .field_value("value", value.clone())
                    .line(plain(&value))
                    .print();
                Ok(())
            }
        }
    }
}

/// Parse `--params`: a JSON array of arguments
fn parse_params(raw: &str) -> Result<Vec<Value>, CliError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(values) => Ok(values),
        other => Err(CliError::InvalidInput(format!(
            "--params must be a JSON array, got {}",
            other
        ))),
    }
}
