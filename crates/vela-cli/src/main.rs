//! # vela-cli
//!
//! Command-line front end for the Vela contract SDK.
//!
//! ## Usage
//!
//! ```bash
//! # Check an ABI against a token standard
//! vela validate-abi --standard erc20 --abi token.json
//!
//! # Call or send a contract function
//! vela exec --address 0x... --abi token.json --method balanceOf --params '["0x..."]'
//! vela exec --address 0x... --abi token.json --method transfer --params '["0x...", "100"]' --key 0x...
//!
//! # Replace a pending transaction
//! vela speed-up --hash 0x... --key 0x...
//! vela cancel --hash 0x... --key 0x...
//!
//! # Past logs
//! vela events --address 0x... --abi token.json --event Transfer --from-block 0 --filter from=0x...
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod error;
mod output;

pub use config::Config;
pub use error::CliError;
pub use output::Output;

use commands::replace::Replacement;

/// Vela contract CLI
#[derive(Parser, Debug)]
#[command(name = "vela")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// RPC endpoint URL
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Config file (default: ~/.vela/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Check an ABI against a token standard
    ValidateAbi(commands::validate::ValidateArgs),
    /// Call or send a contract function
    Exec(commands::exec::ExecArgs),
    /// Replace a pending transaction with a zero-value self-transfer
    Cancel(commands::replace::ReplaceArgs),
    /// Resend a pending transaction with a higher fee
    SpeedUp(commands::replace::ReplaceArgs),
    /// List past logs of a contract event
    Events(commands::events::EventsArgs),
    /// Show or edit configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Set RPC URL
        #[arg(long)]
        set_rpc: Option<String>,
        /// Set the fee bump for replacements, in percent
        #[arg(long)]
        set_fee_bump: Option<u32>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let json = cli.json;
    if let Err(e) = run(cli).await {
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "error": format!("{:#}", e),
                    "success": false
                })
            );
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path().context("cannot locate home directory")?,
    };
    let mut config = Config::load_from(&config_path)?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }

    match cli.command {
        Commands::ValidateAbi(args) => args.execute(&config, cli.json)?,
        Commands::Exec(args) => args.execute(&config, cli.json).await?,
        Commands::Cancel(args) => args.execute(Replacement::Cancel, &config, cli.json).await?,
        Commands::SpeedUp(args) => args.execute(Replacement::SpeedUp, &config, cli.json).await?,
        Commands::Events(args) => args.execute(&config, cli.json).await?,
        Commands::Config {
            show,
            set_rpc,
            set_fee_bump,
        } => handle_config(&mut config, &config_path, show, set_rpc, set_fee_bump, cli.json)
            .with_context(|| format!("updating {}", config_path.display()))?,
    }
    Ok(())
}

fn handle_config(
    config: &mut Config,
    path: &std::path::Path,
    show: bool,
    set_rpc: Option<String>,
    set_fee_bump: Option<u32>,
    json: bool,
) -> Result<(), CliError> {
    let mut modified = false;

    if let Some(rpc) = set_rpc {
        config.rpc_url = rpc;
        modified = true;
    }

    if let Some(percent) = set_fee_bump {
        if percent == 0 {
            return Err(CliError::InvalidInput("fee bump must be at least 1%".to_string()));
        }
        config.fee_bump_percent = percent;
        modified = true;
    }

    if modified {
        config.save_to(path)?;
        Output::new(json)
            .field("status", "saved")
            .line("Configuration saved")
            .print();
    } else if show {
        Output::new(json)
            .field("rpc_url", &config.rpc_url)
            .field_u64("fee_bump_percent", config.fee_bump_percent as u64)
            .field_value("safe_mode", serde_json::Value::Bool(config.safe_mode))
            .field_value("signer", serde_json::Value::Bool(config.private_key.is_some()))
            .line(format!("RPC URL:   {}", config.rpc_url))
            .line(format!("Fee bump:  {}%", config.fee_bump_percent))
            .line(format!("Safe mode: {}", config.safe_mode))
            .line(format!(
                "Signer:    {}",
                if config.private_key.is_some() { "configured" } else { "none" }
            ))
            .print();
    } else {
        Output::new(json)
            .line("Use --show to display config, or --set-rpc/--set-fee-bump to modify")
            .print();
    }

    Ok(())
}
