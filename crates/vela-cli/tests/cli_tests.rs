//! CLI integration tests for vela-cli
//!
//! Tests command parsing, output formatting, and config handling.

use std::path::Path;
use std::process::Command;

const ERC20_ABI: &str = r#"
# full ERC-20 surface
function totalSupply() view returns (uint256)
function balanceOf(address account) view returns (uint256)
function transfer(address to, uint256 amount) returns (bool)
function allowance(address owner, address spender) view returns (uint256)
function approve(address spender, uint256 amount) returns (bool)
function transferFrom(address from, address to, uint256 amount) returns (bool)
event Transfer(address indexed from, address indexed to, uint256 value)
event Approval(address indexed owner, address indexed spender, uint256 value)
"#;

/// Helper to run the CLI with an isolated config file
fn run_vela(config: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_vela"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

fn write_abi(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

// ==================== Help & Version Tests ====================

#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_vela(&dir.path().join("config.toml"), &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("vela"));
    assert!(stdout.contains("validate-abi"));
    assert!(stdout.contains("exec"));
    assert!(stdout.contains("speed-up"));
    assert!(stdout.contains("cancel"));
    assert!(stdout.contains("events"));
}

#[test]
fn test_cli_version() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_vela(&dir.path().join("config.toml"), &["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("vela"));
}

#[test]
fn test_exec_requires_method() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_vela(
        &dir.path().join("config.toml"),
        &["exec", "--address", "0x5FbDB2315678afecb367f032d93F642f64180aa3", "--abi", "x.json"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--method"));
}

// ==================== validate-abi Tests ====================

#[test]
fn test_validate_conformant_abi() {
    let dir = tempfile::tempdir().unwrap();
    let abi = write_abi(dir.path(), "token.abi", ERC20_ABI);
    let output = run_vela(
        &dir.path().join("config.toml"),
        &["validate-abi", "--standard", "erc20", "--abi", &abi],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ABI conforms to ERC-20"));
}

#[test]
fn test_validate_non_conformant_abi_json() {
    let dir = tempfile::tempdir().unwrap();
    let partial: String = ERC20_ABI
        .lines()
        .filter(|l| !l.contains("allowance") && !l.contains("approve("))
        .collect::<Vec<_>>()
        .join("\n");
    let abi = write_abi(dir.path(), "partial.abi", &partial);

    let output = run_vela(
        &dir.path().join("config.toml"),
        &["--json", "validate-abi", "--standard", "ERC-20", "--abi", &abi],
    );
    assert!(!output.status.success());

    // The report and the error object are printed as two JSON documents
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut docs = serde_json::Deserializer::from_str(&stdout).into_iter::<serde_json::Value>();
    let report = docs.next().unwrap().unwrap();
    assert_eq!(report["conformant"], false);
    let violations = report["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().any(|v| v.as_str().unwrap().contains("allowance(address,address)")));

    let error = docs.next().unwrap().unwrap();
    assert_eq!(error["success"], false);
    assert!(error["error"].as_str().unwrap().contains("2 violation"));
}

#[test]
fn test_validate_unknown_standard() {
    let dir = tempfile::tempdir().unwrap();
    let abi = write_abi(dir.path(), "token.abi", ERC20_ABI);
    let output = run_vela(
        &dir.path().join("config.toml"),
        &["validate-abi", "--standard", "erc777", "--abi", &abi],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("erc777"));
}

#[test]
fn test_validate_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let output = run_vela(
        &dir.path().join("config.toml"),
        &["validate-abi", "--standard", "erc20", "--abi", missing.to_str().unwrap()],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("IO error"));
}

// ==================== Config Tests ====================

#[test]
fn test_config_set_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    let output = run_vela(
        &config,
        &["config", "--set-rpc", "http://10.0.0.7:8545", "--set-fee-bump", "15"],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration saved"));
    assert!(config.exists());

    let output = run_vela(&config, &["--json", "config", "--show"]);
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["rpc_url"], "http://10.0.0.7:8545");
    assert_eq!(shown["fee_bump_percent"], 15);
    assert_eq!(shown["safe_mode"], true);
    assert_eq!(shown["signer"], false);
}

#[test]
fn test_config_rejects_zero_fee_bump() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let output = run_vela(&config, &["config", "--set-fee-bump", "0"]);
    assert!(!output.status.success());
    assert!(!config.exists());
}

#[test]
fn test_malformed_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "rpc_url = [").unwrap();
    let output = run_vela(&config, &["config", "--show"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config error"));
}

// ==================== Network Failure Tests ====================

#[test]
fn test_exec_unreachable_endpoint_json() {
    let dir = tempfile::tempdir().unwrap();
    let abi = write_abi(dir.path(), "token.abi", ERC20_ABI);
    let output = run_vela(
        &dir.path().join("config.toml"),
        &[
            "--json",
            "--rpc-url",
            "http://127.0.0.1:1",
            "exec",
            "--address",
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "--abi",
            &abi,
            "--method",
            "totalSupply",
        ],
    );
    assert!(!output.status.success());
    let error: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(error["success"], false);
    assert!(!error["error"].as_str().unwrap().is_empty());
}

#[test]
fn test_speed_up_rejects_bad_hash() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_vela(
        &dir.path().join("config.toml"),
        &["speed-up", "--hash", "0x1234"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("32 bytes"));
}
