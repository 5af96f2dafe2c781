//! Execution pipeline tests for vela-sdk
//!
//! Drives `ContractSession::execute` against a mock endpoint.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use vela_abi::{decode_function_input, encode, Abi, ParamType, Token};
use vela_sdk::{
    ActivateOptions, Connection, ContractSession, ExecuteRequest, FeeFields, MockTransport,
    Overrides, SdkError, SessionConfig, Wallet, U256,
};

const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const CONTRACT: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const RECIPIENT: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

fn token_abi() -> Abi {
    Abi::from_human_readable(&[
        "function transfer(address to, uint256 amount) returns (bool)",
        "function balanceOf(address owner) view returns (uint256)",
        "function name() view returns (string)",
        "function deposit() payable",
        "function mint(address to) returns (bool)",
        "function mint(address to, uint256 amount) returns (bool)",
        "function setFlag(bool flag)",
    ])
    .unwrap()
}

async fn session_with(transport: &MockTransport, key: Option<&str>, config: SessionConfig) -> ContractSession {
    let session = ContractSession::new().with_config(config);
    session
        .activate(ActivateOptions {
            address: CONTRACT.to_string(),
            abi: token_abi(),
            connection: Connection::Transport {
                transport: Arc::new(transport.clone()),
                private_key: key.map(str::to_string),
            },
        })
        .await
        .unwrap();
    session
}

async fn signing_session(transport: &MockTransport) -> ContractSession {
    session_with(transport, Some(KEY), SessionConfig::default()).await
}

fn methods(transport: &MockTransport) -> Vec<String> {
    transport.requests().into_iter().map(|(m, _)| m).collect()
}

// ==================== Writes ====================

#[tokio::test]
async fn test_transfer_is_simulated_then_sent() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    let result = session
        .execute(ExecuteRequest::new("transfer").param(RECIPIENT).param("1"))
        .await
        .unwrap();
    assert!(result.is_transaction());

    let log = methods(&transport);
    let simulated = log.iter().position(|m| m == "eth_call").unwrap();
    let sent = log.iter().position(|m| m == "eth_sendRawTransaction").unwrap();
    assert!(simulated < sent);

    let tx = result.transaction().unwrap();
    let wallet = Wallet::from_private_key_hex(KEY).unwrap();
    assert_eq!(tx.record().from, wallet.address());
    assert_eq!(tx.record().to, Some(vela_sdk::parse_address(CONTRACT).unwrap()));
    assert_eq!(tx.record().value, U256::zero());
}

#[tokio::test]
async fn test_sent_transaction_can_be_replaced() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;
    let result = session
        .execute(ExecuteRequest::new("transfer").param(RECIPIENT).param("1"))
        .await
        .unwrap();
    let tx = result.transaction().unwrap();

    let faster = tx.speed_up(None).await.unwrap();
    assert_eq!(faster.record().nonce, tx.record().nonce);
    assert_eq!(faster.record().data, tx.record().data);
    match (tx.record().fees, faster.record().fees) {
        (
            FeeFields::Eip1559 {
                max_priority_fee_per_gas: before,
                ..
            },
            FeeFields::Eip1559 {
                max_priority_fee_per_gas: after,
                ..
            },
        ) => assert!(after > before),
        other => panic!("unexpected fee fields: {:?}", other),
    }

    let mut values = Map::new();
    values.insert("amount".to_string(), json!("25"));
    let changed = faster.change(&values, None).await.unwrap();
    let fragment = token_abi().function("transfer").unwrap().clone();
    let args = decode_function_input(&fragment, &changed.record().data).unwrap();
    assert_eq!(args[1], Token::Uint(U256::from(25)));

    let cancelled = changed.cancel(None).await.unwrap();
    assert_eq!(cancelled.record().nonce, tx.record().nonce);
    assert_eq!(cancelled.record().to, Some(tx.record().from));
    assert_eq!(cancelled.record().value, U256::zero());
}

#[tokio::test]
async fn test_failed_simulation_never_sends() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;
    transport.set_error("eth_call", 3, "execution reverted");

    let err = session
        .execute(ExecuteRequest::new("transfer").param(RECIPIENT).param("1"))
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::TransactionFailed(_)));
    assert!(transport.requests_for("eth_sendRawTransaction").is_empty());
}

#[tokio::test]
async fn test_unsafe_mode_skips_simulation() {
    let transport = MockTransport::new();
    let config = SessionConfig {
        safe_mode: false,
        ..Default::default()
    };
    let session = session_with(&transport, Some(KEY), config).await;

    session
        .execute(ExecuteRequest::new("setFlag").param(true))
        .await
        .unwrap();
    assert!(transport.requests_for("eth_call").is_empty());
    assert_eq!(transport.requests_for("eth_sendRawTransaction").len(), 1);
}

#[tokio::test]
async fn test_send_failure_is_wrapped() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;
    transport.set_error("eth_sendRawTransaction", -32000, "nonce too low");

    let err = session
        .execute(ExecuteRequest::new("setFlag").param(false))
        .await
        .unwrap_err();
    match err {
        SdkError::TransactionFailed(cause) => {
            assert!(matches!(*cause, SdkError::Rpc { code: -32000, .. }))
        }
        other => panic!("expected TransactionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_write_without_signer_is_read_only() {
    let transport = MockTransport::new();
    let session = session_with(&transport, None, SessionConfig::default()).await;
    assert_eq!(session.is_readonly(), Some(true));

    let err = session
        .execute(ExecuteRequest::new("transfer").param(RECIPIENT).param("1"))
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::ReadOnly(op) if op == "execute"));
    assert!(transport.requests_for("eth_call").is_empty());
}

// ==================== Reads ====================

#[tokio::test]
async fn test_view_returns_decoded_value() {
    let transport = MockTransport::new();
    let session = session_with(&transport, None, SessionConfig::default()).await;
    let output = encode(&[ParamType::Uint(256)], &[Token::Uint(U256::from(42))]).unwrap();
    transport.set_response("eth_call", json!(format!("0x{}", hex::encode(output))));

    let result = session
        .execute(ExecuteRequest::new("balanceOf").param(RECIPIENT))
        .await
        .unwrap();
    assert!(!result.is_transaction());
    assert_eq!(result.value(), Some(&json!("42")));
    // Reads are not simulated twice
    assert_eq!(transport.requests_for("eth_call").len(), 1);
}

#[tokio::test]
async fn test_view_string_output() {
    let transport = MockTransport::new();
    let session = session_with(&transport, None, SessionConfig::default()).await;
    let output = encode(&[ParamType::String], &[Token::String("Vela".to_string())]).unwrap();
    transport.set_response("eth_call", json!(format!("0x{}", hex::encode(output))));

    let result = session.execute(ExecuteRequest::new("name")).await.unwrap();
    assert_eq!(result.value(), Some(&json!("Vela")));
}

// ==================== Resolution ====================

#[tokio::test]
async fn test_unknown_method() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    for method in ["burn", "burn(uint256)", "transferFrom"] {
        let err = session.execute(ExecuteRequest::new(method)).await.unwrap_err();
        assert!(matches!(err, SdkError::UnknownMethod(m) if m == method));
    }
}

#[tokio::test]
async fn test_overload_recommendation() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    let err = session
        .execute(ExecuteRequest::new("mint(uint256)").param("1"))
        .await
        .unwrap_err();
    match err {
        SdkError::UnknownMethodWithRecommendation { method, candidates } => {
            assert_eq!(method, "mint(uint256)");
            assert_eq!(candidates, vec!["mint(address)", "mint(address,uint256)"]);
        }
        other => panic!("expected recommendation, got {:?}", other),
    }

    // A bare overloaded name is ambiguous
    let err = session
        .execute(ExecuteRequest::new("mint").param(RECIPIENT))
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::UnknownMethodWithRecommendation { .. }));

    // The full signature resolves
    let result = session
        .execute(ExecuteRequest::new("mint(address, uint256)").param(RECIPIENT).param(5))
        .await
        .unwrap();
    assert!(result.is_transaction());
}

// ==================== Value ====================

#[tokio::test]
async fn test_payable_requires_valid_value() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    let err = session.execute(ExecuteRequest::new("deposit")).await.unwrap_err();
    assert!(matches!(err, SdkError::PayableMethodRequiresValue(m) if m == "deposit()"));

    let err = session
        .execute(ExecuteRequest::new("deposit").value("one"))
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::InvalidValueType(_)));

    let result = session
        .execute(ExecuteRequest::new("deposit").value("1.5"))
        .await
        .unwrap();
    assert_eq!(
        result.transaction().unwrap().record().value,
        U256::from(1_500_000_000_000_000_000u128)
    );
}

#[tokio::test]
async fn test_value_scaled_by_denomination() {
    let transport = MockTransport::new();
    let config = SessionConfig {
        denomination_decimals: 6,
        ..Default::default()
    };
    let session = session_with(&transport, Some(KEY), config).await;

    let result = session
        .execute(ExecuteRequest::new("deposit").value("2.000001"))
        .await
        .unwrap();
    assert_eq!(result.transaction().unwrap().record().value, U256::from(2_000_001u64));
}

#[tokio::test]
async fn test_value_on_non_payable() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    let err = session
        .execute(ExecuteRequest::new("transfer").param(RECIPIENT).param("1").value("1"))
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::NotPayableMethodWithValue(m) if m == "transfer(address,uint256)"));
    assert!(transport.requests_for("eth_call").is_empty());
}

// ==================== Parameters ====================

#[tokio::test]
async fn test_arity_is_checked_before_network() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;
    transport.clear_responses();

    for supplied in [0usize, 1, 3, 4] {
        let params: Vec<Value> = vec![json!("1"); supplied];
        let err = session
            .execute(ExecuteRequest::new("transfer").params(params))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SdkError::InvalidParameterCount { expected: 2, actual } if actual == supplied
        ));
    }
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_every_type_violation_is_reported() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    let err = session
        .execute(ExecuteRequest::new("transfer").param(7).param(true))
        .await
        .unwrap_err();
    let violations = err.violations();
    assert!(violations.len() >= 2);
    assert!(violations
        .iter()
        .any(|e| matches!(e, SdkError::InvalidParamType { name, .. } if name == "to")));
}

#[tokio::test]
async fn test_not_big_numberish() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    let err = session
        .execute(ExecuteRequest::new("transfer").param(RECIPIENT).param("ten"))
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::NotBigNumberish(name) if name == "amount"));
}

// ==================== Overrides ====================

#[tokio::test]
async fn test_overrides_reach_the_transaction() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    let result = session
        .execute(
            ExecuteRequest::new("setFlag").param(true).overrides(
                Overrides::default()
                    .gas_limit(90_000)
                    .nonce("7")
                    .max_fee_per_gas("5000000000")
                    .max_priority_fee_per_gas(2_000_000_000u64),
            ),
        )
        .await
        .unwrap();

    let record = result.transaction().unwrap().record();
    assert_eq!(record.gas_limit, 90_000);
    assert_eq!(record.nonce, 7);
    assert_eq!(
        record.fees,
        FeeFields::Eip1559 {
            max_fee_per_gas: 5_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        }
    );
    assert!(transport.requests_for("eth_estimateGas").is_empty());
}

#[tokio::test]
async fn test_non_integral_override() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    let err = session
        .execute(
            ExecuteRequest::new("setFlag")
                .param(true)
                .overrides(Overrides::default().gas_limit("21000.5")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::InvalidParameter(field) if field == "gasLimit"));
}

#[tokio::test]
async fn test_eip1559_override_on_legacy_chain() {
    let transport = MockTransport::new();
    // No base fee: the endpoint is a legacy chain
    transport.set_response("eth_getBlockByNumber", json!({ "number": "0x100" }));
    let session = signing_session(&transport).await;

    let err = session
        .execute(
            ExecuteRequest::new("setFlag")
                .param(true)
                .overrides(Overrides::default().max_priority_fee_per_gas(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::ParameterNotSupportedOnLegacyChain(field) if field == "maxPriorityFeePerGas"
    ));

    let result = session
        .execute(
            ExecuteRequest::new("setFlag")
                .param(true)
                .overrides(Overrides::default().gas_price(3_000_000_000u64)),
        )
        .await
        .unwrap();
    assert_eq!(
        result.transaction().unwrap().record().fees,
        FeeFields::Legacy {
            gas_price: 3_000_000_000
        }
    );
}

#[tokio::test]
async fn test_mixed_fee_styles_drop_gas_price() {
    let transport = MockTransport::new();
    let session = signing_session(&transport).await;

    let result = session
        .execute(
            ExecuteRequest::new("setFlag").param(true).overrides(
                Overrides::default()
                    .gas_price(9)
                    .max_fee_per_gas(4_000_000_000u64)
                    .max_priority_fee_per_gas(1_000_000_000u64),
            ),
        )
        .await
        .unwrap();
    assert!(result.transaction().unwrap().record().fees.is_eip1559());
}
