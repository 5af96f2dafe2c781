//! Session lifecycle and signal relay tests for vela-sdk

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use vela_abi::{Abi, Address, Standard};
use vela_sdk::{
    ActivateOptions, Connection, Connector, ContractSession, ExecuteRequest, FeeMarket,
    MockTransport, SdkError, SessionEvent, SessionListener, SessionState, Transport, Wallet,
};

const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const CONTRACT: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

fn erc20_abi() -> Abi {
    Standard::Erc20.abi().unwrap()
}

async fn active_connector(transport: &MockTransport) -> Arc<Connector> {
    let connector = Connector::new(transport.clone()).with_private_key(KEY).unwrap();
    connector.activate().await.unwrap();
    Arc::new(connector)
}

fn options(connector: &Arc<Connector>, abi: Abi) -> ActivateOptions {
    ActivateOptions {
        address: CONTRACT.to_string(),
        abi,
        connection: Connection::Connector(connector.clone()),
    }
}

fn recorder() -> (SessionListener, Arc<Mutex<Vec<SessionEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let listener: SessionListener = Arc::new(move |event: &SessionEvent| {
        sink.lock().unwrap().push(event.clone());
    });
    (listener, seen)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Delays every request so activations overlap
struct SlowTransport(MockTransport);

#[async_trait]
impl Transport for SlowTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.0.request_json(method, params).await
    }
}

// ==================== Activation ====================

#[tokio::test]
async fn test_execute_before_activation() {
    let session = ContractSession::new();
    assert_eq!(session.state(), SessionState::Inactive);
    assert_eq!(session.is_readonly(), None);

    let err = session.execute(ExecuteRequest::new("totalSupply")).await.unwrap_err();
    assert!(matches!(err, SdkError::SdkNotInitialized));
}

#[tokio::test]
async fn test_activate_with_active_connector() {
    let transport = MockTransport::new();
    let connector = active_connector(&transport).await;
    let session = ContractSession::for_standard(Standard::Erc20);

    session.activate(options(&connector, erc20_abi())).await.unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.is_readonly(), Some(false));
    assert_eq!(session.address(), Some(vela_sdk::parse_address(CONTRACT).unwrap()));
    assert!(session.implements_function("transfer", Some(&["address", "uint256"])));
    assert_eq!(session.contract_events().unwrap().len(), 2);
}

#[tokio::test]
async fn test_inactive_connector_is_rejected() {
    let connector = Arc::new(Connector::new(MockTransport::new()));
    let session = ContractSession::new();

    let err = session.activate(options(&connector, erc20_abi())).await.unwrap_err();
    match err {
        SdkError::ActivationFailed(cause) => {
            assert!(matches!(*cause, SdkError::ProviderNotInitialized))
        }
        other => panic!("expected ActivationFailed, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Inactive);
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_activation() {
    let transport = MockTransport::new();
    transport.set_error("eth_chainId", -32603, "connection refused");
    let session = ContractSession::new();

    let err = session
        .activate(ActivateOptions {
            address: CONTRACT.to_string(),
            abi: erc20_abi(),
            connection: Connection::Transport {
                transport: Arc::new(transport),
                private_key: None,
            },
        })
        .await
        .unwrap_err();
    match err {
        SdkError::ActivationFailed(cause) => {
            assert!(matches!(*cause, SdkError::ProviderUnavailable(_)))
        }
        other => panic!("expected ActivationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_address_fails_activation() {
    let transport = MockTransport::new();
    let connector = active_connector(&transport).await;
    let session = ContractSession::new();

    let mut opts = options(&connector, erc20_abi());
    opts.address = "0x1234".to_string();
    match session.activate(opts).await.unwrap_err() {
        SdkError::ActivationFailed(cause) => assert!(matches!(*cause, SdkError::InvalidAddress(_))),
        other => panic!("expected ActivationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_conformant_abi_fails_activation() {
    let transport = MockTransport::new();
    let connector = active_connector(&transport).await;
    let session = ContractSession::for_standard(Standard::Erc20);

    let mut declarations: Vec<&str> = Standard::Erc20.declarations().to_vec();
    declarations.retain(|d| !d.contains("allowance"));
    let abi = Abi::from_human_readable(&declarations).unwrap();

    match session.activate(options(&connector, abi.clone())).await.unwrap_err() {
        SdkError::ActivationFailed(cause) => match *cause {
            SdkError::Abi(vela_abi::AbiError::NonConformant(violations)) => {
                assert_eq!(violations.len(), 1)
            }
            other => panic!("expected NonConformant, got {:?}", other),
        },
        other => panic!("expected ActivationFailed, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Inactive);

    // A generic session does not check conformance
    ContractSession::new().activate(options(&connector, abi)).await.unwrap();
}

#[tokio::test]
async fn test_overlapping_activation_fails_fast() {
    let session = ContractSession::new();
    let make = || ActivateOptions {
        address: CONTRACT.to_string(),
        abi: erc20_abi(),
        connection: Connection::Transport {
            transport: Arc::new(SlowTransport(MockTransport::new())),
            private_key: None,
        },
    };

    let (first, second) = tokio::join!(session.activate(make()), session.activate(make()));
    assert!(first.is_ok());
    assert!(matches!(second, Err(SdkError::ActivationInProgress)));
    assert_eq!(session.state(), SessionState::Active);
}

#[tokio::test]
async fn test_deactivate_during_activation() {
    let session = ContractSession::new();
    let opts = ActivateOptions {
        address: CONTRACT.to_string(),
        abi: erc20_abi(),
        connection: Connection::Transport {
            transport: Arc::new(SlowTransport(MockTransport::new())),
            private_key: None,
        },
    };

    let (activated, deactivated) = tokio::join!(session.activate(opts), session.deactivate());
    assert!(activated.is_ok());
    assert!(matches!(deactivated, Err(SdkError::ActivationInProgress)));
}

#[tokio::test]
async fn test_abandoned_activation_resets_state() {
    let session = ContractSession::new();
    let slow = || ActivateOptions {
        address: CONTRACT.to_string(),
        abi: erc20_abi(),
        connection: Connection::Transport {
            transport: Arc::new(SlowTransport(MockTransport::new())),
            private_key: None,
        },
    };

    let abandoned = tokio::time::timeout(Duration::from_millis(5), session.activate(slow())).await;
    assert!(abandoned.is_err());
    assert_eq!(session.state(), SessionState::Inactive);

    session.deactivate().await.unwrap();
    session.activate(slow()).await.unwrap();
    assert_eq!(session.state(), SessionState::Active);
}

#[tokio::test]
async fn test_reactivation_replaces_binding() {
    let transport = MockTransport::new();
    let connector = active_connector(&transport).await;
    let session = ContractSession::new();
    session.activate(options(&connector, erc20_abi())).await.unwrap();

    let other = Abi::from_human_readable(&["function ping() view returns (bool)"]).unwrap();
    session.activate(options(&connector, other)).await.unwrap();
    assert!(session.implements_function("ping", None));
    assert!(!session.implements_function("transfer", None));
}

#[tokio::test]
async fn test_deactivate_unbinds() {
    let transport = MockTransport::new();
    let connector = active_connector(&transport).await;
    let session = ContractSession::new();
    session.activate(options(&connector, erc20_abi())).await.unwrap();

    session.deactivate().await.unwrap();
    assert_eq!(session.state(), SessionState::Inactive);
    assert_eq!(session.is_readonly(), None);
    assert!(matches!(
        session.execute(ExecuteRequest::new("totalSupply")).await,
        Err(SdkError::SdkNotInitialized)
    ));
    // Deactivating twice is harmless
    session.deactivate().await.unwrap();
}

// ==================== Fee market ====================

#[tokio::test]
async fn test_detect_legacy_chain() {
    let transport = MockTransport::new();
    transport.set_response("eth_getBlockByNumber", json!({ "number": "0x1", "baseFeePerGas": null }));
    let connector = active_connector(&transport).await;
    assert_eq!(connector.fee_market(), FeeMarket::Legacy);

    transport.set_response("eth_getBlockByNumber", json!({ "number": "0x2", "baseFeePerGas": "0x7" }));
    assert_eq!(connector.detect_legacy_chain().await.unwrap(), FeeMarket::Eip1559);
}

// ==================== Signal relay ====================

#[tokio::test]
async fn test_signals_are_relayed() {
    let transport = MockTransport::new();
    let connector = active_connector(&transport).await;
    let session = ContractSession::new();
    session.activate(options(&connector, erc20_abi())).await.unwrap();
    let (listener, seen) = recorder();
    session.add_listener(listener);

    transport.set_response("eth_getBlockByNumber", json!({ "number": "0x1" }));
    connector.handle_chain_changed(5).await;
    connector.handle_connect(5);
    settle().await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![SessionEvent::ChainChanged(5), SessionEvent::Connect { chain_id: 5 }]);
    assert_eq!(connector.fee_market(), FeeMarket::Legacy);
}

#[tokio::test]
async fn test_account_change_swaps_signer() {
    let transport = MockTransport::new();
    let connector = active_connector(&transport).await;
    let session = ContractSession::new();
    session.activate(options(&connector, erc20_abi())).await.unwrap();
    let (listener, seen) = recorder();
    session.add_listener(listener);

    let other = Address::repeat_byte(0x42);
    connector.handle_accounts_changed(vec![other]);
    settle().await;

    assert_eq!(seen.lock().unwrap().clone(), vec![SessionEvent::AccountChanged(vec![other])]);
    assert_eq!(connector.signer_address(), Some(other));
    assert_eq!(session.state(), SessionState::Active);

    // Reads now go out from the new account
    transport.set_response("eth_call", json!(format!("0x{}", "00".repeat(32))));
    session.execute(ExecuteRequest::new("totalSupply")).await.unwrap();
    let call = transport.requests_for("eth_call").pop().unwrap();
    assert_eq!(call[0]["from"], json!(vela_sdk::hex_address(&other)));

    // Switching back to the imported key restores local signing
    let wallet = Wallet::from_private_key_hex(KEY).unwrap();
    connector.handle_accounts_changed(vec![wallet.address()]);
    assert!(matches!(connector.signer(), Some(vela_sdk::Signer::Local(_))));
}

#[tokio::test]
async fn test_disconnect_deactivates_session_first() {
    let transport = MockTransport::new();
    let connector = active_connector(&transport).await;
    let session = ContractSession::new();
    session.activate(options(&connector, erc20_abi())).await.unwrap();

    let observed_state = Arc::new(Mutex::new(None));
    let probe = session.clone();
    let state_sink = observed_state.clone();
    session.add_listener(Arc::new(move |event: &SessionEvent| {
        if event.name() == "Disconnect" {
            *state_sink.lock().unwrap() = Some(probe.state());
        }
    }));

    connector.handle_disconnect("bridge closed");
    settle().await;

    assert_eq!(*observed_state.lock().unwrap(), Some(SessionState::Inactive));
    assert_eq!(session.state(), SessionState::Inactive);
    assert!(!connector.is_active());
}

#[tokio::test]
async fn test_removed_listener_is_silent() {
    let transport = MockTransport::new();
    let connector = active_connector(&transport).await;
    let session = ContractSession::new();
    session.activate(options(&connector, erc20_abi())).await.unwrap();
    let (listener, seen) = recorder();
    session.add_listener(listener.clone());

    assert!(session.remove_listener(&listener));
    connector.handle_connect(1);
    settle().await;
    assert!(seen.lock().unwrap().is_empty());
}
