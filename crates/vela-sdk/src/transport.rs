//! Transport layer for RPC communication

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
#[cfg(feature = "http")]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "http")]
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::SdkError;

/// Transport trait for RPC communication (object-safe)
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an RPC request and get JSON response
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        (**self).request_json(method, params).await
    }
}

/// Helper to deserialize response
pub fn deserialize_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SdkError> {
    serde_json::from_value(value).map_err(|e| SdkError::Serialization(e.to_string()))
}

type MockReply = Result<Value, (i64, String)>;

#[derive(Default)]
struct MockState {
    fixed: HashMap<String, MockReply>,
    queued: HashMap<String, VecDeque<MockReply>>,
    requests: Vec<(String, Vec<Value>)>,
}

/// Mock transport for testing.
///
/// Cloning yields a handle onto the same canned responses and request log,
/// so a test can keep one clone after handing the other to a connector.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    defaults: Arc<HashMap<String, Value>>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        let mut defaults = HashMap::new();

        defaults.insert("eth_chainId".to_string(), json!("0x1"));
        defaults.insert("eth_gasPrice".to_string(), json!("0x3b9aca00")); // 1 gwei
        defaults.insert("eth_maxPriorityFeePerGas".to_string(), json!("0x3b9aca00")); // 1 gwei
        defaults.insert(
            "eth_getBlockByNumber".to_string(),
            json!({ "number": "0x100", "baseFeePerGas": "0x3b9aca00" }),
        );
        defaults.insert("eth_blockNumber".to_string(), json!("0x100")); // Block 256
        defaults.insert("eth_getBalance".to_string(), json!("0xde0b6b3a7640000")); // 1 ETH
        defaults.insert("eth_getTransactionCount".to_string(), json!("0x0"));
        defaults.insert("eth_estimateGas".to_string(), json!("0x5208")); // 21000
        defaults.insert(
            "eth_sendRawTransaction".to_string(),
            json!("0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b"),
        );
        defaults.insert(
            "eth_sendTransaction".to_string(),
            json!("0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060"),
        );
        defaults.insert("eth_call".to_string(), json!("0x"));
        defaults.insert("eth_accounts".to_string(), json!([]));
        defaults.insert("eth_requestAccounts".to_string(), json!([]));
        defaults.insert("eth_getLogs".to_string(), json!([]));
        defaults.insert("eth_newFilter".to_string(), json!("0x1"));
        defaults.insert("eth_getFilterChanges".to_string(), json!([]));
        defaults.insert("eth_uninstallFilter".to_string(), json!(true));
        defaults.insert("eth_getTransactionByHash".to_string(), Value::Null);

        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            defaults: Arc::new(defaults),
        }
    }

    /// Set a mock response for a specific method
    pub fn set_response(&self, method: &str, response: Value) {
        self.state
            .lock()
            .fixed
            .insert(method.to_string(), Ok(response));
    }

    /// Make a method fail with an RPC error
    pub fn set_error(&self, method: &str, code: i64, message: &str) {
        self.state
            .lock()
            .fixed
            .insert(method.to_string(), Err((code, message.to_string())));
    }

    /// Queue a one-shot response, served before any fixed response
    pub fn push_response(&self, method: &str, response: Value) {
        self.state
            .lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(Ok(response));
    }

    /// Clear custom responses and the request log
    pub fn clear_responses(&self) {
        *self.state.lock() = MockState::default();
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().requests.clone()
    }

    /// Parameters of every request made to `method`
    pub fn requests_for(&self, method: &str) -> Vec<Vec<Value>> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let reply = {
            let mut state = self.state.lock();
            state.requests.push((method.to_string(), params));
            let queued = state.queued.get_mut(method).and_then(VecDeque::pop_front);
            queued.or_else(|| state.fixed.get(method).cloned())
        };

        match reply {
            Some(Ok(value)) => Ok(value),
            Some(Err((code, message))) => Err(SdkError::Rpc { code, message }),
            None => self.defaults.get(method).cloned().ok_or_else(|| SdkError::Rpc {
                code: -32601,
                message: format!("Method not found: {}", method),
            }),
        }
    }
}

/// Request timeout used by [`HttpTransport::new`]
#[cfg(feature = "http")]
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC 2.0 over HTTP
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Transport for `url` with the default request timeout
    pub fn new(url: &str) -> Self {
        Self::with_timeout(url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Transport for `url` giving up on a request after `timeout`
    pub fn with_timeout(url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(method, id, url = %self.url, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SdkError::Transport(format!("{} answered HTTP {}", self.url, status)));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| SdkError::Transport(format!("malformed JSON-RPC response: {}", e)))?;

        if let Some(error) = body.error {
            tracing::debug!(method, code = error.code, message = %error.message, "rpc error");
            return Err(SdkError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        // Absent result is a legitimate null, e.g. an unknown transaction hash
        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}
