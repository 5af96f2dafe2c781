//! Connector: the session with a chain endpoint and an optional signer

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use vela_abi::Address;

use crate::client::RpcClient;
use crate::config::ConnectorConfig;
use crate::fees::FeeMarket;
use crate::transport::Transport;
use crate::tx::TxBuilder;
use crate::types::{BlockId, CallRequest, FeeFields, TransactionRecord};
use crate::{SdkError, Wallet};

/// Capacity of the connector signal channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Who signs transactions sent through a connector
#[derive(Debug, Clone)]
pub enum Signer {
    /// Imported private key; transactions are signed locally
    Local(Arc<Wallet>),
    /// Wallet-granted account; the wallet or node signs
    Remote(Address),
}

impl Signer {
    /// Signing address
    pub fn address(&self) -> Address {
        match self {
            Signer::Local(wallet) => wallet.address(),
            Signer::Remote(address) => *address,
        }
    }
}

/// Low-level connection signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorEvent {
    /// The wallet exposes a different account list
    AccountsChanged(Vec<Address>),
    /// The endpoint switched chains
    ChainChanged(u64),
    /// The endpoint (re)connected
    Connect {
        /// Chain id after connecting
        chain_id: u64,
    },
    /// The endpoint went away
    Disconnect {
        /// Reason reported by the bridge
        reason: String,
    },
}

/// Connector lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    /// Not activated
    Inactive,
    /// Activated and usable
    Active,
}

struct ActiveSession {
    chain_id: u64,
    fee_market: FeeMarket,
    signer: Option<Signer>,
    events: broadcast::Sender<ConnectorEvent>,
}

/// Connection to a chain endpoint, shared as `Arc<Connector>`.
///
/// Holds the chain id, the fee market and the signer once activated. Without a
/// signer the connector is read-only.
pub struct Connector {
    client: RpcClient,
    config: ConnectorConfig,
    wallet: Option<Arc<Wallet>>,
    session: RwLock<Option<ActiveSession>>,
}

impl Connector {
    /// Create a connector over a transport
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_client(RpcClient::with_transport(transport))
    }

    /// Create a connector over an HTTP endpoint
    #[cfg(feature = "http")]
    pub fn http(url: &str) -> Self {
        Self::with_client(RpcClient::http(url))
    }

    /// Create a connector over an existing client
    pub fn with_client(client: RpcClient) -> Self {
        Self {
            client,
            config: ConnectorConfig::default(),
            wallet: None,
            session: RwLock::new(None),
        }
    }

    /// Use `config` instead of the defaults
    pub fn with_config(mut self, config: ConnectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sign locally with `wallet`
    pub fn with_wallet(mut self, wallet: Wallet) -> Self {
        self.wallet = Some(Arc::new(wallet));
        self
    }

    /// Sign locally with a hex private key
    pub fn with_private_key(self, key: &str) -> Result<Self, SdkError> {
        Ok(self.with_wallet(Wallet::from_private_key_hex(key)?))
    }

    // ==================== Lifecycle ====================

    /// Open the session: read the chain id, acquire the signer, then detect the
    /// fee market.
    ///
    /// # Errors
    ///
    /// `ProviderUnavailable` if the endpoint cannot be reached, `NoAccount` if a
    /// wallet account was requested but none could be acquired.
    pub async fn activate(&self) -> Result<(), SdkError> {
        let chain_id = self
            .client
            .chain_id()
            .await
            .map_err(|e| SdkError::ProviderUnavailable(e.to_string()))?;

        let signer = self.acquire_signer().await?;
        // Re-activation keeps the channel so existing subscribers stay attached
        let events = match self.session.read().as_ref() {
            Some(active) => active.events.clone(),
            None => broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
        };

        *self.session.write() = Some(ActiveSession {
            chain_id,
            fee_market: FeeMarket::Unknown,
            signer,
            events,
        });

        if let Err(e) = self.detect_legacy_chain().await {
            *self.session.write() = None;
            return Err(SdkError::ProviderUnavailable(e.to_string()));
        }

        info!(
            chain_id,
            fee_market = ?self.fee_market(),
            read_only = self.is_read_only(),
            "connector activated"
        );
        Ok(())
    }

    async fn acquire_signer(&self) -> Result<Option<Signer>, SdkError> {
        if let Some(wallet) = &self.wallet {
            return Ok(Some(Signer::Local(wallet.clone())));
        }
        if !self.config.request_accounts {
            return Ok(None);
        }
        let accounts = self
            .client
            .request_accounts()
            .await
            .map_err(|e| SdkError::NoAccount(e.to_string()))?;
        match accounts.first() {
            Some(account) => Ok(Some(Signer::Remote(*account))),
            None => Err(SdkError::NoAccount("wallet granted no accounts".to_string())),
        }
    }

    /// Close the session. Signal subscribers see their channel close.
    pub fn deactivate(&self) {
        if self.session.write().take().is_some() {
            info!("connector deactivated");
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectorState {
        if self.session.read().is_some() {
            ConnectorState::Active
        } else {
            ConnectorState::Inactive
        }
    }

    /// Whether the connector is active
    pub fn is_active(&self) -> bool {
        self.state() == ConnectorState::Active
    }

    /// True iff no signer is bound
    pub fn is_read_only(&self) -> bool {
        self.signer().is_none()
    }

    /// Bound signer, if any
    pub fn signer(&self) -> Option<Signer> {
        self.session.read().as_ref().and_then(|s| s.signer.clone())
    }

    /// Address of the bound signer, if any
    pub fn signer_address(&self) -> Option<Address> {
        self.signer().map(|s| s.address())
    }

    /// Chain id, once active
    pub fn chain_id(&self) -> Option<u64> {
        self.session.read().as_ref().map(|s| s.chain_id)
    }

    /// Detected fee market (`Unknown` while inactive)
    pub fn fee_market(&self) -> FeeMarket {
        self.session
            .read()
            .as_ref()
            .map_or(FeeMarket::Unknown, |s| s.fee_market)
    }

    /// Connector settings
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Underlying RPC client
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Probe fee data and set the fee market: a max fee figure means EIP-1559,
    /// its absence means legacy.
    pub async fn detect_legacy_chain(&self) -> Result<FeeMarket, SdkError> {
        self.require_active()?;
        let fees = self.client.fee_data().await?;
        let market = FeeMarket::detect(&fees);
        if let Some(session) = self.session.write().as_mut() {
            session.fee_market = market;
        }
        debug!(?market, "fee market detected");
        Ok(market)
    }

    /// Receive connector signals
    pub fn subscribe(&self) -> Result<broadcast::Receiver<ConnectorEvent>, SdkError> {
        self.session
            .read()
            .as_ref()
            .map(|s| s.events.subscribe())
            .ok_or(SdkError::ProviderNotInitialized)
    }

    pub(crate) fn require_active(&self) -> Result<(), SdkError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SdkError::ProviderNotInitialized)
        }
    }

    pub(crate) fn require_signer(&self, operation: &str) -> Result<Signer, SdkError> {
        self.require_active()?;
        self.signer()
            .ok_or_else(|| SdkError::ReadOnly(operation.to_string()))
    }

    // ==================== Signals ====================

    fn broadcast(&self, event: ConnectorEvent) {
        if let Some(session) = self.session.read().as_ref() {
            // No receivers is fine
            let _ = session.events.send(event);
        }
    }

    /// The wallet's account list changed: rebind the signer, then relay
    pub fn handle_accounts_changed(&self, accounts: Vec<Address>) {
        if let Some(session) = self.session.write().as_mut() {
            session.signer = match (accounts.first(), &self.wallet) {
                (None, _) => None,
                (Some(first), Some(wallet)) if wallet.address() == *first => {
                    Some(Signer::Local(wallet.clone()))
                }
                (Some(first), _) => Some(Signer::Remote(*first)),
            };
        }
        debug!(count = accounts.len(), "accounts changed");
        self.broadcast(ConnectorEvent::AccountsChanged(accounts));
    }

    /// The endpoint switched chains: re-detect the fee market, then relay
    pub async fn handle_chain_changed(&self, chain_id: u64) {
        if let Some(session) = self.session.write().as_mut() {
            session.chain_id = chain_id;
        }
        if let Err(e) = self.detect_legacy_chain().await {
            warn!(error = %e, chain_id, "fee market detection failed after chain change");
        }
        self.broadcast(ConnectorEvent::ChainChanged(chain_id));
    }

    /// The endpoint (re)connected
    pub fn handle_connect(&self, chain_id: u64) {
        if let Some(session) = self.session.write().as_mut() {
            session.chain_id = chain_id;
        }
        self.broadcast(ConnectorEvent::Connect { chain_id });
    }

    /// The endpoint went away: deactivate, then relay to existing subscribers
    pub fn handle_disconnect(&self, reason: impl Into<String>) {
        let session = self.session.write().take();
        if let Some(session) = session {
            info!("connector disconnected");
            let _ = session.events.send(ConnectorEvent::Disconnect {
                reason: reason.into(),
            });
        }
    }

    // ==================== Calls & Transactions ====================

    /// Run `eth_call`, defaulting `from` to the signer
    pub async fn call(&self, mut request: CallRequest) -> Result<Bytes, SdkError> {
        self.require_active()?;
        if request.from.is_none() {
            request.from = self.signer_address();
        }
        self.client.call(&request, BlockId::Latest).await
    }

    /// Sign (or have the wallet sign) and submit a transaction.
    ///
    /// Missing nonce, gas limit and fees are filled in: the pending nonce, a gas
    /// estimate, and fees for the detected fee market. Fields already set are kept.
    pub async fn send_transaction(
        &self,
        mut request: CallRequest,
    ) -> Result<TransactionRecord, SdkError> {
        let signer = self.require_signer("sendTransaction")?;
        let from = signer.address();
        request.from = Some(from);
        let chain_id = self.chain_id().ok_or(SdkError::ProviderNotInitialized)?;

        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => self.client.get_nonce(&from, BlockId::Pending).await?,
        };
        request.nonce = Some(nonce);

        let gas_limit = match request.gas {
            Some(gas) => gas,
            None => self.client.estimate_gas(&request).await?,
        };
        request.gas = Some(gas_limit);

        let fees = self.fill_fees(&request).await?;
        match fees {
            FeeFields::Legacy { gas_price } => {
                request.gas_price = Some(gas_price);
                request.max_fee_per_gas = None;
                request.max_priority_fee_per_gas = None;
            }
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                request.gas_price = None;
                request.max_fee_per_gas = Some(max_fee_per_gas);
                request.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
            }
        }

        let value = request.value.unwrap_or_default();
        let data = request.data.clone().unwrap_or_default();

        let hash = match &signer {
            Signer::Local(wallet) => {
                let mut builder = TxBuilder::new(chain_id)
                    .nonce(nonce)
                    .gas_limit(gas_limit)
                    .fees(fees)
                    .value(value)
                    .data(data.clone());
                if let Some(to) = request.to {
                    builder = builder.to(to);
                }
                let signed = builder.sign(wallet)?;
                self.client.send_raw_transaction(&signed.raw).await?
            }
            Signer::Remote(_) => self.client.send_transaction(&request).await?,
        };
        debug!(hash = ?hash, nonce, "transaction submitted");

        Ok(TransactionRecord {
            hash,
            from,
            to: request.to,
            nonce,
            value,
            data,
            fees,
            gas_limit,
            chain_id,
        })
    }

    async fn fill_fees(&self, request: &CallRequest) -> Result<FeeFields, SdkError> {
        match (
            request.gas_price,
            request.max_fee_per_gas,
            request.max_priority_fee_per_gas,
        ) {
            (_, Some(max_fee), Some(priority)) => {
                return Ok(FeeFields::Eip1559 {
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: priority,
                })
            }
            (Some(gas_price), None, None) => return Ok(FeeFields::Legacy { gas_price }),
            _ => {}
        }

        let data = self.client.fee_data().await?;
        match (self.fee_market(), data.max_fee_per_gas, data.max_priority_fee_per_gas) {
            (FeeMarket::Eip1559, Some(suggested_max), Some(suggested_priority)) => {
                // A lone max fee caps the suggested tip
                let priority = match (request.max_priority_fee_per_gas, request.max_fee_per_gas) {
                    (Some(priority), _) => priority,
                    (None, Some(max_fee)) => suggested_priority.min(max_fee),
                    (None, None) => suggested_priority,
                };
                let max_fee = request
                    .max_fee_per_gas
                    .unwrap_or_else(|| suggested_max.max(priority));
                Ok(FeeFields::Eip1559 {
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: priority,
                })
            }
            _ => {
                let gas_price = match data.gas_price {
                    Some(price) => price,
                    None => self.client.gas_price().await?,
                };
                Ok(FeeFields::Legacy { gas_price })
            }
        }
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("state", &self.state())
            .field("chain_id", &self.chain_id())
            .field("fee_market", &self.fee_market())
            .field("signer", &self.signer_address())
            .finish()
    }
}
