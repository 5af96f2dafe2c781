//! Contract session: a connector, a bound contract and its ABI as one unit

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vela_abi::{implements_function, validate_abi, Abi, Address, Fragment, Standard};

use crate::client::parse_address;
use crate::config::SessionConfig;
use crate::connector::Connector;
use crate::events::{spawn_relay, LogSubscription, SessionListener};
use crate::transport::Transport;
use crate::SdkError;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not bound
    Inactive,
    /// `activate` is in flight
    Activating,
    /// Bound and executable
    Active,
}

/// How a session reaches the chain
pub enum Connection {
    /// An already active connector
    Connector(Arc<Connector>),
    /// A JSON-RPC endpoint; a connector is built and activated for it
    #[cfg(feature = "http")]
    Endpoint {
        /// Endpoint URL
        url: String,
        /// Hex private key; without one the session is read-only
        private_key: Option<String>,
    },
    /// A custom transport; a connector is built and activated for it
    Transport {
        /// Transport to use
        transport: Arc<dyn Transport>,
        /// Hex private key; without one the session is read-only
        private_key: Option<String>,
    },
}

/// Arguments of [`ContractSession::activate`]
pub struct ActivateOptions {
    /// Contract address (0x hex)
    pub address: String,
    /// Contract ABI
    pub abi: Abi,
    /// Chain connection
    pub connection: Connection,
}

/// Everything bound by a successful activation
pub(crate) struct Binding {
    pub(crate) address: Address,
    pub(crate) abi: Abi,
    pub(crate) dispatch: HashMap<String, Fragment>,
    pub(crate) connector: Arc<Connector>,
    /// Account used as `from` for calls; swapped on account change
    pub(crate) from: RwLock<Option<Address>>,
    events: OnceLock<Vec<Fragment>>,
}

impl Binding {
    fn new(address: Address, abi: Abi, connector: Arc<Connector>) -> Self {
        let mut dispatch = HashMap::new();
        for function in abi.functions() {
            dispatch.insert(function.signature(), function.clone());
            if abi.overloads(function.kind, &function.name).len() == 1 {
                dispatch.insert(function.name.clone(), function.clone());
            }
        }
        let from = RwLock::new(connector.signer_address());
        Self {
            address,
            abi,
            dispatch,
            connector,
            from,
            events: OnceLock::new(),
        }
    }

    pub(crate) fn events(&self) -> &[Fragment] {
        self.events
            .get_or_init(|| self.abi.events().cloned().collect())
    }
}

pub(crate) struct SessionInner {
    pub(crate) standard: Option<Standard>,
    pub(crate) config: SessionConfig,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) binding: RwLock<Option<Arc<Binding>>>,
    pub(crate) listeners: Mutex<Vec<SessionListener>>,
    pub(crate) subscriptions: Mutex<Vec<LogSubscription>>,
    pub(crate) relay: Mutex<Option<JoinHandle<()>>>,
}

impl SessionInner {
    /// Drop the binding and stop background work. Returns the connector and
    /// the log filters still installed on it. The state is left to the caller.
    pub(crate) fn teardown(&self, abort_relay: bool) -> Option<(Arc<Connector>, Vec<String>)> {
        let relay = self.relay.lock().take();
        if let Some(relay) = relay {
            if abort_relay {
                relay.abort();
            }
        }
        // Unbind before draining so a late subscriber sees the binding gone
        let binding = self.binding.write().take();
        let subscriptions: Vec<LogSubscription> = self.subscriptions.lock().drain(..).collect();
        let filter_ids = subscriptions
            .into_iter()
            .map(|sub| {
                sub.task.abort();
                sub.filter_id
            })
            .collect();

        binding.map(|binding| (binding.connector.clone(), filter_ids))
    }
}

/// A contract bound to a connector.
///
/// Cheap to clone; clones share the same binding.
#[derive(Clone)]
pub struct ContractSession {
    pub(crate) inner: Arc<SessionInner>,
}

impl ContractSession {
    /// Generic session: no reference standard is checked
    pub fn new() -> Self {
        Self::with_parts(None, SessionConfig::default())
    }

    /// Session whose ABI must conform to `standard`
    pub fn for_standard(standard: Standard) -> Self {
        Self::with_parts(Some(standard), SessionConfig::default())
    }

    /// Use `config` instead of the defaults
    pub fn with_config(self, config: SessionConfig) -> Self {
        Self::with_parts(self.inner.standard, config)
    }

    fn with_parts(standard: Option<Standard>, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                standard,
                config,
                state: Mutex::new(SessionState::Inactive),
                binding: RwLock::new(None),
                listeners: Mutex::new(Vec::new()),
                subscriptions: Mutex::new(Vec::new()),
                relay: Mutex::new(None),
            }),
        }
    }

    /// Bind the session.
    ///
    /// A supplied connector must already be active. When the session declares
    /// a reference standard the ABI is checked against it. On success the
    /// session relays connector signals and accepts `execute` calls.
    ///
    /// # Errors
    ///
    /// `ActivationInProgress` if another activation is pending. Any other
    /// failure is wrapped in `ActivationFailed` and leaves the session inactive.
    pub async fn activate(&self, options: ActivateOptions) -> Result<(), SdkError> {
        {
            let mut state = self.inner.state.lock();
            if *state == SessionState::Activating {
                return Err(SdkError::ActivationInProgress);
            }
            *state = SessionState::Activating;
        }
        // Falls back to Inactive on every exit that does not complete, including
        // the future being dropped mid-activation
        let guard = ActivationGuard {
            state: &self.inner.state,
            completed: false,
        };

        // Re-activation replaces the previous binding
        if let Some((connector, filters)) = self.inner.teardown(true) {
            uninstall_filters(&connector, filters).await;
        }

        let binding = match self.bind(options).await {
            Ok(binding) => binding,
            Err(e) => {
                warn!(error = %e, "contract session activation failed");
                return Err(e.activation());
            }
        };
        let events = binding.connector.subscribe().map_err(SdkError::activation)?;

        info!(
            address = ?binding.address,
            functions = binding.abi.functions().count(),
            "contract session activated"
        );
        *self.inner.binding.write() = Some(binding);
        *self.inner.relay.lock() = Some(spawn_relay(&self.inner, events));
        guard.complete();
        Ok(())
    }

    async fn bind(&self, options: ActivateOptions) -> Result<Arc<Binding>, SdkError> {
        let address = parse_address(&options.address)?;

        let connector = match options.connection {
            Connection::Connector(connector) => {
                if !connector.is_active() {
                    return Err(SdkError::ProviderNotInitialized);
                }
                connector
            }
            #[cfg(feature = "http")]
            Connection::Endpoint { url, private_key } => {
                activate_new(Connector::http(&url), private_key).await?
            }
            Connection::Transport {
                transport,
                private_key,
            } => activate_new(Connector::new(transport), private_key).await?,
        };

        if let Some(standard) = self.inner.standard {
            validate_abi(&standard.abi()?, &options.abi)?;
        }

        Ok(Arc::new(Binding::new(address, options.abi, connector)))
    }

    /// Unbind the session.
    ///
    /// # Errors
    ///
    /// `ActivationInProgress` while an activation is pending.
    pub async fn deactivate(&self) -> Result<(), SdkError> {
        if *self.inner.state.lock() == SessionState::Activating {
            return Err(SdkError::ActivationInProgress);
        }
        let bound = self.inner.teardown(true);
        *self.inner.state.lock() = SessionState::Inactive;
        if let Some((connector, filters)) = bound {
            uninstall_filters(&connector, filters).await;
            info!("contract session deactivated");
        }
        Ok(())
    }

    /// Lifecycle state
    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    /// Reference standard, if any
    pub fn standard(&self) -> Option<Standard> {
        self.inner.standard
    }

    /// Session settings
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// `None` while unbound, otherwise whether the connector lacks a signer
    pub fn is_readonly(&self) -> Option<bool> {
        self.inner
            .binding
            .read()
            .as_ref()
            .map(|b| b.connector.is_read_only())
    }

    /// Bound contract address
    pub fn address(&self) -> Option<Address> {
        self.inner.binding.read().as_ref().map(|b| b.address)
    }

    /// Bound connector
    pub fn connector(&self) -> Option<Arc<Connector>> {
        self.inner.binding.read().as_ref().map(|b| b.connector.clone())
    }

    /// Events declared by the bound ABI, computed on first access
    pub fn contract_events(&self) -> Result<Vec<Fragment>, SdkError> {
        Ok(self.binding()?.events().to_vec())
    }

    /// Whether the bound ABI declares `name`, optionally with exactly `param_types`
    pub fn implements_function(&self, name: &str, param_types: Option<&[&str]>) -> bool {
        match self.inner.binding.read().as_ref() {
            Some(binding) => implements_function(&binding.abi, name, param_types),
            None => false,
        }
    }

    pub(crate) fn binding(&self) -> Result<Arc<Binding>, SdkError> {
        if *self.inner.state.lock() != SessionState::Active {
            return Err(SdkError::SdkNotInitialized);
        }
        self.inner
            .binding
            .read()
            .clone()
            .ok_or(SdkError::SdkNotInitialized)
    }
}

impl Default for ContractSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContractSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractSession")
            .field("state", &self.state())
            .field("standard", &self.inner.standard)
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

struct ActivationGuard<'a> {
    state: &'a Mutex<SessionState>,
    completed: bool,
}

impl ActivationGuard<'_> {
    fn complete(mut self) {
        *self.state.lock() = SessionState::Active;
        self.completed = true;
    }
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            *self.state.lock() = SessionState::Inactive;
        }
    }
}

async fn activate_new(
    connector: Connector,
    private_key: Option<String>,
) -> Result<Arc<Connector>, SdkError> {
    let connector = match private_key {
        Some(key) => connector.with_private_key(&key)?,
        None => connector,
    };
    connector.activate().await?;
    Ok(Arc::new(connector))
}

pub(crate) async fn uninstall_filters(connector: &Connector, filters: Vec<String>) {
    for id in filters {
        if let Err(e) = connector.client().uninstall_filter(&id).await {
            warn!(filter = %id, error = %e, "failed to uninstall log filter");
        }
    }
}
