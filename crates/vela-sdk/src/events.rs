//! Session signals and contract log subscriptions

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vela_abi::{decode_log, encode_topic, Address, Fragment, FragmentKind, H256};

use crate::connector::{Connector, ConnectorEvent};
use crate::convert::{param_to_token, token_to_value};
use crate::session::{uninstall_filters, Binding, ContractSession, SessionInner, SessionState};
use crate::types::{BlockId, Log, LogFilter};
use crate::validate::param_label;
use crate::SdkError;

/// Connector signal as seen by session listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The signer's account list changed
    AccountChanged(Vec<Address>),
    /// The endpoint switched chains
    ChainChanged(u64),
    /// The endpoint (re)connected
    Connect {
        /// Chain id after connecting
        chain_id: u64,
    },
    /// The endpoint went away; the session is already inactive
    Disconnect {
        /// Reason reported by the bridge
        reason: String,
    },
}

impl SessionEvent {
    /// Stable event name
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::AccountChanged(_) => "AccountChanged",
            SessionEvent::ChainChanged(_) => "ChainChanged",
            SessionEvent::Connect { .. } => "Connect",
            SessionEvent::Disconnect { .. } => "Disconnect",
        }
    }
}

impl From<ConnectorEvent> for SessionEvent {
    fn from(event: ConnectorEvent) -> Self {
        match event {
            ConnectorEvent::AccountsChanged(accounts) => SessionEvent::AccountChanged(accounts),
            ConnectorEvent::ChainChanged(chain_id) => SessionEvent::ChainChanged(chain_id),
            ConnectorEvent::Connect { chain_id } => SessionEvent::Connect { chain_id },
            ConnectorEvent::Disconnect { reason } => SessionEvent::Disconnect { reason },
        }
    }
}

/// Session signal callback
pub type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Contract log callback
pub type EventCallback = Arc<dyn Fn(&DecodedLog) + Send + Sync>;

/// A contract log decoded against its event
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    /// Event signature, e.g. `Transfer(address,address,uint256)`
    pub event: String,
    /// Arguments in declaration order, in the JSON convention used for outputs
    pub values: Vec<Value>,
    /// Arguments by name (`#i` for unnamed ones)
    pub args: Map<String, Value>,
    /// The raw log
    pub log: Log,
}

pub(crate) struct LogSubscription {
    pub(crate) event: String,
    pub(crate) callback: EventCallback,
    pub(crate) filter_id: String,
    pub(crate) task: JoinHandle<()>,
}

/// Argument constraints resolved against an event
#[derive(Debug, Clone)]
struct EventQuery {
    event: Fragment,
    /// `(topic position, expected topic)` for indexed arguments
    topics: Vec<(usize, H256)>,
    /// `(argument index, expected value)` for non-indexed arguments
    values: Vec<(usize, Value)>,
}

impl EventQuery {
    fn build(event: &Fragment, filter: &[(String, Value)]) -> Result<Self, SdkError> {
        let offset = usize::from(!event.anonymous);
        let mut topics = Vec::new();
        let mut values = Vec::new();

        for (name, value) in filter {
            let index = event
                .inputs
                .iter()
                .position(|p| !p.name.is_empty() && p.name == *name)
                .ok_or_else(|| SdkError::InvalidEventParameter(name.clone()))?;
            let param = &event.inputs[index];
            let token = param_to_token(param, value)
                .map_err(|_| SdkError::InvalidEventParameter(name.clone()))?;

            if param.indexed {
                let ordinal = event.inputs[..index].iter().filter(|p| p.indexed).count();
                topics.push((offset + ordinal, encode_topic(&param.kind, &token)?));
            } else {
                values.push((index, token_to_value(&token, &param.kind, &param.components)));
            }
        }

        Ok(Self {
            event: event.clone(),
            topics,
            values,
        })
    }

    /// Node-side filter; non-indexed constraints are applied in [`Self::decode`]
    fn log_filter(&self, address: Address) -> LogFilter {
        let mut positions = Vec::new();
        if !self.event.anonymous {
            positions.push(Some(self.event.topic()));
        }
        for (position, topic) in &self.topics {
            if positions.len() <= *position {
                positions.resize(position + 1, None);
            }
            positions[*position] = Some(*topic);
        }
        LogFilter {
            address: Some(address),
            from_block: None,
            to_block: None,
            topics: positions,
        }
    }

    /// Decode `log`, or `None` if it is not this event or fails a constraint
    fn decode(&self, log: Log) -> Option<DecodedLog> {
        let topics_match = self
            .topics
            .iter()
            .all(|(position, topic)| log.topics.get(*position) == Some(topic));
        if !topics_match {
            return None;
        }

        let tokens = match decode_log(&self.event, &log.topics, &log.data) {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!(event = %self.event.signature(), error = %e, "skipping undecodable log");
                return None;
            }
        };

        let values: Vec<Value> = self
            .event
            .inputs
            .iter()
            .zip(&tokens)
            .map(|(param, token)| {
                // Indexed dynamic arguments arrive as their hash
                if param.indexed && param.kind.is_dynamic() {
                    Value::String(format!("0x{}", hex::encode(token_bytes(token))))
                } else {
                    token_to_value(token, &param.kind, &param.components)
                }
            })
            .collect();

        if !self
            .values
            .iter()
            .all(|(index, expected)| values.get(*index) == Some(expected))
        {
            return None;
        }

        let args = self
            .event
            .inputs
            .iter()
            .enumerate()
            .zip(&values)
            .map(|((i, param), value)| (param_label(&param.name, i), value.clone()))
            .collect();

        Some(DecodedLog {
            event: self.event.signature(),
            values,
            args,
            log,
        })
    }
}

fn token_bytes(token: &vela_abi::Token) -> Vec<u8> {
    match token {
        vela_abi::Token::FixedBytes(bytes) | vela_abi::Token::Bytes(bytes) => bytes.clone(),
        _ => Vec::new(),
    }
}

/// Find the event `name` refers to.
///
/// A bare name shared by several overloads is disambiguated by the filter's
/// parameter names; if that is not enough the caller must pass a signature.
fn resolve_event(
    binding: &Binding,
    name: &str,
    filter: &[(String, Value)],
) -> Result<Fragment, SdkError> {
    if let Some(event) = binding.abi.event(name) {
        return Ok(event.clone());
    }

    let bare = name.split('(').next().unwrap_or(name).trim();
    let overloads = binding.abi.overloads(FragmentKind::Event, bare);
    if overloads.is_empty() {
        return Err(SdkError::InvalidEvent(name.to_string()));
    }
    if name.contains('(') {
        return Err(SdkError::InvalidEvent(name.to_string()));
    }

    let candidates: Vec<&Fragment> = overloads
        .iter()
        .copied()
        .filter(|event| {
            !filter.is_empty()
                && filter
                    .iter()
                    .all(|(arg, _)| event.inputs.iter().any(|p| p.name == *arg))
        })
        .collect();
    match candidates.as_slice() {
        [event] => Ok((*event).clone()),
        _ => {
            let signatures: Vec<String> = overloads.iter().map(|e| e.signature()).collect();
            Err(SdkError::MissingParam(format!(
                "event {} is overloaded; use one of: {}",
                bare,
                signatures.join(", ")
            )))
        }
    }
}

/// Signatures `name` may refer to: one for a signature or a unique name,
/// every overload for a shared bare name
fn event_signatures(binding: &Binding, name: &str) -> Result<Vec<String>, SdkError> {
    if let Some(event) = binding.abi.event(name) {
        return Ok(vec![event.signature()]);
    }
    let overloads = binding.abi.overloads(FragmentKind::Event, name.trim());
    if name.contains('(') || overloads.is_empty() {
        return Err(SdkError::InvalidEvent(name.to_string()));
    }
    Ok(overloads.iter().map(|e| e.signature()).collect())
}

impl ContractSession {
    /// Register a listener for session signals
    pub fn add_listener(&self, listener: SessionListener) {
        self.inner.listeners.lock().push(listener);
    }

    /// Remove a listener registered with [`add_listener`](Self::add_listener)
    pub fn remove_listener(&self, listener: &SessionListener) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_callback(l, listener));
        listeners.len() != before
    }

    /// Watch new logs of event `name`, optionally constrained by argument values.
    ///
    /// `filter` holds `(parameter name, value)` pairs. Indexed arguments are
    /// matched by the node, the rest locally. Subscribing the same callback to
    /// the same event twice is a no-op.
    pub async fn subscribe_to_event(
        &self,
        name: &str,
        callback: EventCallback,
        filter: &[(String, Value)],
    ) -> Result<(), SdkError> {
        let binding = self.binding()?;
        let event = resolve_event(&binding, name, filter)?;
        let signature = event.signature();
        if self
            .inner
            .subscriptions
            .lock()
            .iter()
            .any(|s| s.event == signature && same_callback(&s.callback, &callback))
        {
            return Ok(());
        }

        let query = EventQuery::build(&event, filter)?;
        let filter_id = binding
            .connector
            .client()
            .new_filter(&query.log_filter(binding.address))
            .await?;

        let interval = Duration::from_millis(binding.connector.config().poll_interval_ms.max(1));

        // A deactivation or re-activation may have landed while the filter was installed
        let outcome = {
            let mut subscriptions = self.inner.subscriptions.lock();
            let bound = matches!(self.inner.binding.read().as_ref(), Some(b) if Arc::ptr_eq(b, &binding));
            if !bound {
                Err(SdkError::SdkNotInitialized)
            } else if subscriptions
                .iter()
                .any(|s| s.event == signature && same_callback(&s.callback, &callback))
            {
                Ok(false)
            } else {
                let task = tokio::spawn(poll_filter(
                    binding.connector.clone(),
                    filter_id.clone(),
                    query,
                    callback.clone(),
                    interval,
                ));
                subscriptions.push(LogSubscription {
                    event: signature.clone(),
                    callback,
                    filter_id: filter_id.clone(),
                    task,
                });
                Ok(true)
            }
        };

        match outcome {
            Ok(true) => {
                info!(event = %signature, filter = %filter_id, "subscribed to contract event");
                Ok(())
            }
            other => {
                uninstall_filters(&binding.connector, vec![filter_id]).await;
                other.map(|_| ())
            }
        }
    }

    /// Stop delivering event `name` to `callback`. Returns whether a
    /// subscription was removed.
    ///
    /// A bare overloaded name removes the callback from every overload.
    pub async fn unsubscribe_to_event(
        &self,
        name: &str,
        callback: &EventCallback,
    ) -> Result<bool, SdkError> {
        let binding = self.binding()?;
        let signatures = event_signatures(&binding, name)?;

        let removed: Vec<LogSubscription> = {
            let mut subscriptions = self.inner.subscriptions.lock();
            let (removed, kept) = subscriptions.drain(..).partition(|s| {
                signatures.contains(&s.event) && same_callback(&s.callback, callback)
            });
            *subscriptions = kept;
            removed
        };
        if removed.is_empty() {
            return Ok(false);
        }

        let filters = removed
            .into_iter()
            .map(|s| {
                s.task.abort();
                s.filter_id
            })
            .collect();
        uninstall_filters(&binding.connector, filters).await;
        info!(event = %name, "unsubscribed from contract event");
        Ok(true)
    }

    /// Past logs of event `name` between two blocks (inclusive)
    pub async fn events_between_blocks(
        &self,
        name: &str,
        from_block: BlockId,
        to_block: BlockId,
        filter: &[(String, Value)],
    ) -> Result<Vec<DecodedLog>, SdkError> {
        let binding = self.binding()?;
        let event = resolve_event(&binding, name, filter)?;
        let query = EventQuery::build(&event, filter)?;

        let mut log_filter = query.log_filter(binding.address);
        log_filter.from_block = Some(from_block);
        log_filter.to_block = Some(to_block);

        let logs = binding.connector.client().get_logs(&log_filter).await?;
        Ok(logs
            .into_iter()
            .filter_map(|log| query.decode(log))
            .collect())
    }
}

async fn poll_filter(
    connector: Arc<Connector>,
    filter_id: String,
    query: EventQuery,
    callback: EventCallback,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match connector.client().get_filter_changes(&filter_id).await {
            Ok(logs) => {
                for decoded in logs.into_iter().filter_map(|log| query.decode(log)) {
                    callback(&decoded);
                }
            }
            Err(e) => warn!(filter = %filter_id, error = %e, "log filter poll failed"),
        }
    }
}

fn same_callback<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Forward connector signals to session listeners until the connector
/// disconnects or the session is dropped.
pub(crate) fn spawn_relay(
    inner: &Arc<SessionInner>,
    mut events: broadcast::Receiver<ConnectorEvent>,
) -> JoinHandle<()> {
    let session: Weak<SessionInner> = Arc::downgrade(inner);
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session relay lagged behind connector signals");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Some(inner) = session.upgrade() else {
                break;
            };

            let event = SessionEvent::from(event);
            let disconnected = matches!(event, SessionEvent::Disconnect { .. });
            match &event {
                SessionEvent::AccountChanged(accounts) => {
                    if let Some(binding) = inner.binding.read().as_ref() {
                        *binding.from.write() = accounts.first().copied();
                    }
                }
                SessionEvent::Disconnect { reason } => {
                    info!(%reason, "connector disconnected; deactivating contract session");
                    // The endpoint is gone, so installed filters are abandoned
                    inner.teardown(false);
                    *inner.state.lock() = SessionState::Inactive;
                }
                _ => {}
            }

            let listeners = inner.listeners.lock().clone();
            for listener in listeners {
                listener(&event);
            }
            if disconnected {
                break;
            }
        }
    })
}
