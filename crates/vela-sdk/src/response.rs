//! Transaction response with bound replacement operations

use std::sync::Arc;

use serde_json::{Map, Value};
use vela_abi::Fragment;

use crate::connector::Connector;
use crate::fees::FeeOverride;
use crate::types::TransactionRecord;
use crate::SdkError;

/// A sent transaction together with the connector that sent it.
///
/// `cancel`, `speed_up` and `change` each return a new response for the
/// replacement, so replacements can be chained.
#[derive(Debug, Clone)]
pub struct TransactionResponse {
    record: TransactionRecord,
    connector: Arc<Connector>,
    fragment: Option<Fragment>,
}

impl TransactionResponse {
    /// Wrap a record. `fragment` is needed only for [`change`](Self::change).
    pub fn new(record: TransactionRecord, connector: Arc<Connector>, fragment: Option<Fragment>) -> Self {
        Self {
            record,
            connector,
            fragment,
        }
    }

    /// The transaction
    pub fn record(&self) -> &TransactionRecord {
        &self.record
    }

    /// Consume into the transaction
    pub fn into_record(self) -> TransactionRecord {
        self.record
    }

    /// Function the transaction calls, if known
    pub fn fragment(&self) -> Option<&Fragment> {
        self.fragment.as_ref()
    }

    /// Replace with a zero-value self-transfer
    pub async fn cancel(&self, fee_override: Option<FeeOverride>) -> Result<Self, SdkError> {
        let record = self
            .connector
            .cancel_transaction(&self.record, fee_override)
            .await?;
        Ok(self.successor(record))
    }

    /// Resend with a higher fee
    pub async fn speed_up(&self, fee_override: Option<FeeOverride>) -> Result<Self, SdkError> {
        let record = self
            .connector
            .speed_up_transaction(&self.record, fee_override)
            .await?;
        Ok(self.successor(record))
    }

    /// Resend with arguments replaced by name
    pub async fn change(
        &self,
        new_values: &Map<String, Value>,
        fee_override: Option<FeeOverride>,
    ) -> Result<Self, SdkError> {
        let fragment = self
            .fragment
            .as_ref()
            .ok_or_else(|| SdkError::MissingParam("function fragment of the original call".to_string()))?;
        let record = self
            .connector
            .change_transaction(&self.record, fragment, new_values, fee_override)
            .await?;
        Ok(self.successor(record))
    }

    fn successor(&self, record: TransactionRecord) -> Self {
        Self {
            record,
            connector: self.connector.clone(),
            fragment: self.fragment.clone(),
        }
    }
}
