use serde::{Deserialize, Serialize};
use uuid::Uuid;

use loanledger_core::TxSignature;

/// The log lines emitted by one on-chain transaction, as delivered by the
/// log subscription.
///
/// Notes:
/// - Delivery is **at-least-once**: the same signature may arrive again, in
///   any order relative to other batches.
/// - `delivery_id` identifies this particular delivery (for log correlation),
///   not the transaction. Two deliveries of one transaction share `signature`
///   but not `delivery_id`.
/// - Consumed once per delivery; nothing retains it after processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogBatch {
    #[serde(default = "Uuid::now_v7")]
    delivery_id: Uuid,
    signature: TxSignature,
    logs: Vec<String>,
}

impl RawLogBatch {
    pub fn new(signature: TxSignature, logs: Vec<String>) -> Self {
        Self {
            delivery_id: Uuid::now_v7(),
            signature,
            logs,
        }
    }

    pub fn delivery_id(&self) -> Uuid {
        self.delivery_id
    }

    pub fn signature(&self) -> &TxSignature {
        &self.signature
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}
