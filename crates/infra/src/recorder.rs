//! Turns raw log batches into ledger entries.
//!
//! For each log line: classify it against the decoder registry, decode the
//! payload, post the event, and append the entry. Lines that match no marker
//! are skipped silently. Lines that match but fail to decode are logged and
//! reported back; the rest of the batch continues.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use loanledger_core::{Clock, TxSignature};
use loanledger_events::{DecodeError, DecoderRegistry, LoanProgramEvent, RawLogBatch};
use loanledger_ledger::{LedgerEntry, TransactionType, post_event};

use crate::ledger_store::{AppendOutcome, LedgerStore, LedgerStoreError};

/// Which instant becomes an entry's `timestamp`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampSource {
    /// When the recorder processed the line.
    #[default]
    Processing,
    /// The event's block time when present, processing time otherwise.
    Event,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected 'processing' or 'event', got '{0}'")]
pub struct UnknownTimestampSource(pub String);

impl core::str::FromStr for TimestampSource {
    type Err = UnknownTimestampSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processing" => Ok(TimestampSource::Processing),
            "event" => Ok(TimestampSource::Event),
            other => Err(UnknownTimestampSource(other.to_string())),
        }
    }
}

/// A matched line whose payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub line_index: usize,
    pub marker: String,
    pub error: DecodeError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub recorded: usize,
    pub duplicates: usize,
    pub parse_failures: Vec<ParseFailure>,
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to write {transaction_type} entry for {signature}: {source}")]
    StoreWrite {
        signature: TxSignature,
        transaction_type: TransactionType,
        #[source]
        source: LedgerStoreError,
    },
}

pub struct LoanLedgerRecorder {
    registry: DecoderRegistry,
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    timestamp_source: TimestampSource,
}

impl core::fmt::Debug for LoanLedgerRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoanLedgerRecorder")
            .field("registry", &self.registry)
            .field("timestamp_source", &self.timestamp_source)
            .finish_non_exhaustive()
    }
}

impl LoanLedgerRecorder {
    pub fn new(
        registry: DecoderRegistry,
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        timestamp_source: TimestampSource,
    ) -> Self {
        Self {
            registry,
            store,
            clock,
            timestamp_source,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Process every line of `batch` in order.
    ///
    /// The first failed store write stops the batch and is returned; entries
    /// already written stay written, and redelivering the batch is safe
    /// because appends are idempotent.
    pub async fn process_batch(&self, batch: &RawLogBatch) -> Result<BatchOutcome, RecorderError> {
        let signature = batch.signature();
        let mut outcome = BatchOutcome::default();

        for (line_index, line) in batch.logs().iter().enumerate() {
            let Some(decoded) = self.registry.decode_line(line) else {
                continue;
            };

            let event = match decoded.result {
                Ok(event) => event,
                Err(error) => {
                    warn!(
                        %signature,
                        delivery_id = %batch.delivery_id(),
                        marker = %decoded.marker,
                        line_index,
                        %error,
                        "failed to decode loan event"
                    );
                    outcome.parse_failures.push(ParseFailure {
                        line_index,
                        marker: decoded.marker,
                        error,
                    });
                    continue;
                }
            };

            let entry = post_event(&event, signature, self.timestamp_for(&event));
            match self.store.append(&entry).await {
                Ok(AppendOutcome::Inserted) => {
                    log_recorded(&entry);
                    outcome.recorded += 1;
                }
                Ok(AppendOutcome::Duplicate) => {
                    debug!(
                        %signature,
                        transaction_type = %entry.transaction_type,
                        "ledger entry already recorded"
                    );
                    outcome.duplicates += 1;
                }
                Err(source) => {
                    return Err(RecorderError::StoreWrite {
                        signature: signature.clone(),
                        transaction_type: entry.transaction_type,
                        source,
                    });
                }
            }
        }

        Ok(outcome)
    }

    fn timestamp_for(&self, event: &LoanProgramEvent) -> DateTime<Utc> {
        let at = match self.timestamp_source {
            TimestampSource::Event => event.occurred_at().unwrap_or_else(|| self.clock.now()),
            TimestampSource::Processing => self.clock.now(),
        };
        // Entries carry millisecond timestamps on the wire; keep every store consistent.
        DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
    }
}

fn log_recorded(entry: &LedgerEntry) {
    info!(
        signature = %entry.signature,
        transaction_type = %entry.transaction_type,
        loan_id = %entry.loan_id,
        amount = %entry.amount,
        "recorded ledger entry"
    );
}
