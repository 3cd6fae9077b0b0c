//! Durable storage for ledger entries.
//!
//! Every backend enforces the same uniqueness rule: at most one entry per
//! `(signature, transactionType)`. `append` is a single conditional insert, so
//! concurrent writers racing on the same key see exactly one `Inserted`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use loanledger_core::TxSignature;
use loanledger_ledger::{LedgerEntry, ReportWindow, TransactionType};

mod http;
mod in_memory;
mod postgres;

pub use http::HttpLedgerStore;
pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

/// Result of a conditional append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted,
    /// An entry with the same idempotency key already exists; nothing written.
    Duplicate,
}

#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("ledger write failed: {0}")]
    Write(String),

    #[error("ledger read failed: {0}")]
    Read(String),

    /// Stored data could not be turned back into a valid entry.
    #[error("corrupt ledger row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, entry: &LedgerEntry) -> Result<AppendOutcome, LedgerStoreError>;

    /// Entries with `timestamp` in `[start, end)`, ordered by timestamp.
    async fn query(&self, window: &ReportWindow) -> Result<Vec<LedgerEntry>, LedgerStoreError>;

    async fn contains(
        &self,
        signature: &TxSignature,
        transaction_type: TransactionType,
    ) -> Result<bool, LedgerStoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn append(&self, entry: &LedgerEntry) -> Result<AppendOutcome, LedgerStoreError> {
        (**self).append(entry).await
    }

    async fn query(&self, window: &ReportWindow) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        (**self).query(window).await
    }

    async fn contains(
        &self,
        signature: &TxSignature,
        transaction_type: TransactionType,
    ) -> Result<bool, LedgerStoreError> {
        (**self).contains(signature, transaction_type).await
    }
}
