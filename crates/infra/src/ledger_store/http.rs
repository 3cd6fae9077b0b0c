//! Client for an external ledger service.
//!
//! - `POST {base}/entries` with the entry JSON; `409 Conflict` means the key
//!   is already recorded.
//! - `GET {base}/entries?start=&end=` with RFC 3339 bounds; the body is either
//!   a bare array of entries or `{ "items": [...] }`.
//! - `GET {base}/entries/{signature}/{transactionType}`; `404` means absent.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use loanledger_core::TxSignature;
use loanledger_ledger::{LedgerEntry, ReportWindow, TransactionType};

use super::{AppendOutcome, LedgerStore, LedgerStoreError};

#[derive(Debug, Clone)]
pub struct HttpLedgerStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntriesBody {
    Bare(Vec<LedgerEntry>),
    Wrapped { items: Vec<LedgerEntry> },
}

impl HttpLedgerStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerStoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerStoreError::Write(format!("failed to build http client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn entries_url(&self) -> String {
        format!("{}/entries", self.base_url)
    }
}

#[async_trait]
impl LedgerStore for HttpLedgerStore {
    async fn append(&self, entry: &LedgerEntry) -> Result<AppendOutcome, LedgerStoreError> {
        let resp = self
            .client
            .post(self.entries_url())
            .json(entry)
            .send()
            .await
            .map_err(|e| LedgerStoreError::Write(format!("ledger service unreachable: {e}")))?;

        let status = resp.status();
        if status == StatusCode::CONFLICT {
            debug!(signature = %entry.signature, "ledger service reported duplicate entry");
            return Ok(AppendOutcome::Duplicate);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerStoreError::Write(format!(
                "ledger service returned {status}: {body}"
            )));
        }
        Ok(AppendOutcome::Inserted)
    }

    async fn query(&self, window: &ReportWindow) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        let start = window.start().to_rfc3339_opts(SecondsFormat::Millis, true);
        let end = window.end().to_rfc3339_opts(SecondsFormat::Millis, true);

        let resp = self
            .client
            .get(self.entries_url())
            .query(&[("start", start), ("end", end)])
            .send()
            .await
            .map_err(|e| LedgerStoreError::Read(format!("ledger service unreachable: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerStoreError::Read(format!(
                "ledger service returned {status}: {body}"
            )));
        }

        let body: EntriesBody = resp
            .json()
            .await
            .map_err(|e| LedgerStoreError::Corrupt(format!("unexpected entries payload: {e}")))?;
        let mut entries = match body {
            EntriesBody::Bare(items) | EntriesBody::Wrapped { items } => items,
        };

        // The remote side is not trusted to honor the half-open bound or ordering.
        entries.retain(|e| window.contains(e.timestamp));
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }

    async fn contains(
        &self,
        signature: &TxSignature,
        transaction_type: TransactionType,
    ) -> Result<bool, LedgerStoreError> {
        let url = format!("{}/{}/{}", self.entries_url(), signature, transaction_type);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LedgerStoreError::Read(format!("ledger service unreachable: {e}")))?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(LedgerStoreError::Read(format!("ledger service returned {s}"))),
        }
    }
}
