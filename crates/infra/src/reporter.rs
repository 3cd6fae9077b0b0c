//! Windowed loan reports over the ledger plus the live outstanding balance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use loanledger_ledger::{LedgerEntry, LedgerSummary, ReportWindow};

use crate::ledger_store::{LedgerStore, LedgerStoreError};
use crate::loan_status::{LoanStatusError, LoanStatusSource};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanReport {
    pub window: ReportWindow,
    #[serde(flatten)]
    pub summary: LedgerSummary,
    #[serde(with = "rust_decimal::serde::float")]
    pub outstanding_balance: Decimal,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid report window: {0}")]
    InvalidWindow(String),

    #[error(transparent)]
    StoreRead(#[from] LedgerStoreError),

    #[error(transparent)]
    CollaboratorUnavailable(#[from] LoanStatusError),
}

pub struct LedgerReporter {
    store: Arc<dyn LedgerStore>,
    loan_status: Arc<dyn LoanStatusSource>,
}

impl LedgerReporter {
    pub fn new(store: Arc<dyn LedgerStore>, loan_status: Arc<dyn LoanStatusSource>) -> Self {
        Self { store, loan_status }
    }

    /// Validate `[start, end)`.
    pub fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<ReportWindow, ReportError> {
        ReportWindow::new(start, end).map_err(|e| ReportError::InvalidWindow(e.to_string()))
    }

    /// Raw entries in `[start, end)`, ordered by timestamp.
    pub async fn entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, ReportError> {
        let window = Self::window(start, end)?;
        Ok(self.store.query(&window).await?)
    }

    /// Aggregate payments in `[start, end)` and attach the current outstanding balance.
    ///
    /// Read-only; running it twice over an unchanged ledger gives the same result.
    pub async fn generate_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<LoanReport, ReportError> {
        let window = Self::window(start, end)?;

        let (entries, status) =
            tokio::join!(self.store.query(&window), self.loan_status.loan_status());
        let entries = entries?;
        let status = status?;

        Ok(LoanReport {
            window,
            summary: LedgerSummary::summarize(&window, &entries),
            outstanding_balance: status.outstanding_balance(),
        })
    }
}
