use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::runtime::Handle;
use uuid::Uuid;

use loanledger_core::SystemClock;
use loanledger_events::{DecoderRegistry, EventBus, InMemoryBusError, InMemoryEventBus, RawLogBatch};
use loanledger_infra::{
    config::{AppConfig, StoreBackend},
    ledger_store::{
        HttpLedgerStore, InMemoryLedgerStore, LedgerStore, LedgerStoreError, PostgresLedgerStore,
    },
    loan_status::{HttpLoanStatusClient, LoanStatusError, LoanStatusSource, StaticLoanStatus},
    recorder::{LoanLedgerRecorder, TimestampSource},
    reporter::{LedgerReporter, LoanReport, ReportError},
    retry::RetryPolicy,
    workers::{SubscriptionWorker, WorkerHandle},
};
use loanledger_ledger::LedgerEntry;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("ledger store setup failed: {0}")]
    Store(#[from] LedgerStoreError),

    #[error("loan status client setup failed: {0}")]
    LoanStatus(#[from] LoanStatusError),

    #[error("services must be built inside a tokio runtime")]
    NoRuntime,

    #[error("failed to start recorder worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// Everything the HTTP handlers need, shared behind an `Arc`.
pub struct AppServices {
    bus: Arc<InMemoryEventBus<RawLogBatch>>,
    reporter: LedgerReporter,
    worker: Mutex<Option<WorkerHandle>>,
}

impl AppServices {
    /// Hand a log batch to the recorder. Returns the delivery id.
    pub fn publish(&self, batch: RawLogBatch) -> Result<Uuid, InMemoryBusError> {
        let delivery_id = batch.delivery_id();
        self.bus.publish(batch)?;
        Ok(delivery_id)
    }

    pub async fn entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, ReportError> {
        self.reporter.entries(start, end).await
    }

    pub async fn loan_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<LoanReport, ReportError> {
        self.reporter.generate_report(start, end).await
    }

    /// Stop the recorder worker (idempotent).
    pub fn shutdown(&self) {
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(h) = handle {
            h.shutdown();
        }
    }
}

/// Wire stores, collaborator, recorder, reporter and worker from configuration.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    let store: Arc<dyn LedgerStore> = match &config.store {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory ledger store; entries are lost on restart");
            Arc::new(InMemoryLedgerStore::new())
        }
        StoreBackend::Postgres { database_url } => {
            let pg = PostgresLedgerStore::connect(database_url, 10).await?;
            pg.ensure_schema().await?;
            Arc::new(pg)
        }
        StoreBackend::Http { base_url } => {
            Arc::new(HttpLedgerStore::new(base_url.clone(), config.http_timeout)?)
        }
    };

    let loan_status: Arc<dyn LoanStatusSource> = match &config.loan_status_url {
        Some(url) => Arc::new(HttpLoanStatusClient::new(url.clone(), config.http_timeout)?),
        None => {
            tracing::warn!("LOAN_STATUS_URL not set; outstanding balance will report 0");
            Arc::new(StaticLoanStatus::zero())
        }
    };

    let retry = RetryPolicy::default().with_max_attempts(config.retry_max_attempts);
    build_services_with(store, loan_status, config.timestamp_source, retry)
}

/// Wire services around explicit collaborators (tests, embedding).
///
/// Must be called from within a tokio runtime; the recorder worker runs its
/// async store calls on it.
pub fn build_services_with(
    store: Arc<dyn LedgerStore>,
    loan_status: Arc<dyn LoanStatusSource>,
    timestamp_source: TimestampSource,
    retry: RetryPolicy,
) -> Result<AppServices, ServicesError> {
    let runtime = Handle::try_current().map_err(|_| ServicesError::NoRuntime)?;
    let bus: Arc<InMemoryEventBus<RawLogBatch>> = Arc::new(InMemoryEventBus::new());

    let recorder = Arc::new(LoanLedgerRecorder::new(
        DecoderRegistry::with_defaults(),
        store.clone(),
        Arc::new(SystemClock),
        timestamp_source,
    ));
    let worker =
        SubscriptionWorker::spawn("ledger.recorder", bus.clone(), runtime, recorder, retry)?;

    Ok(AppServices {
        bus,
        reporter: LedgerReporter::new(store, loan_status),
        worker: Mutex::new(Some(worker)),
    })
}
