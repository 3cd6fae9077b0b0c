//! Postgres-backed ledger store.
//!
//! ## Schema
//!
//! One row per entry in `ledger_entries`, with `UNIQUE (signature, transaction_type)`
//! carrying the idempotency rule. Appends are `INSERT ... ON CONFLICT DO NOTHING`,
//! so a duplicate shows up as zero affected rows rather than an error.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerStoreError |
//! |------------|----------------------|------------------|
//! | Database (unique violation) | `23505` | treated as `Duplicate` on append |
//! | Database (other) | Any other | `Write` / `Read` depending on the operation |
//! | PoolClosed, Io, Tls, ... | N/A | `Write` / `Read` |
//! | Row decoding | N/A | `Corrupt` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Row};
use tracing::{Span, instrument};

use loanledger_core::{Currency, LoanId, TxSignature};
use loanledger_ledger::{EntryMetadata, LedgerEntry, ReportWindow, TransactionType};

use super::{AppendOutcome, LedgerStore, LedgerStoreError};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS ledger_entries (
        id               BIGSERIAL PRIMARY KEY,
        signature        TEXT        NOT NULL,
        transaction_type TEXT        NOT NULL,
        loan_id          BIGINT      NOT NULL,
        amount           NUMERIC(38, 6) NOT NULL,
        currency         TEXT        NOT NULL,
        debit_account    TEXT        NOT NULL,
        credit_account   TEXT        NOT NULL,
        metadata         JSONB       NOT NULL,
        recorded_at      TIMESTAMPTZ NOT NULL,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (signature, transaction_type)
    )
"#;

const CREATE_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS ledger_entries_recorded_at_idx
        ON ledger_entries (recorded_at)
"#;

/// Postgres ledger. `Send + Sync`; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, LedgerStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e, LedgerStoreError::Write))?;
        Ok(Self::new(pool))
    }

    /// Create the table and index if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), LedgerStoreError> {
        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e, LedgerStoreError::Write))?;
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(
        skip(self, entry),
        fields(
            signature = %entry.signature,
            transaction_type = %entry.transaction_type,
            loan_id = %entry.loan_id,
            outcome = tracing::field::Empty
        ),
        err
    )]
    async fn append(&self, entry: &LedgerEntry) -> Result<AppendOutcome, LedgerStoreError> {
        let loan_id = i64::try_from(entry.loan_id.get())
            .map_err(|_| {
                LedgerStoreError::Write(format!("loan id {} exceeds BIGINT", entry.loan_id))
            })?;
        let metadata = serde_json::to_value(&entry.metadata)
            .map_err(|e| LedgerStoreError::Write(format!("failed to encode metadata: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                signature,
                transaction_type,
                loan_id,
                amount,
                currency,
                debit_account,
                credit_account,
                metadata,
                recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (signature, transaction_type) DO NOTHING
            "#,
        )
        .bind(entry.signature.as_str())
        .bind(entry.transaction_type.as_str())
        .bind(loan_id)
        .bind(entry.amount)
        .bind(entry.currency.code())
        .bind(&entry.debit_account)
        .bind(&entry.credit_account)
        .bind(metadata)
        .bind(entry.timestamp)
        .execute(&*self.pool)
        .await;

        let outcome = match result {
            Ok(done) if done.rows_affected() == 0 => AppendOutcome::Duplicate,
            Ok(_) => AppendOutcome::Inserted,
            Err(e) if is_unique_violation(&e) => AppendOutcome::Duplicate,
            Err(e) => return Err(map_sqlx_error("append", e, LedgerStoreError::Write)),
        };

        Span::current().record("outcome", tracing::field::debug(outcome));
        Ok(outcome)
    }

    #[instrument(
        skip(self, window),
        fields(
            start = %window.start(),
            end = %window.end(),
            entry_count = tracing::field::Empty
        ),
        err
    )]
    async fn query(&self, window: &ReportWindow) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                signature,
                transaction_type,
                loan_id,
                amount,
                currency,
                debit_account,
                credit_account,
                metadata,
                recorded_at
            FROM ledger_entries
            WHERE recorded_at >= $1 AND recorded_at < $2
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .bind(window.start())
        .bind(window.end())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query", e, LedgerStoreError::Read))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let row = LedgerEntryRow::from_row(&row)
                .map_err(|e| LedgerStoreError::Corrupt(format!("failed to read ledger row: {e}")))?;
            entries.push(LedgerEntry::try_from(row)?);
        }

        Span::current().record("entry_count", entries.len());
        Ok(entries)
    }

    #[instrument(skip(self, signature), fields(signature = %signature), err)]
    async fn contains(
        &self,
        signature: &TxSignature,
        transaction_type: TransactionType,
    ) -> Result<bool, LedgerStoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM ledger_entries
                WHERE signature = $1 AND transaction_type = $2
            ) AS present
            "#,
        )
        .bind(signature.as_str())
        .bind(transaction_type.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("contains", e, LedgerStoreError::Read))?;

        row.try_get("present")
            .map_err(|e| LedgerStoreError::Corrupt(format!("failed to read EXISTS result: {e}")))
    }
}

/// Map SQLx errors into the store error chosen by the caller (`Write` or `Read`).
fn map_sqlx_error(
    operation: &str,
    err: sqlx::Error,
    kind: fn(String) -> LedgerStoreError,
) -> LedgerStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            kind(format!(
                "database error in {operation} (code {code}): {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => kind(format!("connection pool closed in {operation}")),
        sqlx::Error::PoolTimedOut => {
            kind(format!("timed out acquiring a connection in {operation}"))
        }
        other => kind(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

// SQLx row types

#[derive(Debug)]
struct LedgerEntryRow {
    signature: String,
    transaction_type: String,
    loan_id: i64,
    amount: Decimal,
    currency: String,
    debit_account: String,
    credit_account: String,
    metadata: serde_json::Value,
    recorded_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for LedgerEntryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(LedgerEntryRow {
            signature: row.try_get("signature")?,
            transaction_type: row.try_get("transaction_type")?,
            loan_id: row.try_get("loan_id")?,
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            debit_account: row.try_get("debit_account")?,
            credit_account: row.try_get("credit_account")?,
            metadata: row.try_get("metadata")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = LedgerStoreError;

    fn try_from(row: LedgerEntryRow) -> Result<Self, Self::Error> {
        let corrupt =
            |what: &str, detail: String| LedgerStoreError::Corrupt(format!("{what}: {detail}"));

        let signature =
            TxSignature::new(row.signature).map_err(|e| corrupt("signature", e.to_string()))?;
        let transaction_type: TransactionType = row
            .transaction_type
            .parse()
            .map_err(|e: loanledger_core::DomainError| corrupt("transaction_type", e.to_string()))?;
        let loan_id = u64::try_from(row.loan_id)
            .map(LoanId::new)
            .map_err(|_| corrupt("loan_id", row.loan_id.to_string()))?;
        if row.currency != Currency::Usdc.code() {
            return Err(corrupt("currency", row.currency));
        }
        let metadata: EntryMetadata =
            serde_json::from_value(row.metadata).map_err(|e| corrupt("metadata", e.to_string()))?;

        Ok(LedgerEntry {
            transaction_type,
            loan_id,
            amount: row.amount.normalize(),
            currency: Currency::Usdc,
            debit_account: row.debit_account,
            credit_account: row.credit_account,
            metadata,
            timestamp: row.recorded_at,
            signature,
        })
    }
}
