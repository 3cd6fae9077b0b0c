use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use loanledger_core::TxSignature;
use loanledger_ledger::{IdempotencyKey, LedgerEntry, ReportWindow, TransactionType};

use super::{AppendOutcome, LedgerStore, LedgerStoreError};

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<LedgerEntry>,
    keys: HashSet<IdempotencyKey>,
}

/// In-memory ledger for tests/dev and single-process deployments.
///
/// The key check and the insert happen under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored entry in insertion order.
    pub fn all(&self) -> Vec<LedgerEntry> {
        self.inner
            .read()
            .map(|i| i.entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, entry: &LedgerEntry) -> Result<AppendOutcome, LedgerStoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerStoreError::Write("ledger lock poisoned".to_string()))?;

        if !inner.keys.insert(entry.idempotency_key()) {
            return Ok(AppendOutcome::Duplicate);
        }
        inner.entries.push(entry.clone());
        Ok(AppendOutcome::Inserted)
    }

    async fn query(&self, window: &ReportWindow) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerStoreError::Read("ledger lock poisoned".to_string()))?;

        let mut items: Vec<LedgerEntry> = inner
            .entries
            .iter()
            .filter(|e| window.contains(e.timestamp))
            .cloned()
            .collect();
        // Stable: ties keep insertion order.
        items.sort_by_key(|e| e.timestamp);
        Ok(items)
    }

    async fn contains(
        &self,
        signature: &TxSignature,
        transaction_type: TransactionType,
    ) -> Result<bool, LedgerStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerStoreError::Read("ledger lock poisoned".to_string()))?;
        Ok(inner.keys.contains(&IdempotencyKey {
            signature: signature.clone(),
            transaction_type,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use loanledger_core::LoanId;
    use loanledger_events::{LoanProgramEvent, LoanRepaid, PaymentMade};
    use loanledger_ledger::post_event;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn payment_entry(sig: &str, at: DateTime<Utc>) -> LedgerEntry {
        let event = LoanProgramEvent::PaymentMade(PaymentMade {
            loan_id: LoanId::new(1),
            amount: 1_000_000,
            fee: 0,
            old_credit_score: None,
            new_credit_score: None,
            remaining_principal: 0,
            payment_number: None,
            timestamp: None,
        });
        post_event(&event, &TxSignature::new(sig).unwrap(), at)
    }

    #[tokio::test]
    async fn second_append_with_same_key_is_duplicate() {
        let store = InMemoryLedgerStore::new();
        let e = payment_entry("sig-a", t0());

        assert_eq!(store.append(&e).await.unwrap(), AppendOutcome::Inserted);
        assert_eq!(store.append(&e).await.unwrap(), AppendOutcome::Duplicate);
        assert_eq!(store.len(), 1);
        assert!(
            store
                .contains(&e.signature, TransactionType::PaymentReceived)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn same_signature_different_type_are_distinct() {
        let store = InMemoryLedgerStore::new();
        let payment = payment_entry("sig-b", t0());
        let repaid = post_event(
            &LoanProgramEvent::LoanRepaid(LoanRepaid {
                loan_id: LoanId::new(1),
                borrower: None,
                total_repaid: 1_000_000,
                timestamp: None,
            }),
            &payment.signature,
            t0(),
        );

        assert_eq!(store.append(&payment).await.unwrap(), AppendOutcome::Inserted);
        assert_eq!(store.append(&repaid).await.unwrap(), AppendOutcome::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn query_is_half_open_and_ordered() {
        let store = InMemoryLedgerStore::new();
        store.append(&payment_entry("late", t0() + Duration::hours(2))).await.unwrap();
        store.append(&payment_entry("early", t0())).await.unwrap();
        store.append(&payment_entry("at-end", t0() + Duration::hours(3))).await.unwrap();

        let window = ReportWindow::new(t0(), t0() + Duration::hours(3)).unwrap();
        let items = store.query(&window).await.unwrap();
        let sigs: Vec<_> = items.iter().map(|e| e.signature.as_str()).collect();
        assert_eq!(sigs, vec!["early", "late"]);
    }

    #[test]
    fn concurrent_appends_of_one_key_insert_once() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(InMemoryLedgerStore::new());
        let entry = payment_entry("race", t0());

        let outcomes: Vec<AppendOutcome> = rt.block_on(async {
            let mut tasks = Vec::new();
            for _ in 0..16 {
                let store = store.clone();
                let entry = entry.clone();
                tasks.push(tokio::spawn(async move { store.append(&entry).await.unwrap() }));
            }
            let mut out = Vec::new();
            for t in tasks {
                out.push(t.await.unwrap());
            }
            out
        });

        let inserted = outcomes.iter().filter(|o| **o == AppendOutcome::Inserted).count();
        assert_eq!(inserted, 1);
        assert_eq!(store.len(), 1);
    }
}
