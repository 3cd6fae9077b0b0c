//! Report windows and pure aggregation over ledger entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loanledger_core::{DomainError, DomainResult};

use crate::entry::LedgerEntry;

/// Half-open time window `[start, end)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ReportWindow {
    /// `start == end` is a valid (empty) window; `start > end` is rejected.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if start > end {
            return Err(DomainError::validation(format!(
                "window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Aggregates over the entries inside one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub total_payments: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_principal_repaid: Decimal,
    /// Mean of `after - before` over payments carrying both scores; 0 when none do.
    pub average_credit_score_change: f64,
    pub credit_score_samples: u64,
}

impl LedgerSummary {
    /// Aggregate the `PAYMENT_RECEIVED` entries of `entries` that fall inside
    /// `window`. Entries outside the window are ignored even if supplied.
    pub fn summarize<'a, I>(window: &ReportWindow, entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut total_payments = 0u64;
        let mut total_principal_repaid = Decimal::ZERO;
        let mut delta_sum = 0i64;
        let mut samples = 0u64;

        for entry in entries
            .into_iter()
            .filter(|e| e.is_payment() && window.contains(e.timestamp))
        {
            total_payments += 1;
            total_principal_repaid += entry.amount;
            if let Some(delta) = entry.metadata.credit_score_delta() {
                delta_sum += i64::from(delta);
                samples += 1;
            }
        }

        let average_credit_score_change = if samples == 0 {
            0.0
        } else {
            delta_sum as f64 / samples as f64
        };

        Self {
            total_payments,
            total_principal_repaid,
            average_credit_score_change,
            credit_score_samples: samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryMetadata, TransactionType};
    use chrono::{Duration, TimeZone};
    use loanledger_core::{Currency, LoanId, TxSignature};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn entry(
        ty: TransactionType,
        amount: i64,
        scores: Option<(u16, u16)>,
        at: DateTime<Utc>,
    ) -> LedgerEntry {
        LedgerEntry {
            transaction_type: ty,
            loan_id: LoanId::new(1),
            amount: Decimal::from(amount),
            currency: Currency::Usdc,
            debit_account: "CASH-USDC".into(),
            credit_account: "LOAN_PAYABLE-FOUNDER".into(),
            metadata: EntryMetadata {
                credit_score_before: scores.map(|s| s.0),
                credit_score_after: scores.map(|s| s.1),
                remaining_principal: Decimal::ZERO,
                payment_number: None,
            },
            timestamp: at,
            signature: TxSignature::new(format!("sig-{amount}-{}", at.timestamp())).unwrap(),
        }
    }

    fn day() -> ReportWindow {
        ReportWindow::new(t0(), t0() + Duration::days(1)).unwrap()
    }

    #[test]
    fn rejects_inverted_window() {
        assert!(ReportWindow::new(t0() + Duration::seconds(1), t0()).is_err());
        assert!(ReportWindow::new(t0(), t0()).is_ok());
    }

    #[test]
    fn window_is_half_open() {
        let w = day();
        assert!(w.contains(t0()));
        assert!(!w.contains(w.end()));
        assert!(!w.contains(t0() - Duration::milliseconds(1)));
    }

    #[test]
    fn sums_payments_and_averages_score_changes() {
        let entries = vec![
            entry(TransactionType::PaymentReceived, 10, Some((700, 710)), t0()),
            entry(
                TransactionType::PaymentReceived,
                20,
                Some((710, 705)),
                t0() + Duration::hours(1),
            ),
        ];
        let s = LedgerSummary::summarize(&day(), &entries);

        assert_eq!(s.total_payments, 2);
        assert_eq!(s.total_principal_repaid, Decimal::from(30));
        assert_eq!(s.average_credit_score_change, 2.5);
        assert_eq!(s.credit_score_samples, 2);
    }

    #[test]
    fn empty_window_reports_zeroes() {
        let s = LedgerSummary::summarize(&day(), std::iter::empty());
        assert_eq!(s.total_payments, 0);
        assert_eq!(s.total_principal_repaid, Decimal::ZERO);
        assert_eq!(s.average_credit_score_change, 0.0);
        assert_eq!(s.credit_score_samples, 0);
    }

    #[test]
    fn non_payment_entries_and_out_of_window_entries_are_ignored() {
        let entries = vec![
            entry(TransactionType::LoanCreated, 500, None, t0()),
            entry(TransactionType::LoanRepaid, 500, None, t0()),
            entry(TransactionType::PaymentReceived, 10, None, t0() + Duration::days(1)),
            entry(TransactionType::PaymentReceived, 7, None, t0()),
        ];
        let s = LedgerSummary::summarize(&day(), &entries);
        assert_eq!(s.total_payments, 1);
        assert_eq!(s.total_principal_repaid, Decimal::from(7));
        assert_eq!(s.credit_score_samples, 0);
        assert_eq!(s.average_credit_score_change, 0.0);
    }

    #[test]
    fn payments_without_scores_count_but_do_not_sample() {
        let entries = vec![
            entry(TransactionType::PaymentReceived, 1, Some((600, 620)), t0()),
            entry(TransactionType::PaymentReceived, 1, None, t0()),
        ];
        let s = LedgerSummary::summarize(&day(), &entries);
        assert_eq!(s.total_payments, 2);
        assert_eq!(s.credit_score_samples, 1);
        assert_eq!(s.average_credit_score_change, 20.0);
    }

    #[test]
    fn serializes_camel_case() {
        let v = serde_json::to_value(LedgerSummary::summarize(&day(), std::iter::empty())).unwrap();
        assert_eq!(v["totalPayments"], 0);
        assert_eq!(v["totalPrincipalRepaid"], 0.0);
        assert_eq!(v["averageCreditScoreChange"], 0.0);
    }

    proptest! {
        #[test]
        fn total_is_sum_of_in_window_payment_amounts(
            amounts in proptest::collection::vec((1i64..1_000_000, 0i64..48), 0..40)
        ) {
            let entries: Vec<_> = amounts
                .iter()
                .map(|(a, h)| {
                    entry(TransactionType::PaymentReceived, *a, None, t0() + Duration::hours(*h))
                })
                .collect();
            let s = LedgerSummary::summarize(&day(), &entries);

            let expected: i64 = amounts.iter().filter(|(_, h)| *h < 24).map(|(a, _)| *a).sum();
            let count = amounts.iter().filter(|(_, h)| *h < 24).count() as u64;
            prop_assert_eq!(s.total_principal_repaid, Decimal::from(expected));
            prop_assert_eq!(s.total_payments, count);
        }

        #[test]
        fn average_lies_between_min_and_max_delta(
            scores in proptest::collection::vec((300u16..900, 300u16..900), 1..30)
        ) {
            let entries: Vec<_> = scores
                .iter()
                .map(|s| entry(TransactionType::PaymentReceived, 1, Some(*s), t0()))
                .collect();
            let s = LedgerSummary::summarize(&day(), &entries);
            let deltas: Vec<i32> =
                scores.iter().map(|(b, a)| i32::from(*a) - i32::from(*b)).collect();
            let min = *deltas.iter().min().unwrap() as f64;
            let max = *deltas.iter().max().unwrap() as f64;
            prop_assert!(s.average_credit_score_change >= min - 1e-9);
            prop_assert!(s.average_credit_score_change <= max + 1e-9);
        }
    }
}
