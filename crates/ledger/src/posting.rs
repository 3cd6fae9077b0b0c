//! Posting rules: one decoded loan-program event becomes exactly one entry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use loanledger_core::{Currency, TxSignature, from_base_units};
use loanledger_events::{EventKind, LoanProgramEvent};

use crate::entry::{EntryMetadata, LedgerEntry, TransactionType};

impl From<EventKind> for TransactionType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::LoanCreated => TransactionType::LoanCreated,
            EventKind::PaymentMade => TransactionType::PaymentReceived,
            EventKind::LoanRepaid => TransactionType::LoanRepaid,
            EventKind::LoanForgiven => TransactionType::LoanForgiven,
            // Principal reduction funded from revenue share; books like a payment.
            EventKind::AutoRepayment => TransactionType::PaymentReceived,
        }
    }
}

/// Map an event observed in transaction `signature` to its ledger entry.
///
/// `timestamp` is supplied by the caller; posting itself never reads a clock.
pub fn post_event(
    event: &LoanProgramEvent,
    signature: &TxSignature,
    timestamp: DateTime<Utc>,
) -> LedgerEntry {
    let transaction_type = TransactionType::from(event.kind());
    let accounts = transaction_type.accounts();

    let (amount, metadata) = match event {
        LoanProgramEvent::LoanCreated(e) => (
            e.principal,
            EntryMetadata {
                credit_score_before: None,
                credit_score_after: None,
                remaining_principal: from_base_units(e.principal),
                payment_number: None,
            },
        ),
        LoanProgramEvent::PaymentMade(e) => (
            e.amount,
            EntryMetadata {
                credit_score_before: e.old_credit_score,
                credit_score_after: e.new_credit_score,
                remaining_principal: from_base_units(e.remaining_principal),
                payment_number: e.payment_number,
            },
        ),
        LoanProgramEvent::LoanRepaid(e) => (
            e.total_repaid,
            EntryMetadata {
                credit_score_before: None,
                credit_score_after: None,
                remaining_principal: Decimal::ZERO,
                payment_number: None,
            },
        ),
        LoanProgramEvent::LoanForgiven(e) => (
            e.forgiven_amount,
            EntryMetadata {
                credit_score_before: None,
                credit_score_after: None,
                remaining_principal: e
                    .remaining_principal
                    .map(from_base_units)
                    .unwrap_or(Decimal::ZERO),
                payment_number: None,
            },
        ),
        // The program does not log the principal left after an auto-repayment.
        LoanProgramEvent::AutoRepayment(e) => (
            e.repayment_amount,
            EntryMetadata {
                credit_score_before: None,
                credit_score_after: None,
                remaining_principal: Decimal::ZERO,
                payment_number: None,
            },
        ),
    };

    LedgerEntry {
        transaction_type,
        loan_id: event.loan_id(),
        amount: from_base_units(amount),
        currency: Currency::Usdc,
        debit_account: accounts.debit.code.to_string(),
        credit_account: accounts.credit.code.to_string(),
        metadata,
        timestamp,
        signature: signature.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use loanledger_core::LoanId;
    use loanledger_events::{
        AutoRepayment, LoanCreated, LoanForgiven, LoanRepaid, LoanStatus, PaymentMade,
    };
    use proptest::prelude::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn sig() -> TxSignature {
        TxSignature::new("4vJ9sig").unwrap()
    }

    fn payment(amount: u64) -> PaymentMade {
        PaymentMade {
            loan_id: LoanId::new(7),
            amount,
            fee: 0,
            old_credit_score: Some(700),
            new_credit_score: Some(710),
            remaining_principal: 95_000_000,
            payment_number: Some(1),
            timestamp: None,
        }
    }

    #[test]
    fn payment_made_becomes_payment_received() {
        let entry = post_event(&payment(5_000_000).into(), &sig(), at());

        assert_eq!(entry.transaction_type, TransactionType::PaymentReceived);
        assert_eq!(entry.amount, Decimal::new(5, 0));
        assert_eq!(entry.debit_account, "CASH-USDC");
        assert_eq!(entry.credit_account, "LOAN_PAYABLE-FOUNDER");
        assert_eq!(entry.metadata.credit_score_before, Some(700));
        assert_eq!(entry.metadata.credit_score_after, Some(710));
        assert_eq!(entry.metadata.remaining_principal, Decimal::new(95, 0));
        assert_eq!(entry.metadata.payment_number, Some(1));
        assert_eq!(entry.timestamp, at());
        assert_eq!(entry.signature, sig());
    }

    #[test]
    fn loan_created_starts_with_full_principal_outstanding() {
        let event = LoanCreated {
            loan_id: LoanId::new(1),
            borrower: None,
            lender: None,
            principal: 250_500_000,
            repayment_percentage: Some(20),
            timestamp: None,
        };
        let entry = post_event(&event.into(), &sig(), at());

        assert_eq!(entry.transaction_type, TransactionType::LoanCreated);
        assert_eq!(entry.amount, Decimal::new(2505, 1));
        assert_eq!(entry.metadata.remaining_principal, entry.amount);
        assert_eq!(entry.metadata.credit_score_delta(), None);
    }

    #[test]
    fn loan_repaid_leaves_nothing_outstanding() {
        let event = LoanRepaid {
            loan_id: LoanId::new(1),
            borrower: None,
            total_repaid: 100_000_000,
            timestamp: None,
        };
        let entry = post_event(&event.into(), &sig(), at());

        assert_eq!(entry.transaction_type, TransactionType::LoanRepaid);
        assert_eq!(entry.amount, Decimal::from(100));
        assert_eq!(entry.metadata.remaining_principal, Decimal::ZERO);
    }

    #[test]
    fn loan_forgiven_uses_reported_remaining_principal() {
        let mut event = LoanForgiven {
            loan_id: LoanId::new(2),
            forgiven_amount: 10_000_000,
            new_status: Some(LoanStatus::Active),
            remaining_principal: Some(40_000_000),
            timestamp: None,
        };
        let entry = post_event(&event.clone().into(), &sig(), at());
        assert_eq!(entry.transaction_type, TransactionType::LoanForgiven);
        assert_eq!(entry.debit_account, "LOAN_FORGIVENESS-EXPENSE");
        assert_eq!(entry.metadata.remaining_principal, Decimal::from(40));

        event.remaining_principal = None;
        event.new_status = Some(LoanStatus::Forgiven);
        let entry = post_event(&event.into(), &sig(), at());
        assert_eq!(entry.metadata.remaining_principal, Decimal::ZERO);
    }

    #[test]
    fn auto_repayment_books_repayment_amount_as_payment() {
        let event = AutoRepayment {
            loan_id: LoanId::new(3),
            revenue_amount: 50_000_000,
            repayment_amount: 5_000_000,
            timestamp: Some(1_700_000_000),
        };
        let entry = post_event(&event.into(), &sig(), at());

        assert_eq!(entry.transaction_type, TransactionType::PaymentReceived);
        assert_eq!(entry.amount, Decimal::from(5));
        assert_eq!(entry.debit_account, "CASH-USDC");
        assert_eq!(entry.credit_account, "LOAN_PAYABLE-FOUNDER");
        assert_eq!(entry.metadata.credit_score_delta(), None);
        assert_eq!(entry.metadata.payment_number, None);
    }

    proptest! {
        #[test]
        fn payment_amount_is_base_units_over_scale(raw in 0u64..=u64::MAX / 2) {
            let entry = post_event(&payment(raw).into(), &sig(), at());
            prop_assert_eq!(loanledger_core::to_base_units(entry.amount).unwrap(), raw);
            prop_assert_eq!(entry.currency, Currency::Usdc);
        }
    }
}
