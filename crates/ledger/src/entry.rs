use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loanledger_core::{Currency, DomainError, LoanId, TxSignature};

/// Closed set of ledger transaction types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    LoanCreated,
    PaymentReceived,
    LoanRepaid,
    LoanForgiven,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::LoanCreated,
        TransactionType::PaymentReceived,
        TransactionType::LoanRepaid,
        TransactionType::LoanForgiven,
    ];

    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::LoanCreated => "LOAN_CREATED",
            TransactionType::PaymentReceived => "PAYMENT_RECEIVED",
            TransactionType::LoanRepaid => "LOAN_REPAID",
            TransactionType::LoanForgiven => "LOAN_FORGIVEN",
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown transaction type '{s}'")))
    }
}

/// Event-specific auxiliary fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_score_before: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_score_after: Option<u16>,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_principal: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_number: Option<u32>,
}

impl EntryMetadata {
    /// Score change when both sides are known.
    pub fn credit_score_delta(&self) -> Option<i32> {
        match (self.credit_score_before, self.credit_score_after) {
            (Some(before), Some(after)) => Some(i32::from(after) - i32::from(before)),
            _ => None,
        }
    }
}

/// The canonical, immutable record of one financial event.
///
/// The serialized shape (camelCase field names, `amount` as a JSON number,
/// `timestamp` as unix milliseconds) is the storage and wire contract shared
/// with the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub transaction_type: TransactionType,
    pub loan_id: LoanId,
    /// Currency units (never raw chain units).
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: Currency,
    pub debit_account: String,
    pub credit_account: String,
    pub metadata: EntryMetadata,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub signature: TxSignature,
}

/// `(signature, transactionType)`: at most one entry per key is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdempotencyKey {
    pub signature: TxSignature,
    pub transaction_type: TransactionType,
}

impl LedgerEntry {
    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey {
            signature: self.signature.clone(),
            transaction_type: self.transaction_type,
        }
    }

    pub fn is_payment(&self) -> bool {
        self.transaction_type == TransactionType::PaymentReceived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> LedgerEntry {
        LedgerEntry {
            transaction_type: TransactionType::PaymentReceived,
            loan_id: LoanId::new(12),
            amount: Decimal::new(5, 0),
            currency: Currency::Usdc,
            debit_account: "CASH-USDC".into(),
            credit_account: "LOAN_PAYABLE-FOUNDER".into(),
            metadata: EntryMetadata {
                credit_score_before: Some(700),
                credit_score_after: Some(710),
                remaining_principal: Decimal::new(955, 1),
                payment_number: None,
            },
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            signature: TxSignature::new("5sig").unwrap(),
        }
    }

    #[test]
    fn serializes_to_ledger_wire_shape() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            v,
            json!({
                "transactionType": "PAYMENT_RECEIVED",
                "loanId": 12,
                "amount": 5.0,
                "currency": "USDC",
                "debitAccount": "CASH-USDC",
                "creditAccount": "LOAN_PAYABLE-FOUNDER",
                "metadata": {
                    "creditScoreBefore": 700,
                    "creditScoreAfter": 710,
                    "remainingPrincipal": 95.5
                },
                "timestamp": 1_700_000_000_123i64,
                "signature": "5sig"
            })
        );
    }

    #[test]
    fn deserializes_entries_returned_by_ledger_service() {
        let entry: LedgerEntry = serde_json::from_value(json!({
            "transactionType": "LOAN_REPAID",
            "loanId": 4,
            "amount": 100,
            "currency": "USDC",
            "debitAccount": "LOAN_SETTLED-FOUNDER",
            "creditAccount": "LOAN_PAYABLE-FOUNDER",
            "metadata": { "remainingPrincipal": 0 },
            "timestamp": 1_700_000_000_000i64,
            "signature": "abc"
        }))
        .unwrap();
        assert_eq!(entry.transaction_type, TransactionType::LoanRepaid);
        assert_eq!(entry.metadata.credit_score_delta(), None);
        assert_eq!(entry.amount, Decimal::from(100));
    }

    #[test]
    fn transaction_type_parses_its_wire_name() {
        for ty in TransactionType::ALL {
            assert_eq!(ty.as_str().parse::<TransactionType>().unwrap(), ty);
        }
        assert!("LOAN_DEFAULTED".parse::<TransactionType>().is_err());
    }

    #[test]
    fn score_delta_can_be_negative() {
        let mut e = sample();
        e.metadata.credit_score_before = Some(710);
        e.metadata.credit_score_after = Some(705);
        assert_eq!(e.metadata.credit_score_delta(), Some(-5));
    }
}
