use serde::{Deserialize, Serialize};

use crate::entry::TransactionType;

/// High-level account kind (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// A ledger account. `code` is what lands in entries and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Account {
    pub code: &'static str,
    pub kind: AccountKind,
}

pub const CASH_USDC: Account = Account {
    code: "CASH-USDC",
    kind: AccountKind::Asset,
};

pub const LOAN_PAYABLE_FOUNDER: Account = Account {
    code: "LOAN_PAYABLE-FOUNDER",
    kind: AccountKind::Liability,
};

pub const LOAN_SETTLED_FOUNDER: Account = Account {
    code: "LOAN_SETTLED-FOUNDER",
    kind: AccountKind::Equity,
};

pub const LOAN_FORGIVENESS_EXPENSE: Account = Account {
    code: "LOAN_FORGIVENESS-EXPENSE",
    kind: AccountKind::Expense,
};

/// The fixed debit/credit pair posted for a transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountPair {
    pub debit: Account,
    pub credit: Account,
}

impl TransactionType {
    pub fn accounts(&self) -> AccountPair {
        match self {
            TransactionType::LoanCreated => AccountPair {
                debit: LOAN_PAYABLE_FOUNDER,
                credit: CASH_USDC,
            },
            TransactionType::PaymentReceived => AccountPair {
                debit: CASH_USDC,
                credit: LOAN_PAYABLE_FOUNDER,
            },
            TransactionType::LoanRepaid => AccountPair {
                debit: LOAN_SETTLED_FOUNDER,
                credit: LOAN_PAYABLE_FOUNDER,
            },
            TransactionType::LoanForgiven => AccountPair {
                debit: LOAN_FORGIVENESS_EXPENSE,
                credit: LOAN_PAYABLE_FOUNDER,
            },
        }
    }
}
