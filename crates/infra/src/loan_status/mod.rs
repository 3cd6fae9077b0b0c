//! Read-only view of the live loan state (credit score, principal, repaid).
//!
//! The ledger never derives the outstanding balance from history; it asks
//! this collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use loanledger_core::from_base_units;

mod fixed;
mod http;

pub use fixed::StaticLoanStatus;
pub use http::HttpLoanStatusClient;

/// Current loan state, amounts in raw base units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanStatusSnapshot {
    #[serde(default)]
    pub credit_score: u16,
    pub repaid: u64,
    pub principal: u64,
    #[serde(default)]
    pub total_borrowed: u64,
    #[serde(default)]
    pub total_repaid: u64,
}

impl LoanStatusSnapshot {
    /// `max(principal - repaid, 0)` in currency units.
    pub fn outstanding_balance(&self) -> Decimal {
        from_base_units(self.principal.saturating_sub(self.repaid))
    }
}

#[derive(Debug, Error)]
pub enum LoanStatusError {
    #[error("loan status unavailable: {0}")]
    Unavailable(String),

    #[error("invalid loan status response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait LoanStatusSource: Send + Sync {
    async fn loan_status(&self) -> Result<LoanStatusSnapshot, LoanStatusError>;
}

#[async_trait]
impl<S> LoanStatusSource for Arc<S>
where
    S: LoanStatusSource + ?Sized,
{
    async fn loan_status(&self) -> Result<LoanStatusSnapshot, LoanStatusError> {
        (**self).loan_status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outstanding_balance_never_goes_negative() {
        let s = LoanStatusSnapshot {
            repaid: 120_000_000,
            principal: 100_000_000,
            ..Default::default()
        };
        assert_eq!(s.outstanding_balance(), Decimal::ZERO);
    }

    #[test]
    fn outstanding_balance_in_currency_units() {
        let s = LoanStatusSnapshot {
            repaid: 30_000_000,
            principal: 100_500_000,
            ..Default::default()
        };
        assert_eq!(s.outstanding_balance(), Decimal::new(705, 1));
    }

    #[test]
    fn parses_collaborator_payload() {
        let s: LoanStatusSnapshot = serde_json::from_str(
            r#"{"creditScore":712,"repaid":5000000,"principal":50000000,"totalBorrowed":50000000,"totalRepaid":5000000}"#,
        )
        .unwrap();
        assert_eq!(s.credit_score, 712);
        assert_eq!(s.outstanding_balance(), Decimal::from(45));
    }
}
