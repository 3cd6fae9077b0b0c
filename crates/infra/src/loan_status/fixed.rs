use std::sync::RwLock;

use async_trait::async_trait;

use super::{LoanStatusError, LoanStatusSnapshot, LoanStatusSource};

/// Loan status held in memory; for dev setups without a status service and
/// for tests.
#[derive(Debug, Default)]
pub struct StaticLoanStatus {
    snapshot: RwLock<Option<LoanStatusSnapshot>>,
}

impl StaticLoanStatus {
    pub fn new(snapshot: LoanStatusSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
        }
    }

    /// All-zero snapshot.
    pub fn zero() -> Self {
        Self::new(LoanStatusSnapshot::default())
    }

    /// A source that always fails with `Unavailable`.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set(&self, snapshot: LoanStatusSnapshot) {
        if let Ok(mut s) = self.snapshot.write() {
            *s = Some(snapshot);
        }
    }
}

#[async_trait]
impl LoanStatusSource for StaticLoanStatus {
    async fn loan_status(&self) -> Result<LoanStatusSnapshot, LoanStatusError> {
        self.snapshot
            .read()
            .map_err(|_| LoanStatusError::Unavailable("status lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| LoanStatusError::Unavailable("no loan status configured".to_string()))
    }
}
