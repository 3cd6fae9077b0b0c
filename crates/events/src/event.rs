//! Events emitted by the founder-loan program.
//!
//! Field names follow the JSON payload the program logs (camelCase). All
//! amounts are raw chain base units; conversion happens when posting to the
//! ledger, never here.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use loanledger_core::LoanId;

/// Recognized event kinds, keyed by the marker that appears in a log line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    LoanCreated,
    PaymentMade,
    LoanRepaid,
    LoanForgiven,
    /// Revenue-share repayment taken automatically by the program.
    AutoRepayment,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::LoanCreated,
        EventKind::PaymentMade,
        EventKind::LoanRepaid,
        EventKind::LoanForgiven,
        EventKind::AutoRepayment,
    ];

    /// Marker text searched for in log lines.
    pub fn marker(&self) -> &'static str {
        match self {
            EventKind::LoanCreated => "LoanCreated",
            EventKind::PaymentMade => "PaymentMade",
            EventKind::LoanRepaid => "LoanRepaid",
            EventKind::LoanForgiven => "LoanForgiven",
            EventKind::AutoRepayment => "AutoRepayment",
        }
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.marker())
    }
}

/// Loan status as reported by the program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Active,
    Repaid,
    Defaulted,
    Forgiven,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanCreated {
    pub loan_id: LoanId,
    #[serde(default)]
    pub borrower: Option<String>,
    #[serde(default)]
    pub lender: Option<String>,
    pub principal: u64,
    #[serde(default)]
    pub repayment_percentage: Option<u16>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMade {
    pub loan_id: LoanId,
    pub amount: u64,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub old_credit_score: Option<u16>,
    #[serde(default)]
    pub new_credit_score: Option<u16>,
    pub remaining_principal: u64,
    #[serde(default)]
    pub payment_number: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRepaid {
    pub loan_id: LoanId,
    #[serde(default)]
    pub borrower: Option<String>,
    pub total_repaid: u64,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanForgiven {
    pub loan_id: LoanId,
    pub forgiven_amount: u64,
    #[serde(default)]
    pub new_status: Option<LoanStatus>,
    #[serde(default)]
    pub remaining_principal: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// `repayment_amount` is the part of `revenue_amount` applied to principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRepayment {
    pub loan_id: LoanId,
    #[serde(default)]
    pub revenue_amount: u64,
    pub repayment_amount: u64,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A decoded, typed loan-program event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanProgramEvent {
    LoanCreated(LoanCreated),
    PaymentMade(PaymentMade),
    LoanRepaid(LoanRepaid),
    LoanForgiven(LoanForgiven),
    AutoRepayment(AutoRepayment),
}

impl LoanProgramEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LoanProgramEvent::LoanCreated(_) => EventKind::LoanCreated,
            LoanProgramEvent::PaymentMade(_) => EventKind::PaymentMade,
            LoanProgramEvent::LoanRepaid(_) => EventKind::LoanRepaid,
            LoanProgramEvent::LoanForgiven(_) => EventKind::LoanForgiven,
            LoanProgramEvent::AutoRepayment(_) => EventKind::AutoRepayment,
        }
    }

    pub fn loan_id(&self) -> LoanId {
        match self {
            LoanProgramEvent::LoanCreated(e) => e.loan_id,
            LoanProgramEvent::PaymentMade(e) => e.loan_id,
            LoanProgramEvent::LoanRepaid(e) => e.loan_id,
            LoanProgramEvent::LoanForgiven(e) => e.loan_id,
            LoanProgramEvent::AutoRepayment(e) => e.loan_id,
        }
    }

    /// Block time carried in the payload, if any (unix seconds).
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        let secs = match self {
            LoanProgramEvent::LoanCreated(e) => e.timestamp,
            LoanProgramEvent::PaymentMade(e) => e.timestamp,
            LoanProgramEvent::LoanRepaid(e) => e.timestamp,
            LoanProgramEvent::LoanForgiven(e) => e.timestamp,
            LoanProgramEvent::AutoRepayment(e) => e.timestamp,
        }?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

impl From<LoanCreated> for LoanProgramEvent {
    fn from(value: LoanCreated) -> Self {
        LoanProgramEvent::LoanCreated(value)
    }
}

impl From<PaymentMade> for LoanProgramEvent {
    fn from(value: PaymentMade) -> Self {
        LoanProgramEvent::PaymentMade(value)
    }
}

impl From<LoanRepaid> for LoanProgramEvent {
    fn from(value: LoanRepaid) -> Self {
        LoanProgramEvent::LoanRepaid(value)
    }
}

impl From<LoanForgiven> for LoanProgramEvent {
    fn from(value: LoanForgiven) -> Self {
        LoanProgramEvent::LoanForgiven(value)
    }
}

impl From<AutoRepayment> for LoanProgramEvent {
    fn from(value: AutoRepayment) -> Self {
        LoanProgramEvent::AutoRepayment(value)
    }
}
