//! Loan ledger domain: the canonical entry schema, posting rules that turn
//! loan-program events into entries, and windowed aggregation for reports.

pub mod accounts;
pub mod entry;
pub mod posting;
pub mod report;

pub use accounts::{Account, AccountKind, AccountPair};
pub use entry::{EntryMetadata, IdempotencyKey, LedgerEntry, TransactionType};
pub use posting::post_event;
pub use report::{LedgerSummary, ReportWindow};
