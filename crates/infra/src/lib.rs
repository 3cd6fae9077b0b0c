//! Infrastructure layer: ledger stores, the loan-status collaborator, the
//! recorder and reporter services, background workers, and configuration.

pub mod config;
pub mod ledger_store;
pub mod loan_status;
pub mod recorder;
pub mod reporter;
pub mod retry;
pub mod workers;
