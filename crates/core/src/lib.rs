//! `loanledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod error;
pub mod id;
pub mod units;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{LoanId, TxSignature};
pub use units::{BASE_UNIT_SCALE, Currency, from_base_units, to_base_units};
