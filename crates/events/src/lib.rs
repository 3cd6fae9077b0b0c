//! Loan-program events, raw log batches, and the plumbing that delivers them.

pub mod bus;
pub mod decoder;
pub mod event;
pub mod in_memory_bus;
pub mod log_batch;

pub use bus::{EventBus, Subscription};
pub use decoder::{DecodeError, DecodedLine, DecoderRegistry, EventDecoder, JsonEventDecoder};
pub use event::{
    AutoRepayment, EventKind, LoanCreated, LoanForgiven, LoanProgramEvent, LoanRepaid, LoanStatus,
    PaymentMade,
};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use log_batch::RawLogBatch;
