//! Background workers.

pub mod subscription_worker;

pub use subscription_worker::{SubscriptionWorker, WorkerHandle};
