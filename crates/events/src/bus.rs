//! Log-batch publishing/subscription abstraction (mechanics only).
//!
//! The bus is how raw log batches reach the ledger recorder. Whatever talks
//! to the chain (a websocket `logsSubscribe`, an indexer webhook, a replay
//! tool) publishes [`RawLogBatch`](crate::RawLogBatch)es; the subscription
//! worker consumes them.
//!
//! ## Delivery Guarantees
//!
//! - **At-least-once**: a batch may be delivered more than once.
//! - **No ordering across publishers**: batches for different transactions
//!   may arrive in any order.
//! - **No persistence**: the bus distributes, it does not store.
//!
//! Consumers must therefore be idempotent. The recorder achieves this by
//! keying every ledger write on `(signature, transaction type)`.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a message stream.
///
/// Each subscription receives a copy of every message published after it was
/// created (broadcast semantics). Designed for single-threaded consumption.
///
/// ```ignore
/// let subscription = bus.subscribe();
/// loop {
///     match subscription.recv_timeout(Duration::from_millis(250)) {
///         Ok(batch) => recorder_step(batch),
///         Err(RecvTimeoutError::Timeout) => continue,  // check for shutdown
///         Err(RecvTimeoutError::Disconnected) => break, // bus dropped
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Transport-agnostic pub/sub bus.
///
/// `publish()` can fail (closed bus, poisoned lock, remote transport error);
/// failures are surfaced to the publisher, which may retry. Retrying is safe
/// because consumers are idempotent.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
