use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use loanledger_events::{EventBus, RawLogBatch, Subscription};

use crate::recorder::LoanLedgerRecorder;
use crate::retry::RetryPolicy;

/// Floor for retry sleeps so a zero-delay policy cannot spin.
const MIN_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    ///
    /// The batch in progress gets one last attempt, then every batch still
    /// queued on the subscription is processed once before the thread exits.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Feeds log batches from the bus into the recorder.
///
/// - Subscribes before the thread starts, so nothing published after
///   `spawn` returns is missed
/// - Processes one batch to completion before taking the next
/// - Retries store-write failures until they succeed; the [`RetryPolicy`]
///   shapes the backoff, and failures past its budget are logged at `error`
/// - Drains the subscription on shutdown
#[derive(Debug)]
pub struct SubscriptionWorker;

enum Flow {
    Continue,
    Stop,
}

impl SubscriptionWorker {
    /// Spawn the worker thread. Async recorder calls run on `runtime`.
    pub fn spawn<B>(
        name: &'static str,
        bus: B,
        runtime: Handle,
        recorder: Arc<LoanLedgerRecorder>,
        retry: RetryPolicy,
    ) -> io::Result<WorkerHandle>
    where
        B: EventBus<RawLogBatch>,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<RawLogBatch> = bus.subscribe();

        let join = thread::Builder::new().name(name.to_string()).spawn(move || {
            worker_loop(name, sub, shutdown_rx, &runtime, &recorder, &retry)
        })?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop(
    name: &'static str,
    sub: Subscription<RawLogBatch>,
    shutdown_rx: mpsc::Receiver<()>,
    runtime: &Handle,
    recorder: &LoanLedgerRecorder,
    retry: &RetryPolicy,
) {
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(batch) => {
                if let Flow::Stop =
                    process_until_recorded(name, &batch, &shutdown_rx, runtime, recorder, retry)
                {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    drain(name, &sub, runtime, recorder);
    debug!(worker = name, "subscription worker stopped");
}

fn process_until_recorded(
    name: &'static str,
    batch: &RawLogBatch,
    shutdown_rx: &mpsc::Receiver<()>,
    runtime: &Handle,
    recorder: &LoanLedgerRecorder,
    retry: &RetryPolicy,
) -> Flow {
    let mut attempt = 0u32;

    loop {
        match runtime.block_on(recorder.process_batch(batch)) {
            Ok(outcome) => {
                debug!(
                    worker = name,
                    signature = %batch.signature(),
                    delivery_id = %batch.delivery_id(),
                    recorded = outcome.recorded,
                    duplicates = outcome.duplicates,
                    parse_failures = outcome.parse_failures.len(),
                    "processed log batch"
                );
                return Flow::Continue;
            }
            Err(err) => {
                attempt = attempt.saturating_add(1);
                let delay = retry.delay_for_attempt(attempt).max(MIN_RETRY_DELAY);

                if retry.should_retry(attempt) {
                    warn!(
                        worker = name,
                        signature = %batch.signature(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "log batch failed, retrying"
                    );
                } else {
                    error!(
                        worker = name,
                        signature = %batch.signature(),
                        delivery_id = %batch.delivery_id(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "log batch still failing past retry budget, retrying"
                    );
                }

                match shutdown_rx.recv_timeout(delay) {
                    Ok(()) => {
                        record_once(name, batch, runtime, recorder);
                        return Flow::Stop;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    // Handle dropped without shutdown: keep working, just wait.
                    Err(RecvTimeoutError::Disconnected) => thread::sleep(delay),
                }
            }
        }
    }
}

/// Process whatever is still queued, one attempt each.
fn drain(
    name: &'static str,
    sub: &Subscription<RawLogBatch>,
    runtime: &Handle,
    recorder: &LoanLedgerRecorder,
) {
    let mut drained = 0usize;
    let mut unrecorded = 0usize;

    while let Ok(batch) = sub.try_recv() {
        if record_once(name, &batch, runtime, recorder) {
            drained += 1;
        } else {
            unrecorded += 1;
        }
    }

    if drained + unrecorded > 0 {
        info!(worker = name, drained, unrecorded, "drained queued log batches");
    }
}

fn record_once(
    name: &'static str,
    batch: &RawLogBatch,
    runtime: &Handle,
    recorder: &LoanLedgerRecorder,
) -> bool {
    match runtime.block_on(recorder.process_batch(batch)) {
        Ok(_) => true,
        Err(err) => {
            error!(
                worker = name,
                signature = %batch.signature(),
                delivery_id = %batch.delivery_id(),
                error = %err,
                "log batch not recorded before shutdown"
            );
            false
        }
    }
}
