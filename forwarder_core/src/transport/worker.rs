/**
 * Background worker thread that drains the dispatch queue and forwards
 * each payload to the collector.
 *
 * ```text
 *  ┌──────────────┐    bounded channel    ┌────────────────┐
 *  │  Dispatcher   │ ──── WorkerMsg ─────► │  Worker thread  │
 *  │  (any thread) │                       │  (single)       │
 *  └──────────────┘                       └───────┬────────┘
 *                                                 │
 *                                       Transport::deliver()
 *                                                 │
 *                                          ┌──────▼──────┐
 *                                          │  Collector   │
 *                                          └─────────────┘
 * ```
 *
 * The loop runs until every sender is dropped, which happens when the
 * owning `Dispatcher` is dropped.
 */
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;

use super::http::Transport;
use crate::error::ForwardError;

// ---------------------------------------------------------------------------
// WorkerMsg
// ---------------------------------------------------------------------------

pub enum WorkerMsg {
    /// A serialized JSON body ready to be POSTed.
    Deliver(String),

    /**
     * Flush request. Signalled once every message queued before it has
     * been processed; the channel is FIFO so no extra bookkeeping is needed.
     */
    Flush(Arc<FlushSignal>),
}

// ---------------------------------------------------------------------------
// FlushSignal
// ---------------------------------------------------------------------------

/**
 * Blocks the caller of `flush()` until the worker reaches the matching
 * `Flush` message. `Mutex<bool>` holds the "done" flag, the condvar wakes
 * the waiter.
 */
pub struct FlushSignal {
    mutex: Mutex<bool>,
    condvar: Condvar,
}

impl FlushSignal {
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Marks the flush as complete and wakes every waiter.
    pub fn notify(&self) {
        if let Ok(mut done) = self.mutex.lock() {
            *done = true;
            self.condvar.notify_all();
        }
    }

    /**
     * Waits until `notify` is called or `timeout` elapses.
     *
     * # Returns
     * `true` if the flush completed in time, `false` on timeout or a
     * poisoned lock.
     */
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Ok(guard) = self.mutex.lock() else {
            return false;
        };

        match self.condvar.wait_timeout_while(guard, timeout, |done| !*done) {
            Ok((_, result)) => !result.timed_out(),
            Err(_) => false,
        }
    }
}

impl Default for FlushSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// DeliveryCounters
// ---------------------------------------------------------------------------

/// Outcome counters shared between the dispatcher and its worker.
#[derive(Default)]
pub struct DeliveryCounters {
    pub delivered: AtomicU64,
    pub failed: AtomicU64,
    pub dropped: AtomicU64,
}

impl DeliveryCounters {
    pub fn record(&self, outcome: &Result<(), ForwardError>) {
        let counter = match outcome {
            Ok(()) => &self.delivered,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Everything the worker thread needs to deliver a payload.
pub struct Delivery {
    pub url: String,
    pub bearer: Option<String>,
    pub transport: Transport,
    pub counters: Arc<DeliveryCounters>,
}

impl Delivery {
    fn run(&self, body: &str) {
        let outcome = self.transport.deliver(&self.url, self.bearer.as_deref(), body);

        match &outcome {
            Ok(()) => tracing::debug!(url = %self.url, bytes = body.len(), "result forwarded"),
            Err(err) => tracing::warn!(url = %self.url, error = %err, "failed to forward result"),
        }

        self.counters.record(&outcome);
    }
}

pub struct Worker;

impl Worker {
    /**
     * Spawns the named worker thread.
     *
     * The thread is detached: `Dispatcher::drop` flushes before releasing
     * the sender, which is enough to drain pending payloads.
     */
    pub fn spawn(receiver: Receiver<WorkerMsg>, delivery: Delivery) -> Result<(), ForwardError> {
        thread::Builder::new()
            .name("result-forwarder".into())
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    Self::run_loop(&receiver, &delivery);
                }));

                if result.is_err() {
                    tracing::error!("delivery worker panicked, queued results will be dropped");
                }
            })
            .map(|_| ())
            .map_err(|e| ForwardError::Worker(e.to_string()))
    }

    fn run_loop(receiver: &Receiver<WorkerMsg>, delivery: &Delivery) {
        while let Ok(msg) = receiver.recv() {
            match msg {
                WorkerMsg::Deliver(body) => delivery.run(&body),
                WorkerMsg::Flush(signal) => signal.notify(),
            }
        }
    }
}
