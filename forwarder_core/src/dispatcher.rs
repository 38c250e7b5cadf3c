/**
 * Queued forwarding — hand results to a background worker instead of
 * blocking the caller on the network.
 *
 * Lifecycle:
 * 1. `Dispatcher::start(config, options)` validates the endpoint, builds a
 *    reusable transport and spawns the worker thread.
 * 2. `submit(&payload)` serializes the payload and enqueues it without
 *    blocking.
 * 3. `flush()` waits until everything submitted so far has been attempted.
 * 4. Dropping the `Dispatcher` flushes, then disconnects the worker.
 *
 * Every queued payload gets the same single POST that `send` performs.
 */
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};
use serde::Serialize;
use serde_json::Value;

use crate::error::ForwardError;
use crate::protocol::types::EndpointConfig;
use crate::transport::{Delivery, DeliveryCounters, FlushSignal, Transport, Worker, WorkerMsg};

/// Hook run on every payload before it is queued.
pub type BeforeSend = Arc<dyn Fn(Value) -> Option<Value> + Send + Sync>;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Bounded channel capacity. When full, new payloads are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// How long `flush()` waits for the worker before giving up.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/**
 * Tuning for a `Dispatcher`.
 *
 * # Example
 * ```ignore
 * let options = DispatchOptions {
 *     before_send: Some(Arc::new(|mut payload| {
 *         payload["forwarded"] = true.into();
 *         Some(payload) // return None to drop it
 *     })),
 *     ..Default::default()
 * };
 * ```
 */
#[derive(Clone)]
pub struct DispatchOptions {
    /// Optional rewrite/filter step.
    ///
    /// - `None` returned → the payload is dropped.
    /// - `Some(payload)` → that payload is queued instead.
    ///
    /// If the hook panics the original payload is queued unchanged.
    pub before_send: Option<BeforeSend>,

    pub queue_capacity: usize,

    pub flush_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            before_send: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// DispatchStats
// ---------------------------------------------------------------------------

/// Snapshot of what happened to submitted payloads so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Collector answered HTTP 200.
    pub delivered: u64,
    /// Attempted, but no 200 came back.
    pub failed: u64,
    /// Never attempted (hook dropped it, queue full, worker gone, not serializable).
    pub dropped: u64,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    sender: Sender<WorkerMsg>,
    before_send: Option<BeforeSend>,
    flush_timeout: Duration,
    counters: Arc<DeliveryCounters>,
}

impl Dispatcher {
    /**
     * Validates `config` and spawns the delivery worker.
     *
     * # Returns
     * * `Ok(Dispatcher)` ready to accept payloads.
     * * `Err(ForwardError::InvalidConfig)` if the target URL is invalid.
     * * `Err(ForwardError::Worker)` if the thread could not be spawned.
     */
    pub fn start(config: &EndpointConfig, options: DispatchOptions) -> Result<Self, ForwardError> {
        let url = config.target_url()?;
        let counters = Arc::new(DeliveryCounters::default());

        let (sender, receiver) = crossbeam_channel::bounded(options.queue_capacity);

        let delivery = Delivery {
            url,
            bearer: config.bearer().map(str::to_string),
            transport: Transport::new(&config.timeouts),
            counters: counters.clone(),
        };
        Worker::spawn(receiver, delivery)?;

        Ok(Self {
            sender,
            before_send: options.before_send,
            flush_timeout: options.flush_timeout,
            counters,
        })
    }

    /**
     * Queues `payload` for delivery without blocking.
     *
     * # Returns
     * `true` if the payload was queued, `false` if it was dropped
     * (not serializable, rejected by `before_send`, queue full, or the
     * worker has shut down).
     */
    pub fn submit<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "result payload is not serializable, dropping it");
                return self.drop_one();
            }
        };

        let Some(value) = self.apply_before_send(value) else {
            tracing::debug!("before_send dropped a result payload");
            return self.drop_one();
        };

        let body = match serde_json::to_string(&value) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "result payload is not serializable, dropping it");
                return self.drop_one();
            }
        };

        match self.sender.try_send(WorkerMsg::Deliver(body)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("dispatch queue is full, dropping result");
                self.drop_one()
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("delivery worker has shut down, dropping result");
                self.drop_one()
            }
        }
    }

    /**
     * Blocks until every payload submitted before this call has been
     * attempted, or the flush timeout elapses.
     *
     * # Returns
     * `true` if the worker caught up in time, `false` otherwise.
     */
    pub fn flush(&self) -> bool {
        let signal = Arc::new(FlushSignal::new());

        match self
            .sender
            .send_timeout(WorkerMsg::Flush(signal.clone()), self.flush_timeout)
        {
            Ok(()) => signal.wait_timeout(self.flush_timeout),
            Err(_) => false,
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Runs the hook, falling back to the original payload if it panics.
    fn apply_before_send(&self, value: Value) -> Option<Value> {
        let Some(hook) = &self.before_send else {
            return Some(value);
        };

        let original = value.clone();
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| hook(value))) {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("before_send panicked, forwarding the original result");
                Some(original)
            }
        }
    }

    fn drop_one(&self) -> bool {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        false
    }
}

impl Drop for Dispatcher {
    /// Flushes pending payloads; the sender drops afterwards and the worker exits.
    fn drop(&mut self) {
        if !self.flush() {
            tracing::warn!("flush timed out, some results may not have been forwarded");
        }
    }
}
