/**
 * Transport layer — HTTP delivery and the background worker thread.
 *
 * - `http` — ureq-based POST of a serialized payload
 * - `worker` — dispatcher thread, bounded channel, flush signaling
 */

pub mod http;
pub mod worker;

pub use http::Transport;
pub use worker::{Delivery, DeliveryCounters, FlushSignal, Worker, WorkerMsg};
