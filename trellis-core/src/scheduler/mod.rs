//! Scheduling
//!
//! Batches watcher runs: invalidations queue watchers, and the queue is
//! flushed once per tick in watcher-id order.

mod queue;
mod tick;

pub use queue::{
    flush_scheduler_queue, is_flushing, pending_count, queue_activated_component, queue_watcher,
    Activatable,
};
pub use tick::{next_tick, run_microtasks, set_host, tick, ManualHost, MicrotaskHost, TokioHost};
