//! Next Tick
//!
//! Callbacks registered with [`next_tick`] are collected into one batch and
//! run, in registration order, from a single microtask. The microtask is
//! handed to the thread's [`MicrotaskHost`]:
//!
//! - [`ManualHost`] (the default) parks it until [`run_microtasks`] is
//!   called, which gives tests and embedders explicit control.
//! - [`TokioHost`] spawns it on the current `tokio::task::LocalSet`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

/// Something that can run a task "soon", after the current synchronous work.
pub trait MicrotaskHost {
    fn schedule(&self, task: Task);
}

/// Host that queues microtasks until [`run_microtasks`] drains them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualHost;

impl MicrotaskHost for ManualHost {
    fn schedule(&self, task: Task) {
        MICROTASKS.with(|queue| queue.borrow_mut().push_back(task));
    }
}

/// Host that runs microtasks as local tokio tasks.
///
/// Must be used from within a `tokio::task::LocalSet`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioHost;

impl MicrotaskHost for TokioHost {
    fn schedule(&self, task: Task) {
        tokio::task::spawn_local(async move { task() });
    }
}

#[derive(Default)]
struct TickState {
    callbacks: Vec<Task>,
    pending: bool,
}

thread_local! {
    static HOST: RefCell<Rc<dyn MicrotaskHost>> = RefCell::new(Rc::new(ManualHost));
    static MICROTASKS: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
    static TICK: RefCell<TickState> = RefCell::new(TickState::default());
}

/// Install the microtask host for this thread.
pub fn set_host(host: Rc<dyn MicrotaskHost>) {
    HOST.with(|h| *h.borrow_mut() = host);
}

/// Run `callback` after the current synchronous work.
pub fn next_tick(callback: impl FnOnce() + 'static) {
    let schedule = TICK.with(|tick| {
        let mut tick = tick.borrow_mut();
        tick.callbacks.push(Box::new(callback));
        !std::mem::replace(&mut tick.pending, true)
    });
    if schedule {
        let host = HOST.with(|h| h.borrow().clone());
        host.schedule(Box::new(flush_callbacks));
    }
}

/// A future that resolves after the callbacks registered so far have run.
pub fn tick() -> impl Future<Output = ()> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    next_tick(move || {
        let _ = tx.send(());
    });
    async move {
        let _ = rx.await;
    }
}

fn flush_callbacks() {
    let callbacks = TICK.with(|tick| {
        let mut tick = tick.borrow_mut();
        tick.pending = false;
        std::mem::take(&mut tick.callbacks)
    });
    for callback in callbacks {
        callback();
    }
}

/// Drain the [`ManualHost`] queue, including microtasks scheduled while
/// draining. Returns how many ran.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    loop {
        let task = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        let Some(task) = task else { break };
        task();
        ran += 1;
    }
    ran
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn callbacks_batch_into_one_microtask() {
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let o = order.clone();
            next_tick(move || o.borrow_mut().push(i));
        }
        assert!(order.borrow().is_empty());
        assert_eq!(run_microtasks(), 1);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn callback_registered_during_flush_runs_in_next_batch() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = order.clone();
        next_tick(move || {
            o.borrow_mut().push("outer");
            let inner = o.clone();
            next_tick(move || inner.borrow_mut().push("inner"));
        });
        assert_eq!(run_microtasks(), 2);
        assert_eq!(*order.borrow(), vec!["outer", "inner"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn tokio_host_runs_ticks() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                set_host(Rc::new(TokioHost));
                let hit = Rc::new(RefCell::new(false));
                let h = hit.clone();
                next_tick(move || *h.borrow_mut() = true);
                tick().await;
                assert!(*hit.borrow());
                set_host(Rc::new(ManualHost));
            })
            .await;
    }
}
