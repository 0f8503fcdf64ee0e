//! Update Scheduler
//!
//! Watchers that are neither lazy nor sync land in a per-thread queue which
//! is flushed once per tick.
//!
//! # Algorithm
//!
//! 1. [`queue_watcher`] ignores watchers already queued in this flush. The
//!    first queued watcher schedules a flush on the next tick (or flushes on
//!    the spot when `Config::async_flush` is off).
//!
//! 2. The flush sorts the queue by watcher id, so parents run before
//!    children and user watchers before the render watcher of the same
//!    component.
//!
//! 3. Watchers queued *during* the flush are inserted after the cursor at
//!    their id position and run in the same flush. A watcher that gets
//!    re-queued more than `max_update_count` times is reported and skipped
//!    for the rest of the flush; the others still run.
//!
//! 4. After the loop, components activated by keep-alive get their
//!    `activated` hooks, then every owner whose render watcher ran gets its
//!    `updated` hook, children before parents.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::tick::next_tick;
use crate::config;
use crate::error::{handle_error, Error};
use crate::reactive::{Watcher, WatcherId};

/// A kept-alive component that needs its activation hooks run after the
/// current flush.
pub trait Activatable {
    fn set_inactive(&self, inactive: bool);

    /// Activate the component and its subtree.
    fn activate(self: Rc<Self>);
}

#[derive(Default)]
struct SchedulerState {
    queue: Vec<Watcher>,
    activated: Vec<Rc<dyn Activatable>>,
    has: HashSet<WatcherId>,
    circular: HashMap<WatcherId, u32>,
    skipped: HashSet<WatcherId>,
    waiting: bool,
    flushing: bool,
    index: usize,
}

thread_local! {
    static SCHEDULER: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

/// Add `watcher` to the queue unless it is already pending.
pub fn queue_watcher(watcher: Watcher) {
    let id = watcher.id();
    let schedule = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        if state.has.contains(&id) || state.skipped.contains(&id) {
            return false;
        }
        state.has.insert(id);
        if state.flushing {
            let mut at = state.queue.len();
            while at > state.index + 1 && state.queue[at - 1].id() > id {
                at -= 1;
            }
            state.queue.insert(at, watcher);
        } else {
            state.queue.push(watcher);
        }
        if state.waiting {
            return false;
        }
        state.waiting = true;
        true
    });

    if schedule {
        if config::with(|c| c.async_flush) {
            next_tick(flush_scheduler_queue);
        } else {
            flush_scheduler_queue();
        }
    }
}

/// Schedule `component`'s activation hooks for the end of the current flush.
pub fn queue_activated_component(component: Rc<dyn Activatable>) {
    component.set_inactive(false);
    SCHEDULER.with(|state| state.borrow_mut().activated.push(component));
}

pub fn is_flushing() -> bool {
    SCHEDULER.with(|state| state.borrow().flushing)
}

/// Number of watchers waiting for the next flush.
pub fn pending_count() -> usize {
    SCHEDULER.with(|state| {
        let state = state.borrow();
        state.queue.len().saturating_sub(state.index)
    })
}

/// Run every queued watcher.
pub fn flush_scheduler_queue() {
    let max_updates = config::with(|c| c.max_update_count);
    let total = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        state.flushing = true;
        state.queue.sort_by_key(Watcher::id);
        state.queue.len()
    });
    tracing::debug!(queued = total, "flushing scheduler queue");

    let mut index = 0;
    loop {
        let next = SCHEDULER.with(|state| {
            let mut state = state.borrow_mut();
            state.index = index;
            state.queue.get(index).cloned()
        });
        let Some(watcher) = next else { break };
        index += 1;

        let id = watcher.id();
        if SCHEDULER.with(|state| state.borrow().skipped.contains(&id)) {
            continue;
        }

        watcher.run_before();
        SCHEDULER.with(|state| state.borrow_mut().has.remove(&id));
        if let Err(err) = watcher.run() {
            handle_error(&err, &watcher.describe());
        }

        let runaway = SCHEDULER.with(|state| {
            let mut state = state.borrow_mut();
            if !state.has.contains(&id) {
                return false;
            }
            let count = state.circular.entry(id).or_insert(0);
            *count += 1;
            if *count > max_updates {
                state.skipped.insert(id);
                return true;
            }
            false
        });
        if runaway {
            tracing::warn!(watcher = id.raw(), "update loop detected, skipping watcher");
            handle_error(&Error::InfiniteUpdate(watcher.describe()), "scheduler flush");
        }
    }

    let (activated, updated) = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        let activated = std::mem::take(&mut state.activated);
        let updated = std::mem::take(&mut state.queue);
        state.has.clear();
        state.circular.clear();
        state.skipped.clear();
        state.index = 0;
        state.waiting = false;
        state.flushing = false;
        (activated, updated)
    });
    tracing::debug!(ran = updated.len(), "scheduler queue flushed");

    for component in activated {
        component.set_inactive(true);
        component.activate();
    }
    for watcher in updated.iter().rev() {
        if watcher.is_render() {
            if let Some(owner) = watcher.owner() {
                owner.render_flushed(watcher.id());
            }
        }
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Signal, Source, WatcherOptions};
    use crate::scheduler::run_microtasks;
    use crate::Value;
    use std::cell::Cell;

    fn counting_watcher(signal: &Signal<i32>, order: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Watcher {
        let (s, o) = (signal.clone(), order.clone());
        Watcher::new(
            None,
            Source::getter(move || {
                o.borrow_mut().push(name);
                Ok(Value::from(s.get()))
            }),
            None,
            WatcherOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn writes_in_one_tick_coalesce() {
        let signal = Signal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let _w = counting_watcher(&signal, &order, "w");
        order.borrow_mut().clear();

        signal.set(1);
        signal.set(2);
        signal.set(3);
        assert_eq!(pending_count(), 1);
        run_microtasks();
        assert_eq!(*order.borrow(), vec!["w"]);
        assert_eq!(pending_count(), 0);
    }

    #[test]
    fn flush_runs_in_id_order() {
        let a = Signal::new(0);
        let b = Signal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let _first = counting_watcher(&b, &order, "first");
        let _second = counting_watcher(&a, &order, "second");
        order.borrow_mut().clear();

        a.set(1);
        b.set(1);
        run_microtasks();
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn lower_id_queued_mid_flush_runs_next() {
        let x = Signal::new(0);
        let y = Signal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let _early = counting_watcher(&x, &order, "early");
        let (xs, ys, o) = (x.clone(), y.clone(), order.clone());
        let _writer = Watcher::new(
            None,
            Source::getter(move || {
                o.borrow_mut().push("writer");
                let v = ys.get();
                xs.set(v);
                Ok(Value::from(v))
            }),
            None,
            WatcherOptions::default(),
        )
        .unwrap();
        let _late = counting_watcher(&y, &order, "late");
        run_microtasks();
        order.borrow_mut().clear();

        y.set(1);
        run_microtasks();
        assert_eq!(*order.borrow(), vec!["writer", "early", "late"]);
    }

    #[test]
    fn torn_down_watcher_is_skipped() {
        let signal = Signal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let w = counting_watcher(&signal, &order, "w");
        order.borrow_mut().clear();

        signal.set(1);
        assert_eq!(pending_count(), 1);
        w.teardown();
        run_microtasks();
        assert!(order.borrow().is_empty());
        assert_eq!(pending_count(), 0);
    }

    #[test]
    fn runaway_watcher_is_skipped_and_reported() {
        config::update(|c| c.max_update_count = 10);
        let reported = Rc::new(Cell::new(0));
        let r = reported.clone();
        config::set_error_handler(Some(Rc::new(move |e: &Error, _: &str| {
            if matches!(e, Error::InfiniteUpdate(_)) {
                r.set(r.get() + 1);
            }
        })));

        let signal = Signal::new(0);
        let s = signal.clone();
        let _looping = Watcher::new(
            None,
            Source::getter(move || {
                let n = s.get();
                s.set(n + 1);
                Ok(Value::from(n))
            }),
            None,
            WatcherOptions::default(),
        )
        .unwrap();

        let other = Signal::new(0);
        let hits = Rc::new(Cell::new(0));
        let (o, h) = (other.clone(), hits.clone());
        let _calm = Watcher::new(
            None,
            Source::getter(move || {
                h.set(h.get() + 1);
                Ok(Value::from(o.get()))
            }),
            None,
            WatcherOptions::default(),
        )
        .unwrap();

        other.set(1);
        run_microtasks();

        assert_eq!(reported.get(), 1);
        assert_eq!(hits.get(), 2);
        assert!(!is_flushing());
        config::set_error_handler(None);
    }

    #[test]
    fn sync_mode_flushes_immediately() {
        config::update(|c| c.async_flush = false);
        let signal = Signal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let _w = counting_watcher(&signal, &order, "w");
        order.borrow_mut().clear();

        signal.set(1);
        assert_eq!(*order.borrow(), vec!["w"]);
        config::update(|c| c.async_flush = true);
    }
}
