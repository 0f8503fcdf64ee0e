//! Dependency Channels
//!
//! A [`Dep`] is the notification point of one reactive source: a reactive
//! property, an observed container, or a [`Signal`](super::Signal). Watchers
//! subscribe to deps while they evaluate; writes to the source call
//! [`Dep::notify`], which asks every live subscriber to update.
//!
//! Subscribers are held weakly. A watcher that nothing else owns is pruned
//! the next time the dep notifies.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::context::ReactiveContext;
use super::watcher::{WeakWatcher, Watcher, WatcherId};
use crate::config;

static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of a dep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A subscription point.
#[derive(Clone)]
pub struct Dep(Rc<DepInner>);

struct DepInner {
    id: DepId,
    subs: RefCell<IndexMap<WatcherId, WeakWatcher>>,
}

impl Dep {
    pub fn new() -> Self {
        Self(Rc::new(DepInner {
            id: DepId::next(),
            subs: RefCell::new(IndexMap::new()),
        }))
    }

    pub fn id(&self) -> DepId {
        self.0.id
    }

    pub fn add_sub(&self, watcher: &Watcher) {
        self.0
            .subs
            .borrow_mut()
            .entry(watcher.id())
            .or_insert_with(|| watcher.downgrade());
    }

    pub fn remove_sub(&self, id: WatcherId) {
        self.0.subs.borrow_mut().shift_remove(&id);
    }

    /// Register this dep with the current watcher, if one is evaluating.
    pub fn depend(&self) {
        if let Some(target) = ReactiveContext::current() {
            target.add_dep(self);
        }
    }

    /// Ask every subscriber to update.
    ///
    /// The subscriber list is snapshotted first, so watchers that subscribe
    /// or unsubscribe during the notification do not affect this round. In
    /// synchronous mode the snapshot is ordered by watcher id.
    pub fn notify(&self) {
        let mut live = Vec::new();
        self.0.subs.borrow_mut().retain(|_, weak| match weak.upgrade() {
            Some(watcher) => {
                live.push(watcher);
                true
            }
            None => false,
        });

        if !config::with(|c| c.async_flush) {
            live.sort_by_key(Watcher::id);
        }

        tracing::trace!(dep = self.0.id.0, subscribers = live.len(), "notify");
        for watcher in live {
            watcher.update();
        }
    }

    /// Number of subscribers, including ones not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.0.subs.borrow().len()
    }

    pub fn has_subscriber(&self, id: WatcherId) -> bool {
        self.0.subs.borrow().contains_key(&id)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.0.id)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Source, WatcherOptions};
    use crate::Value;
    use std::cell::Cell;

    #[test]
    fn dep_ids_are_unique() {
        assert_ne!(Dep::new().id(), Dep::new().id());
    }

    #[test]
    fn depend_outside_watcher_is_noop() {
        let dep = Dep::new();
        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn notify_prunes_dropped_watchers() {
        let dep = Dep::new();
        let runs = Rc::new(Cell::new(0));
        let d = dep.clone();
        let r = runs.clone();
        let watcher = Watcher::new(
            None,
            Source::getter(move || {
                d.depend();
                r.set(r.get() + 1);
                Ok(Value::Undefined)
            }),
            None,
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(dep.subscriber_count(), 1);
        dep.notify();
        assert_eq!(runs.get(), 2);

        drop(watcher);
        dep.notify();
        assert_eq!(runs.get(), 2);
        assert_eq!(dep.subscriber_count(), 0);
    }
}
