//! Reactive Context
//!
//! The reactive context tracks which watcher is currently evaluating. When a
//! reactive property is read, its dep asks the context for the current
//! watcher and registers it as a subscriber.
//!
//! # Implementation
//!
//! A thread-local stack of `Option<Watcher>`. Entering a watcher pushes
//! `Some(watcher)`; [`ReactiveContext::untracked`] pushes `None`, which masks
//! any outer watcher so reads inside lifecycle hooks or error handlers are not
//! attributed to it. The guard pops on drop, so the stack unwinds even if the
//! evaluation returns early through `?`.

use std::cell::RefCell;

use super::watcher::Watcher;

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Watcher>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ReactiveContext {
    depth: usize,
}

impl ReactiveContext {
    /// Make `watcher` the current dependency target.
    pub fn enter(watcher: Watcher) -> Self {
        Self::push(Some(watcher))
    }

    /// Suspend dependency tracking until the guard is dropped.
    pub fn untracked() -> Self {
        Self::push(None)
    }

    fn push(entry: Option<Watcher>) -> Self {
        let depth = TARGET_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(entry);
            stack.len()
        });
        Self { depth }
    }

    /// The watcher reads should currently be attributed to, if any.
    pub fn current() -> Option<Watcher> {
        TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Whether a read right now would be tracked.
    pub fn is_tracking() -> bool {
        TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// Number of entered contexts on this thread.
    pub fn depth() -> usize {
        TARGET_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        TARGET_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "ReactiveContext dropped out of order"
            );
            stack.pop();
        });
    }
}

/// Run `f` with dependency tracking suspended.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}
