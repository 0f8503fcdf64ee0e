//! Computed Values
//!
//! A [`Computed`] is a cached derived value built on a lazy watcher.
//!
//! # How It Works
//!
//! 1. Creation does not evaluate anything; the watcher starts dirty.
//!
//! 2. [`Computed::get`] re-evaluates only if dirty, then subscribes the
//!    current context to every dep the computation read. A watcher reading
//!    a computed value therefore depends on the computed value's inputs
//!    directly.
//!
//! 3. When an input changes the lazy watcher just marks itself dirty. The
//!    readers are notified by the same dep and recompute on their own run.

use std::fmt;
use std::rc::Rc;

use super::context::ReactiveContext;
use super::value::Value;
use super::watcher::{Source, Watcher, WatcherOptions, WatcherOwner};
use crate::error::Result;

/// Cache state of a computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    /// The cached value is up to date.
    Clean,
    /// An input changed since the last evaluation.
    Dirty,
}

/// A cached derived value.
#[derive(Clone)]
pub struct Computed {
    watcher: Watcher,
}

impl Computed {
    pub fn new(getter: impl Fn() -> Result<Value> + 'static) -> Self {
        Self::build(None, Source::getter(getter))
    }

    /// Create a computed value owned by a component, torn down with it.
    pub fn with_owner(
        owner: &Rc<dyn WatcherOwner>,
        label: impl Into<String>,
        getter: impl Fn() -> Result<Value> + 'static,
    ) -> Self {
        Self::build(Some(owner), Source::labelled(label, getter))
    }

    fn build(owner: Option<&Rc<dyn WatcherOwner>>, source: Source) -> Self {
        let watcher = Watcher::build(
            owner,
            source,
            None,
            WatcherOptions {
                lazy: true,
                ..Default::default()
            },
        );
        Self { watcher }
    }

    /// Current value, recomputing if dirty.
    pub fn get(&self) -> Result<Value> {
        if self.watcher.is_dirty() {
            self.watcher.evaluate()?;
        }
        if ReactiveContext::is_tracking() {
            self.watcher.depend();
        }
        Ok(self.watcher.value())
    }

    pub fn state(&self) -> ComputedState {
        if self.watcher.is_dirty() {
            ComputedState::Dirty
        } else {
            ComputedState::Clean
        }
    }

    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    /// Stop tracking inputs. The last value stays readable.
    pub fn dispose(&self) {
        self.watcher.teardown();
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("state", &self.state())
            .field("watcher", &self.watcher)
            .finish()
    }
}
