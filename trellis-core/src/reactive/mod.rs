//! Reactive Primitives
//!
//! This module implements the dependency-tracking core: observed values,
//! deps, watchers and the typed conveniences built on them.
//!
//! # Concepts
//!
//! ## Observed values
//!
//! [`observe`] converts the properties of an [`Object`] into reactive
//! properties and intercepts the mutators of an [`Array`]. Reading an
//! observed property while a watcher is evaluating records a dependency;
//! writing a different value notifies every dependent watcher.
//!
//! ## Watchers
//!
//! A [`Watcher`] evaluates a getter, tracks what it read, and reacts when any
//! of it changes: lazily (computed values), synchronously, or by queueing
//! itself with the [`scheduler`](crate::scheduler).
//!
//! ## Signals, computed values and watches
//!
//! [`Signal`], [`Computed`] and [`watch`] are thin typed layers over deps and
//! watchers for state that lives in Rust code.
//!
//! # Implementation Notes
//!
//! Everything is single-threaded: shared state is `Rc` + `RefCell`, and the
//! "currently evaluating watcher" is a thread-local stack. Each thread is an
//! independent reactive universe.

mod array;
mod computed;
mod context;
mod dep;
mod object;
mod observer;
mod signal;
mod traverse;
mod value;
mod watch;
mod watcher;

pub use array::Array;
pub use computed::{Computed, ComputedState};
pub use context::{untrack, ReactiveContext};
pub use dep::{Dep, DepId};
pub use object::{Accessor, Getter, Object, Setter};
pub use observer::{
    define_reactive, del, is_observing, observe, property_dep, set, set_observing,
    without_observing, Observer,
};
pub use signal::Signal;
pub use traverse::traverse;
pub use value::Value;
pub use watch::{effect, watch, WatchHandle, WatchOptions};
pub(crate) use watch::watch_with_owner;
pub use watcher::{
    parse_path, Callback, Evaluator, Source, Watcher, WatcherId, WatcherOptions, WatcherOwner,
};
