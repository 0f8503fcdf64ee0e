//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis reactive UI framework.
//! It implements:
//!
//! - Dependency tracking over observed objects and arrays
//! - Watchers, computed values and an asynchronous update scheduler
//! - Virtual DOM reconciliation with keyed list diffing
//! - Components with lifecycle hooks and a keep-alive cache
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: observed values, deps, watchers and the consumer stack
//! - `scheduler`: the watcher queue and the next-tick primitive
//! - `vdom`: vnodes, the patcher, modules, components and host backends
//! - `config` / `error`: runtime knobs and the diagnostics channel
//!
//! Everything is single-threaded. Each thread has its own consumer stack,
//! scheduler queue and configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::reactive::{observe, watch, Source, Value, WatchOptions};
//! use trellis_core::scheduler::run_microtasks;
//!
//! let state = Value::from(serde_json::json!({ "count": 0 }));
//! observe(&state, false);
//!
//! let _handle = watch(
//!     Source::path(state.clone(), "count"),
//!     |new, old| {
//!         println!("count: {old:?} -> {new:?}");
//!         Ok(())
//!     },
//!     WatchOptions::default(),
//! )?;
//!
//! state.as_object().unwrap().assign("count", 1);
//! run_microtasks();
//! // prints: "count: 0 -> 1"
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod scheduler;
pub mod vdom;

pub use config::Config;
pub use error::{Error, Result};
pub use reactive::{Array, Object, Value};
