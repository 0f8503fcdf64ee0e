//! Errors and the Diagnostics Channel
//!
//! Failures in Trellis fall into four groups:
//!
//! - **Evaluation errors**: an evaluator, watch callback, lifecycle hook or
//!   render function returned an `Err`. User-declared watchers report these
//!   through [`handle_error`] and keep running; internal evaluators (render
//!   functions) propagate them to the caller.
//! - **Runaway updates**: a watcher re-queued itself more than
//!   [`Config::max_update_count`](crate::config::Config) times within one
//!   flush.
//! - **Structural warnings**: duplicate sibling keys, observed objects used as
//!   vnode data, direct prop mutation. These go through [`warn`] and never
//!   change runtime behaviour.
//! - **Configuration errors**: reactive `set`/`del` on a non-container or on a
//!   component's root data. Reported through [`warn`]; the operation is a
//!   no-op.
//!
//! Both channels log through `tracing` unless `Config::silent` is set, and
//! forward to the handlers installed with
//! [`config::set_warn_handler`](crate::config::set_warn_handler) and
//! [`config::set_error_handler`](crate::config::set_error_handler).

use thiserror::Error;

use crate::config;
use crate::reactive::ReactiveContext;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the reactive runtime and the reconciler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A user-supplied evaluator, callback or hook failed.
    #[error("{0}")]
    Thrown(String),

    /// A watch path contained characters outside `[A-Za-z0-9_.$]`.
    #[error("failed watching path: \"{0}\"")]
    InvalidPath(String),

    /// A watcher kept re-queuing itself during a single flush.
    #[error("you may have an infinite update loop in {0}")]
    InfiniteUpdate(String),

    /// A reactive `set`/`del` targeted something that cannot hold properties.
    #[error("cannot {operation} reactive property on {found}")]
    InvalidTarget {
        operation: &'static str,
        found: &'static str,
    },

    /// A component's render function failed.
    #[error("error in render of <{component}>: {source}")]
    Render {
        component: String,
        #[source]
        source: Box<Error>,
    },

    /// A lifecycle hook failed.
    #[error("error in {hook} hook of <{component}>: {source}")]
    HookFailed {
        component: String,
        hook: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Shorthand for [`Error::Thrown`].
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::Thrown(message.into())
    }
}

/// Report a non-fatal structural or configuration problem.
pub fn warn(message: impl AsRef<str>) {
    let message = message.as_ref();
    if let Some(handler) = config::warn_handler() {
        handler(message);
        return;
    }
    if !config::with(|c| c.silent) {
        tracing::warn!(target: "trellis", "{message}");
    }
}

/// Report an evaluation error.
///
/// `info` names where the error happened, e.g. `getter for watcher "a.b"`.
/// Dependency tracking is suspended while the handler runs so that reads
/// inside it are not attributed to the failing watcher.
pub fn handle_error(error: &Error, info: &str) {
    let _untracked = ReactiveContext::untracked();
    if let Some(handler) = config::error_handler() {
        handler(error, info);
        return;
    }
    if !config::with(|c| c.silent) {
        tracing::error!(target: "trellis", info, "{error}");
    }
}
