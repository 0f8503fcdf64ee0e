//! Runtime Configuration
//!
//! Each thread owns one reactive universe and therefore one [`Config`]. The
//! serialisable knobs live in [`Config`]; the warn/error handlers are closures
//! and are installed separately.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Handler receiving evaluation errors together with where they happened.
pub type ErrorHandler = Rc<dyn Fn(&Error, &str)>;

/// Handler receiving structural warnings.
pub type WarnHandler = Rc<dyn Fn(&str)>;

/// Tunable runtime behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch watcher runs into a deferred flush. When `false`, every
    /// invalidation flushes immediately and dependency notification happens
    /// in watcher creation order.
    pub async_flush: bool,

    /// How many times a single watcher may be re-queued within one flush
    /// before it is reported as an infinite update loop.
    pub max_update_count: u32,

    /// Suppress the `tracing` output of the diagnostics channel. Installed
    /// handlers still run.
    pub silent: bool,

    /// Warn about duplicate keys among sibling vnodes.
    pub warn_duplicate_keys: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_flush: true,
            max_update_count: 100,
            silent: false,
            warn_duplicate_keys: true,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Default)]
struct Handlers {
    error: Option<ErrorHandler>,
    warn: Option<WarnHandler>,
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
    static HANDLERS: RefCell<Handlers> = RefCell::new(Handlers::default());
}

/// Snapshot of the current configuration.
pub fn get() -> Config {
    CONFIG.with(|c| c.borrow().clone())
}

/// Read a value out of the current configuration without cloning it.
pub fn with<R>(f: impl FnOnce(&Config) -> R) -> R {
    CONFIG.with(|c| f(&c.borrow()))
}

/// Replace the current configuration.
pub fn set(config: Config) {
    CONFIG.with(|c| *c.borrow_mut() = config);
}

/// Modify the current configuration in place.
pub fn update(f: impl FnOnce(&mut Config)) {
    CONFIG.with(|c| f(&mut c.borrow_mut()));
}

/// Install (or clear) the error handler.
pub fn set_error_handler(handler: Option<ErrorHandler>) {
    HANDLERS.with(|h| h.borrow_mut().error = handler);
}

/// Install (or clear) the warning handler.
pub fn set_warn_handler(handler: Option<WarnHandler>) {
    HANDLERS.with(|h| h.borrow_mut().warn = handler);
}

pub(crate) fn error_handler() -> Option<ErrorHandler> {
    HANDLERS.with(|h| h.borrow().error.clone())
}

pub(crate) fn warn_handler() -> Option<WarnHandler> {
    HANDLERS.with(|h| h.borrow().warn.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.async_flush);
        assert_eq!(config.max_update_count, 100);
        assert!(!config.silent);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let config = Config::from_json(r#"{ "async_flush": false }"#).unwrap();
        assert!(!config.async_flush);
        assert_eq!(config.max_update_count, 100);
        assert!(config.warn_duplicate_keys);
    }

    #[test]
    fn update_is_thread_local() {
        update(|c| c.max_update_count = 5);
        assert_eq!(with(|c| c.max_update_count), 5);

        let other = std::thread::spawn(|| with(|c| c.max_update_count))
            .join()
            .unwrap();
        assert_eq!(other, 100);
    }
}
