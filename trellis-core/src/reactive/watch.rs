//! User Watches and Effects
//!
//! [`watch`] is the user-facing way to react to changes: it creates a user
//! watcher whose callback receives `(new, old)` and whose failures are
//! reported instead of propagated. [`effect`] is the callback-less variant
//! that just re-runs a function whenever what it read changes.
//!
//! The returned [`WatchHandle`] owns the watcher. Deps only hold watchers
//! weakly, so dropping the handle of an unowned watch stops it.

use std::fmt;
use std::rc::Rc;

use super::value::Value;
use super::watcher::{Callback, Source, Watcher, WatcherOptions, WatcherOwner};
use crate::error::{handle_error, Result};

/// Options accepted by [`watch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    pub deep: bool,
    /// Invoke the callback once right away with `(current, Undefined)`.
    pub immediate: bool,
    pub sync: bool,
}

/// Owning handle to a running watch.
#[derive(Clone)]
pub struct WatchHandle {
    watcher: Watcher,
}

impl WatchHandle {
    /// Stop the watch. Idempotent.
    pub fn unwatch(&self) {
        self.watcher.teardown();
    }

    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    /// Last value the watch observed.
    pub fn value(&self) -> Value {
        self.watcher.value()
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle").field("watcher", &self.watcher).finish()
    }
}

/// Watch `source` and call `callback` with `(new, old)` after it changes.
pub fn watch(
    source: Source,
    callback: impl Fn(&Value, &Value) -> Result<()> + 'static,
    options: WatchOptions,
) -> Result<WatchHandle> {
    watch_with_owner(None, source, Rc::new(callback), options)
}

pub(crate) fn watch_with_owner(
    owner: Option<&Rc<dyn WatcherOwner>>,
    source: Source,
    callback: Callback,
    options: WatchOptions,
) -> Result<WatchHandle> {
    let watcher = Watcher::new(
        owner,
        source,
        Some(callback.clone()),
        WatcherOptions {
            deep: options.deep,
            sync: options.sync,
            user: true,
            ..Default::default()
        },
    )?;
    if options.immediate {
        if let Err(err) = callback(&watcher.value(), &Value::Undefined) {
            handle_error(
                &err,
                &format!("callback for immediate {}", watcher.describe()),
            );
        }
    }
    Ok(WatchHandle { watcher })
}

/// Run `f` now and again, through the scheduler, whenever what it read
/// changes.
pub fn effect(f: impl Fn() -> Result<()> + 'static) -> Result<WatchHandle> {
    let watcher = Watcher::new(
        None,
        Source::labelled("effect", move || f().map(|()| Value::Undefined)),
        None,
        WatcherOptions::default(),
    )?;
    Ok(WatchHandle { watcher })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{observe, Signal};
    use crate::scheduler::run_microtasks;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    #[test]
    fn immediate_fires_with_undefined_old() {
        let data = Value::from(json!({ "a": 3 }));
        observe(&data, false);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let _h = watch(
            Source::path(data.clone(), "a"),
            move |new, old| {
                sink.borrow_mut().push((new.clone(), old.clone()));
                Ok(())
            },
            WatchOptions {
                immediate: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(*calls.borrow(), vec![(Value::from(3), Value::Undefined)]);
    }

    #[test]
    fn unwatch_stops_callbacks() {
        let signal = Signal::new(1);
        let calls = Rc::new(Cell::new(0));
        let (s, c) = (signal.clone(), calls.clone());
        let handle = watch(
            Source::getter(move || Ok(Value::from(s.get()))),
            move |_, _| {
                c.set(c.get() + 1);
                Ok(())
            },
            WatchOptions {
                sync: true,
                ..Default::default()
            },
        )
        .unwrap();

        signal.set(2);
        assert_eq!(calls.get(), 1);
        handle.unwatch();
        signal.set(3);
        assert_eq!(calls.get(), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn effect_reruns_after_flush() {
        let signal = Signal::new(1);
        let seen = Rc::new(Cell::new(0));
        let (s, out) = (signal.clone(), seen.clone());
        let _h = effect(move || {
            out.set(s.get());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen.get(), 1);

        signal.set(7);
        assert_eq!(seen.get(), 1);
        run_microtasks();
        assert_eq!(seen.get(), 7);
    }
}
