//! Watchers
//!
//! A [`Watcher`] evaluates a getter while recording every dep it reads, then
//! re-runs (or marks itself dirty) when any of those deps notifies. It is the
//! single subscriber type in Trellis: render updates, computed values and
//! user watches are all watchers with different options.
//!
//! # How It Works
//!
//! 1. [`Watcher::get`] makes the watcher the current reactive context and
//!    calls the getter. Each dep read calls [`Watcher::add_dep`], which adds
//!    the dep to the *new* dependency set and subscribes to it if it was not
//!    already a dependency.
//!
//! 2. After the getter returns, [`Watcher::cleanup_deps`] unsubscribes from
//!    every old dep not read this time and swaps the new set in.
//!
//! 3. A notification calls [`Watcher::update`]: lazy watchers only mark
//!    themselves dirty, sync watchers run immediately, everything else is
//!    queued with the scheduler.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::dep::{Dep, DepId};
use super::traverse::traverse;
use super::value::Value;
use crate::error::{handle_error, warn, Error, Result};
use crate::scheduler;

static WATCHER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique, creation-ordered watcher identifier.
///
/// The scheduler flushes in ascending id order, which is what guarantees
/// parents update before children and user watchers before render watchers
/// of the same component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(u64);

impl WatcherId {
    fn next() -> Self {
        Self(WATCHER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Getter evaluated by a watcher.
pub type Evaluator = Rc<dyn Fn() -> Result<Value>>;

/// Change callback: `(new, old)`.
pub type Callback = Rc<dyn Fn(&Value, &Value) -> Result<()>>;

/// What a watcher evaluates.
pub enum Source {
    /// An arbitrary getter, labelled for diagnostics.
    Getter { eval: Evaluator, label: String },
    /// A dotted path such as `a.b.c`, resolved against `root`.
    Path { root: Value, path: String },
}

impl Source {
    pub fn getter(f: impl Fn() -> Result<Value> + 'static) -> Self {
        Self::Getter {
            eval: Rc::new(f),
            label: "<function>".to_string(),
        }
    }

    pub fn labelled(label: impl Into<String>, f: impl Fn() -> Result<Value> + 'static) -> Self {
        Self::Getter {
            eval: Rc::new(f),
            label: label.into(),
        }
    }

    pub fn path(root: Value, path: impl Into<String>) -> Self {
        Self::Path {
            root,
            path: path.into(),
        }
    }

    fn into_parts(self) -> (Evaluator, String) {
        match self {
            Source::Getter { eval, label } => (eval, label),
            Source::Path { root, path } => match parse_path(&path) {
                Some(segments) => {
                    let eval: Evaluator = Rc::new(move || Ok(root.get_path(&segments)));
                    (eval, path)
                }
                None => {
                    warn(format!(
                        "{}. Watcher only accepts simple dot-delimited paths. \
                         For full control, use a function instead.",
                        Error::InvalidPath(path.clone())
                    ));
                    let eval: Evaluator = Rc::new(|| Ok(Value::Undefined));
                    (eval, path)
                }
            },
        }
    }
}

/// Split a dotted path, rejecting anything but word characters, `.` and `$`.
pub fn parse_path(path: &str) -> Option<Vec<String>> {
    let valid = path
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$');
    valid.then(|| path.split('.').map(str::to_string).collect())
}

/// Watcher behaviour switches.
#[derive(Clone, Default)]
pub struct WatcherOptions {
    /// Traverse the value so nested mutations also trigger.
    pub deep: bool,
    /// User-declared: evaluation and callback errors are reported, not
    /// propagated.
    pub user: bool,
    /// Do not evaluate until asked; notifications only mark dirty.
    pub lazy: bool,
    /// Run immediately on notification instead of queueing.
    pub sync: bool,
    /// Called by the scheduler right before each queued run.
    pub before: Option<Rc<dyn Fn()>>,
    /// This is the render watcher of its owner.
    pub render: bool,
}

/// The component-side surface a watcher needs from its owner.
pub trait WatcherOwner {
    /// Name used in diagnostics.
    fn label(&self) -> String;

    /// Record a watcher created for this owner.
    fn adopt_watcher(&self, watcher: &Watcher);

    /// Forget a watcher that was torn down on its own.
    fn release_watcher(&self, id: WatcherId);

    fn is_being_destroyed(&self) -> bool;

    /// Called after a flush in which render watcher `id` ran.
    fn render_flushed(self: Rc<Self>, _id: WatcherId) {}
}

/// A dependency-tracking evaluator.
#[derive(Clone)]
pub struct Watcher(Rc<WatcherInner>);

/// Non-owning watcher handle held by deps and the scheduler.
#[derive(Clone)]
pub(crate) struct WeakWatcher(Weak<WatcherInner>);

impl WeakWatcher {
    pub(crate) fn upgrade(&self) -> Option<Watcher> {
        self.0.upgrade().map(Watcher)
    }
}

struct WatcherInner {
    id: WatcherId,
    expression: String,
    getter: Evaluator,
    callback: Option<Callback>,
    owner: Option<Weak<dyn WatcherOwner>>,
    options: WatcherOptions,
    active: Cell<bool>,
    dirty: Cell<bool>,
    value: RefCell<Value>,
    deps: RefCell<SmallVec<[Dep; 4]>>,
    new_deps: RefCell<SmallVec<[Dep; 4]>>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_dep_ids: RefCell<HashSet<DepId>>,
}

impl Watcher {
    /// Create a watcher and, unless it is lazy, evaluate it once.
    ///
    /// The initial evaluation of a non-user watcher can fail; user watchers
    /// report evaluation errors and start from `Undefined`.
    pub fn new(
        owner: Option<&Rc<dyn WatcherOwner>>,
        source: Source,
        callback: Option<Callback>,
        options: WatcherOptions,
    ) -> Result<Self> {
        let watcher = Self::build(owner, source, callback, options);
        if !watcher.0.options.lazy {
            let value = watcher.get()?;
            *watcher.0.value.borrow_mut() = value;
        }
        Ok(watcher)
    }

    /// Create a watcher without evaluating it.
    pub fn build(
        owner: Option<&Rc<dyn WatcherOwner>>,
        source: Source,
        callback: Option<Callback>,
        options: WatcherOptions,
    ) -> Self {
        let (getter, expression) = source.into_parts();
        let watcher = Self(Rc::new(WatcherInner {
            id: WatcherId::next(),
            expression,
            getter,
            callback,
            owner: owner.map(Rc::downgrade),
            dirty: Cell::new(options.lazy),
            options,
            active: Cell::new(true),
            value: RefCell::new(Value::Undefined),
            deps: RefCell::new(SmallVec::new()),
            new_deps: RefCell::new(SmallVec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
        }));
        if let Some(owner) = owner {
            owner.adopt_watcher(&watcher);
        }
        watcher
    }

    pub fn id(&self) -> WatcherId {
        self.0.id
    }

    pub fn expression(&self) -> &str {
        &self.0.expression
    }

    /// Last computed value.
    pub fn value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    pub fn is_lazy(&self) -> bool {
        self.0.options.lazy
    }

    pub fn is_user(&self) -> bool {
        self.0.options.user
    }

    pub fn is_render(&self) -> bool {
        self.0.options.render
    }

    pub fn dep_count(&self) -> usize {
        self.0.deps.borrow().len()
    }

    pub fn owner(&self) -> Option<Rc<dyn WatcherOwner>> {
        self.0.owner.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn downgrade(&self) -> WeakWatcher {
        WeakWatcher(Rc::downgrade(&self.0))
    }

    /// Where the watcher lives, for error reports.
    pub fn describe(&self) -> String {
        let owner = self.owner().map(|o| o.label());
        match (self.0.options.render, owner) {
            (true, Some(owner)) => format!("render function of {owner}"),
            (true, None) => "render function".to_string(),
            (false, Some(owner)) => format!("watcher \"{}\" of {owner}", self.0.expression),
            (false, None) => format!("watcher \"{}\"", self.0.expression),
        }
    }

    /// Evaluate the getter and re-collect dependencies.
    pub fn get(&self) -> Result<Value> {
        let result = {
            let _ctx = ReactiveContext::enter(self.clone());
            let result = match (self.0.getter)() {
                Ok(value) => Ok(value),
                Err(err) if self.0.options.user => {
                    handle_error(&err, &format!("getter for {}", self.describe()));
                    Ok(self.value())
                }
                Err(err) => Err(err),
            };
            if self.0.options.deep {
                if let Ok(value) = &result {
                    traverse(value);
                }
            }
            result
        };
        self.cleanup_deps();
        result
    }

    /// Record `dep` as read during the current evaluation.
    pub fn add_dep(&self, dep: &Dep) {
        let id = dep.id();
        if self.0.new_dep_ids.borrow_mut().insert(id) {
            self.0.new_deps.borrow_mut().push(dep.clone());
            if !self.0.dep_ids.borrow().contains(&id) {
                dep.add_sub(self);
            }
        }
    }

    /// Drop subscriptions not renewed by the last evaluation.
    pub(crate) fn cleanup_deps(&self) {
        {
            let new_ids = self.0.new_dep_ids.borrow();
            for dep in self.0.deps.borrow().iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_sub(self.0.id);
                }
            }
        }
        self.0.dep_ids.swap(&self.0.new_dep_ids);
        self.0.new_dep_ids.borrow_mut().clear();
        self.0.deps.swap(&self.0.new_deps);
        self.0.new_deps.borrow_mut().clear();
    }

    /// React to a dependency change.
    pub fn update(&self) {
        if self.0.options.lazy {
            self.0.dirty.set(true);
        } else if self.0.options.sync {
            if let Err(err) = self.run() {
                handle_error(&err, &self.describe());
            }
        } else {
            scheduler::queue_watcher(self.clone());
        }
    }

    pub(crate) fn run_before(&self) {
        if let Some(before) = &self.0.options.before {
            before();
        }
    }

    /// Re-evaluate and invoke the callback if the value changed.
    ///
    /// Containers and deep watchers always count as changed, since their
    /// contents may have mutated in place.
    pub fn run(&self) -> Result<()> {
        if !self.0.active.get() {
            return Ok(());
        }
        let value = self.get()?;
        let changed = {
            let old = self.0.value.borrow();
            !value.same_value(&old) || value.is_container() || self.0.options.deep
        };
        if !changed {
            return Ok(());
        }
        let old = self.0.value.replace(value.clone());
        if let Some(callback) = &self.0.callback {
            match callback(&value, &old) {
                Ok(()) => {}
                Err(err) if self.0.options.user => {
                    handle_error(&err, &format!("callback for {}", self.describe()));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Recompute a lazy watcher's value and clear its dirty flag.
    pub fn evaluate(&self) -> Result<()> {
        let value = self.get()?;
        *self.0.value.borrow_mut() = value;
        self.0.dirty.set(false);
        Ok(())
    }

    /// Subscribe the current context to all of this watcher's deps.
    pub fn depend(&self) {
        let deps = self.0.deps.borrow().clone();
        for dep in deps {
            dep.depend();
        }
    }

    /// Unsubscribe from everything and deactivate. Idempotent.
    pub fn teardown(&self) {
        if !self.0.active.get() {
            return;
        }
        if let Some(owner) = self.owner() {
            if !owner.is_being_destroyed() {
                owner.release_watcher(self.0.id);
            }
        }
        let deps = std::mem::take(&mut *self.0.deps.borrow_mut());
        for dep in deps {
            dep.remove_sub(self.0.id);
        }
        self.0.dep_ids.borrow_mut().clear();
        self.0.active.set(false);
    }

    pub fn ptr_eq(&self, other: &Watcher) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.0.id)
            .field("expression", &self.0.expression)
            .field("active", &self.0.active.get())
            .field("dirty", &self.0.dirty.get())
            .field("deps", &self.dep_count())
            .finish()
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::reactive::{observe, property_dep};
    use serde_json::json;

    fn sync() -> WatcherOptions {
        WatcherOptions {
            sync: true,
            ..Default::default()
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<(Value, Value)>>>, Callback) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let cb: Callback = Rc::new(move |new: &Value, old: &Value| {
            sink.borrow_mut().push((new.clone(), old.clone()));
            Ok(())
        });
        (calls, cb)
    }

    #[test]
    fn path_watcher_reports_new_and_old() {
        let data = Value::from(json!({ "a": { "b": 1 } }));
        observe(&data, false);
        let (calls, cb) = recorder();
        let _w = Watcher::new(None, Source::path(data.clone(), "a.b"), Some(cb), sync()).unwrap();

        data.get("a").as_object().unwrap().assign("b", 2);
        assert_eq!(*calls.borrow(), vec![(Value::from(2), Value::from(1))]);
    }

    #[test]
    fn same_value_write_does_not_fire() {
        let data = Value::Object(crate::Object::from_entries([("n", Value::from(f64::NAN))]));
        observe(&data, false);
        let (calls, cb) = recorder();
        let _w = Watcher::new(None, Source::path(data.clone(), "n"), Some(cb), sync()).unwrap();

        data.as_object().unwrap().assign("n", f64::NAN);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn stale_dependencies_are_dropped() {
        let data = Value::from(json!({ "flag": true, "a": 1, "b": 2 }));
        observe(&data, false);
        let obj = data.as_object().unwrap().clone();
        let o = obj.clone();
        let w = Watcher::new(
            None,
            Source::getter(move || {
                Ok(if o.get("flag").as_bool() == Some(true) {
                    o.get("a")
                } else {
                    o.get("b")
                })
            }),
            None,
            sync(),
        )
        .unwrap();

        let dep_a = property_dep(&obj, "a").unwrap();
        let dep_b = property_dep(&obj, "b").unwrap();
        assert!(dep_a.has_subscriber(w.id()));
        assert!(!dep_b.has_subscriber(w.id()));

        obj.assign("flag", false);
        assert!(!dep_a.has_subscriber(w.id()));
        assert!(dep_b.has_subscriber(w.id()));
        assert_eq!(w.value(), Value::from(2));
    }

    #[test]
    fn each_dep_is_recorded_once_per_run() {
        let data = Value::from(json!({ "a": 1 }));
        observe(&data, false);
        let d = data.clone();
        let w = Watcher::new(
            None,
            Source::getter(move || {
                d.get("a");
                d.get("a");
                Ok(d.get("a"))
            }),
            None,
            sync(),
        )
        .unwrap();
        assert_eq!(w.dep_count(), 1);
    }

    #[test]
    fn lazy_watcher_only_marks_dirty() {
        let data = Value::from(json!({ "a": 1 }));
        observe(&data, false);
        let d = data.clone();
        let w = Watcher::new(
            None,
            Source::getter(move || Ok(d.get("a"))),
            None,
            WatcherOptions {
                lazy: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert!(w.is_dirty());
        assert!(w.value().is_undefined());
        w.evaluate().unwrap();
        assert_eq!(w.value(), Value::from(1));

        data.as_object().unwrap().assign("a", 5);
        assert!(w.is_dirty());
        assert_eq!(w.value(), Value::from(1));
    }

    #[test]
    fn deep_watcher_sees_nested_mutation() {
        let data = Value::from(json!({ "cfg": { "inner": { "x": 1 } } }));
        observe(&data, false);
        let (calls, cb) = recorder();
        let _w = Watcher::new(
            None,
            Source::path(data.clone(), "cfg"),
            Some(cb),
            WatcherOptions {
                deep: true,
                sync: true,
                ..Default::default()
            },
        )
        .unwrap();

        data.get("cfg").get("inner").as_object().unwrap().assign("x", 2);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn user_getter_error_keeps_previous_value() {
        let reported = Rc::new(Cell::new(0));
        let r = reported.clone();
        config::set_error_handler(Some(Rc::new(move |_: &Error, _: &str| r.set(r.get() + 1))));

        let data = Value::from(json!({ "a": 1 }));
        observe(&data, false);
        let d = data.clone();
        let w = Watcher::new(
            None,
            Source::getter(move || match d.get("a").as_f64() {
                Some(n) if n > 1.0 => Err(Error::thrown("too big")),
                _ => Ok(d.get("a")),
            }),
            None,
            WatcherOptions {
                user: true,
                sync: true,
                ..Default::default()
            },
        )
        .unwrap();

        data.as_object().unwrap().assign("a", 2);
        assert_eq!(reported.get(), 1);
        assert_eq!(w.value(), Value::from(1));
        config::set_error_handler(None);
    }

    #[test]
    fn invalid_path_warns_and_yields_undefined() {
        let warned = Rc::new(Cell::new(false));
        let flag = warned.clone();
        config::set_warn_handler(Some(Rc::new(move |m: &str| {
            flag.set(m.contains("failed watching path"))
        })));

        let w = Watcher::new(None, Source::path(Value::Null, "a[0]"), None, sync()).unwrap();
        assert!(warned.get());
        assert!(w.value().is_undefined());
        config::set_warn_handler(None);
    }

    #[test]
    fn teardown_unsubscribes_everything() {
        let data = Value::from(json!({ "a": 1 }));
        observe(&data, false);
        let (calls, cb) = recorder();
        let w = Watcher::new(None, Source::path(data.clone(), "a"), Some(cb), sync()).unwrap();

        w.teardown();
        w.teardown();
        assert!(!w.is_active());
        assert_eq!(w.dep_count(), 0);

        data.as_object().unwrap().assign("a", 3);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn ids_increase_with_creation_order() {
        let a = Watcher::build(None, Source::getter(|| Ok(Value::Null)), None, Default::default());
        let b = Watcher::build(None, Source::getter(|| Ok(Value::Null)), None, Default::default());
        assert!(a.id() < b.id());
    }
}
