//! Observation
//!
//! [`observe`] turns a container into a reactive one. Objects have every
//! property converted by [`define_reactive`]; arrays have each element
//! observed and rely on their intercepted mutators for notification. Each
//! observed container gets one [`Observer`], whose dep fires on structural
//! change (keys added or removed, array mutated).
//!
//! # How It Works
//!
//! A reactive property keeps its own [`Dep`]. Reading it while a watcher is
//! evaluating subscribes the watcher to that dep, to the child container's
//! observer dep (so `set`/`del`/array mutation on the child re-runs the
//! reader), and, for array children, to every nested element's observer dep.
//! Writing it compares with [`Value::same_value`], re-observes the new value
//! and notifies.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::array::{Array, MAX_LENGTH};
use super::context::ReactiveContext;
use super::dep::Dep;
use super::object::{Getter, Object, Property, Setter, Slot};
use super::value::Value;
use crate::error::{warn, Error};

thread_local! {
    static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Globally enable or disable observation of new values on this thread.
pub fn set_observing(enabled: bool) {
    SHOULD_OBSERVE.with(|s| s.set(enabled));
}

pub fn is_observing() -> bool {
    SHOULD_OBSERVE.with(Cell::get)
}

/// Run `f` with observation disabled, restoring the previous setting after.
pub fn without_observing<R>(f: impl FnOnce() -> R) -> R {
    struct Restore(bool);
    impl Drop for Restore {
        fn drop(&mut self) {
            set_observing(self.0);
        }
    }
    let _restore = Restore(is_observing());
    set_observing(false);
    f()
}

/// Per-container reactive state.
pub struct Observer {
    dep: Dep,
    vm_count: Cell<usize>,
}

impl Observer {
    fn new() -> Self {
        Self {
            dep: Dep::new(),
            vm_count: Cell::new(0),
        }
    }

    /// Dep notified on structural change of the container.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    /// How many components use the container as their root data.
    pub fn vm_count(&self) -> usize {
        self.vm_count.get()
    }

    pub(crate) fn release_root(&self) {
        self.vm_count.set(self.vm_count.get().saturating_sub(1));
    }
}

/// Observe `value` if it is an extensible container and observation is
/// enabled. Returns the container's observer, existing or new.
///
/// Observing an already observed container returns the existing observer
/// and does not walk it again. `as_root_data` counts the container as a
/// component's root data.
pub fn observe(value: &Value, as_root_data: bool) -> Option<Rc<Observer>> {
    let observer = match value {
        Value::Object(object) => match object.observer() {
            Some(ob) => Some(ob),
            None if is_observing() && object.is_extensible() => {
                let ob = Rc::new(Observer::new());
                object.attach_observer(ob.clone());
                walk(object);
                Some(ob)
            }
            None => None,
        },
        Value::Array(array) => match array.observer() {
            Some(ob) => Some(ob),
            None if is_observing() && array.is_extensible() => {
                let ob = Rc::new(Observer::new());
                array.attach_observer(ob.clone());
                observe_items(array);
                Some(ob)
            }
            None => None,
        },
        _ => None,
    };

    if as_root_data {
        if let Some(ob) = &observer {
            ob.vm_count.set(ob.vm_count.get() + 1);
        }
    }
    observer
}

fn walk(object: &Object) {
    for key in object.keys() {
        define_reactive(object, &key, None, None, false);
    }
}

fn observe_items(array: &Array) {
    for item in array.to_vec() {
        observe(&item, false);
    }
}

/// Subscribe the current watcher to the observer dep of every container
/// nested in `array`, since element reads cannot be intercepted.
pub(crate) fn depend_array(array: &Array) {
    for item in array.to_vec() {
        match &item {
            Value::Object(o) => {
                if let Some(ob) = o.observer() {
                    ob.dep().depend();
                }
            }
            Value::Array(a) => {
                if let Some(ob) = a.observer() {
                    ob.dep().depend();
                }
                depend_array(a);
            }
            _ => {}
        }
    }
}

/// A property converted to reactive form.
pub(crate) struct ReactiveProperty {
    key: String,
    dep: Dep,
    value: RefCell<Value>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    child: RefCell<Option<Rc<Observer>>>,
    shallow: bool,
    custom_setter: Option<Rc<dyn Fn()>>,
}

impl ReactiveProperty {
    fn raw(&self) -> Value {
        match &self.getter {
            Some(get) => get(),
            None => self.value.borrow().clone(),
        }
    }

    pub(crate) fn peek(&self) -> Value {
        let _untracked = ReactiveContext::untracked();
        self.raw()
    }

    pub(crate) fn get(&self) -> Value {
        let value = self.raw();
        if ReactiveContext::is_tracking() {
            self.dep.depend();
            let child = self.child.borrow().clone();
            if let Some(child) = child {
                child.dep().depend();
                if let Value::Array(array) = &value {
                    depend_array(array);
                }
            }
        }
        value
    }

    pub(crate) fn set(&self, new_value: Value) {
        let old = self.peek();
        if new_value.same_value(&old) {
            return;
        }
        if let Some(custom) = &self.custom_setter {
            custom();
        }
        // Read-only accessor.
        if self.getter.is_some() && self.setter.is_none() {
            return;
        }
        match &self.setter {
            Some(set) => set(new_value.clone()),
            None => *self.value.borrow_mut() = new_value.clone(),
        }
        let child = if self.shallow {
            None
        } else {
            observe(&new_value, false)
        };
        *self.child.borrow_mut() = child;
        tracing::trace!(key = %self.key, "reactive property changed");
        self.dep.notify();
    }

    pub(crate) fn dep(&self) -> &Dep {
        &self.dep
    }
}

/// Convert `key` on `object` into a reactive property.
///
/// Non-configurable properties are left alone. A user accessor already on
/// the key is preserved and called through. `value` overrides the current
/// value; `custom_setter` runs before every effective write; `shallow`
/// skips observing the value.
pub fn define_reactive(
    object: &Object,
    key: &str,
    value: Option<Value>,
    custom_setter: Option<Rc<dyn Fn()>>,
    shallow: bool,
) {
    let (getter, setter, current) = match object.slot(key) {
        Some(Property {
            configurable: false,
            ..
        }) => return,
        Some(Property { slot, .. }) => match slot {
            Slot::Data(v) => (None, None, v),
            Slot::Accessor(accessor) => (accessor.get, accessor.set, Value::Undefined),
            Slot::Reactive(prop) => {
                let (r, w) = (prop.clone(), prop);
                let get: Getter = Rc::new(move || r.get());
                let set: Setter = Rc::new(move |v| w.set(v));
                (Some(get), Some(set), Value::Undefined)
            }
        },
        None if !object.is_extensible() => return,
        None => (None, None, Value::Undefined),
    };

    let initial = match value {
        Some(v) => v,
        None => match (&getter, &setter) {
            (None, _) => current,
            (Some(get), Some(_)) => get(),
            (Some(_), None) => Value::Undefined,
        },
    };

    let child = if shallow { None } else { observe(&initial, false) };
    let property = ReactiveProperty {
        key: key.to_string(),
        dep: Dep::new(),
        value: RefCell::new(if getter.is_some() {
            Value::Undefined
        } else {
            initial
        }),
        getter,
        setter,
        child: RefCell::new(child),
        shallow,
        custom_setter,
    };

    object.define(
        key,
        Property {
            slot: Slot::Reactive(Rc::new(property)),
            configurable: true,
            writable: true,
        },
    );
}

/// Dep of the reactive property `key`, if the property is reactive.
pub fn property_dep(object: &Object, key: &str) -> Option<Dep> {
    match object.slot(key)?.slot {
        Slot::Reactive(prop) => Some(prop.dep().clone()),
        _ => None,
    }
}

/// Add or update a property so that the change is observable.
///
/// On arrays `key` must be an index: the array grows if needed and the
/// element is replaced through `splice`. On objects an existing key is
/// assigned normally; a new key becomes reactive and the object's observer
/// notifies. Returns the value that was set.
pub fn set(target: &Value, key: &str, value: impl Into<Value>) -> Value {
    let value = value.into();
    match target {
        Value::Array(array) => match key.parse::<usize>() {
            Ok(index) if index >= MAX_LENGTH => warn(
                Error::InvalidTarget {
                    operation: "set",
                    found: "an array index past the maximum length",
                }
                .to_string(),
            ),
            Ok(index) => {
                array.pad_to(index);
                array.splice(index, 1, vec![value.clone()]);
            }
            Err(_) => warn(
                Error::InvalidTarget {
                    operation: "set",
                    found: "an array with a non-index key",
                }
                .to_string(),
            ),
        },
        Value::Object(object) => {
            if object.contains_key(key) {
                object.assign(key, value.clone());
                return value;
            }
            let observer = object.observer();
            if observer.as_ref().is_some_and(|ob| ob.vm_count() > 0) {
                warn(
                    "Avoid adding reactive properties to a component instance or its root \
                     data at runtime - declare it upfront in the data option.",
                );
                return value;
            }
            match observer {
                None => object.assign(key, value.clone()),
                Some(ob) => {
                    define_reactive(object, key, Some(value.clone()), None, false);
                    ob.dep().notify();
                }
            }
        }
        other => warn(
            Error::InvalidTarget {
                operation: "set",
                found: other.type_name(),
            }
            .to_string(),
        ),
    }
    value
}

/// Delete a property so that the change is observable.
pub fn del(target: &Value, key: &str) {
    match target {
        Value::Array(array) => match key.parse::<usize>() {
            Ok(index) => {
                array.splice(index, 1, Vec::new());
            }
            Err(_) => warn(
                Error::InvalidTarget {
                    operation: "delete",
                    found: "an array with a non-index key",
                }
                .to_string(),
            ),
        },
        Value::Object(object) => {
            let observer = object.observer();
            if observer.as_ref().is_some_and(|ob| ob.vm_count() > 0) {
                warn(
                    "Avoid deleting properties on a component instance or its root data - \
                     just set it to null.",
                );
                return;
            }
            if !object.remove(key) {
                return;
            }
            if let Some(ob) = observer {
                ob.dep().notify();
            }
        }
        other => warn(
            Error::InvalidTarget {
                operation: "delete",
                found: other.type_name(),
            }
            .to_string(),
        ),
    }
}
