//! Objects
//!
//! An [`Object`] is an ordered map of named properties. Each property slot is
//! either plain data, a user accessor pair, or a reactive property installed
//! by [`define_reactive`](super::define_reactive). Plain assignment through
//! [`Object::assign`] goes through whatever slot is installed, so writes to a
//! reactive property notify while writes to a plain data slot do not.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::observer::{Observer, ReactiveProperty};
use super::value::Value;

/// Getter half of a user accessor.
pub type Getter = Rc<dyn Fn() -> Value>;

/// Setter half of a user accessor.
pub type Setter = Rc<dyn Fn(Value)>;

/// A user-defined accessor pair. Either half may be missing; a getter with
/// no setter is read-only.
#[derive(Clone, Default)]
pub struct Accessor {
    pub get: Option<Getter>,
    pub set: Option<Setter>,
}

impl Accessor {
    pub fn new(get: impl Fn() -> Value + 'static, set: impl Fn(Value) + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: Some(Rc::new(set)),
        }
    }

    pub fn read_only(get: impl Fn() -> Value + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: None,
        }
    }
}

#[derive(Clone)]
pub(crate) enum Slot {
    Data(Value),
    Accessor(Accessor),
    Reactive(Rc<ReactiveProperty>),
}

#[derive(Clone)]
pub(crate) struct Property {
    pub(crate) slot: Slot,
    pub(crate) configurable: bool,
    pub(crate) writable: bool,
}

impl Property {
    pub(crate) fn data(value: Value) -> Self {
        Self {
            slot: Slot::Data(value),
            configurable: true,
            writable: true,
        }
    }
}

/// Shared handle to an ordered property map.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

pub(crate) struct ObjectInner {
    pub(crate) props: RefCell<IndexMap<String, Property>>,
    observer: RefCell<Option<Rc<Observer>>>,
    extensible: Cell<bool>,
    frozen: Cell<bool>,
}

impl Object {
    pub fn new() -> Self {
        Self(Rc::new(ObjectInner {
            props: RefCell::new(IndexMap::new()),
            observer: RefCell::new(None),
            extensible: Cell::new(true),
            frozen: Cell::new(false),
        }))
    }

    /// Build a plain (unobserved) object from key/value pairs.
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let object = Self::new();
        {
            let mut props = object.0.props.borrow_mut();
            for (key, value) in entries {
                props.insert(key.into(), Property::data(value));
            }
        }
        object
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Read a property. Reads through reactive properties are tracked.
    pub fn get(&self, key: &str) -> Value {
        let slot = self.0.props.borrow().get(key).map(|p| p.slot.clone());
        match slot {
            None => Value::Undefined,
            Some(Slot::Data(value)) => value,
            Some(Slot::Accessor(accessor)) => accessor.get.map(|g| g()).unwrap_or_default(),
            Some(Slot::Reactive(prop)) => prop.get(),
        }
    }

    /// Read a property without registering a dependency.
    pub fn get_untracked(&self, key: &str) -> Value {
        let slot = self.0.props.borrow().get(key).map(|p| p.slot.clone());
        match slot {
            None => Value::Undefined,
            Some(Slot::Data(value)) => value,
            Some(Slot::Accessor(accessor)) => accessor.get.map(|g| g()).unwrap_or_default(),
            Some(Slot::Reactive(prop)) => prop.peek(),
        }
    }

    /// Plain assignment. Existing slots handle the write themselves; a new
    /// key is added as a non-reactive data property if the object is
    /// extensible and silently dropped otherwise.
    pub fn assign(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let slot = self.0.props.borrow().get(key).cloned();
        match slot {
            Some(Property {
                slot: Slot::Data(_),
                writable,
                ..
            }) => {
                if writable {
                    if let Some(prop) = self.0.props.borrow_mut().get_mut(key) {
                        prop.slot = Slot::Data(value);
                    }
                }
            }
            Some(Property {
                slot: Slot::Accessor(accessor),
                ..
            }) => {
                if let Some(set) = accessor.set {
                    set(value);
                }
            }
            Some(Property {
                slot: Slot::Reactive(prop),
                ..
            }) => prop.set(value),
            None => {
                if self.0.extensible.get() {
                    self.0
                        .props
                        .borrow_mut()
                        .insert(key.to_string(), Property::data(value));
                }
            }
        }
    }

    /// Install a plain data property, replacing any configurable slot.
    /// Returns `false` if the existing slot is not configurable or the key is
    /// new and the object is not extensible.
    pub fn define_value(&self, key: &str, value: Value, configurable: bool) -> bool {
        self.define(
            key,
            Property {
                slot: Slot::Data(value),
                configurable,
                writable: true,
            },
        )
    }

    /// Install an accessor property.
    pub fn define_accessor(&self, key: &str, accessor: Accessor, configurable: bool) -> bool {
        self.define(
            key,
            Property {
                slot: Slot::Accessor(accessor),
                configurable,
                writable: true,
            },
        )
    }

    pub(crate) fn define(&self, key: &str, property: Property) -> bool {
        let mut props = self.0.props.borrow_mut();
        match props.get_mut(key) {
            Some(existing) if !existing.configurable => false,
            Some(existing) => {
                *existing = property;
                true
            }
            None if !self.0.extensible.get() => false,
            None => {
                props.insert(key.to_string(), property);
                true
            }
        }
    }

    /// Delete an own property. Non-configurable properties stay.
    pub fn remove(&self, key: &str) -> bool {
        let mut props = self.0.props.borrow_mut();
        match props.get(key) {
            Some(p) if p.configurable => props.shift_remove(key).is_some(),
            _ => false,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    /// Own keys in insertion order. Not tracked.
    pub fn keys(&self) -> Vec<String> {
        self.0.props.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.props.borrow().is_empty()
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.get()
    }

    pub fn prevent_extensions(&self) {
        self.0.extensible.set(false);
    }

    /// Make every property non-configurable and every data property
    /// read-only. Frozen objects are never observed.
    pub fn freeze(&self) {
        self.0.extensible.set(false);
        self.0.frozen.set(true);
        for prop in self.0.props.borrow_mut().values_mut() {
            prop.configurable = false;
            prop.writable = false;
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen.get()
    }

    /// The observer attached by [`observe`](super::observe), if any.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.observer.borrow().clone()
    }

    pub(crate) fn attach_observer(&self, observer: Rc<Observer>) {
        *self.0.observer.borrow_mut() = Some(observer);
    }

    /// Whether `key` is backed by a reactive property.
    pub fn is_reactive(&self, key: &str) -> bool {
        matches!(
            self.0.props.borrow().get(key),
            Some(Property {
                slot: Slot::Reactive(_),
                ..
            })
        )
    }

    pub(crate) fn slot(&self, key: &str) -> Option<Property> {
        self.0.props.borrow().get(key).cloned()
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("keys", &self.keys())
            .field("observed", &self.observer().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_adds_plain_data() {
        let o = Object::new();
        o.assign("a", 1);
        assert_eq!(o.get("a"), Value::from(1));
        assert!(!o.is_reactive("a"));
    }

    #[test]
    fn frozen_object_ignores_writes() {
        let o = Object::from_entries([("a", Value::from(1))]);
        o.freeze();
        o.assign("a", 2);
        o.assign("b", 3);
        assert_eq!(o.get("a"), Value::from(1));
        assert!(!o.contains_key("b"));
        assert!(!o.remove("a"));
    }

    #[test]
    fn accessor_routes_reads_and_writes() {
        let store = Rc::new(RefCell::new(Value::from(0)));
        let (r, w) = (store.clone(), store.clone());
        let o = Object::new();
        o.define_accessor(
            "x",
            Accessor::new(move || r.borrow().clone(), move |v| *w.borrow_mut() = v),
            true,
        );

        o.assign("x", 7);
        assert_eq!(o.get("x"), Value::from(7));
        assert_eq!(*store.borrow(), Value::from(7));
    }

    #[test]
    fn non_configurable_slot_cannot_be_redefined() {
        let o = Object::new();
        assert!(o.define_value("k", Value::from(1), false));
        assert!(!o.define_value("k", Value::from(2), true));
        assert_eq!(o.get("k"), Value::from(1));
    }
}
