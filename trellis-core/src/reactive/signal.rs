//! Signal Implementation
//!
//! A [`Signal`] is a single typed reactive cell. It is the Rust-native
//! counterpart of a reactive property: reading it inside a watcher subscribes
//! that watcher to the signal's [`Dep`], writing a different value notifies.
//!
//! Use signals for state that lives in Rust code; use observed [`Value`]
//! containers for data that components render from.
//!
//! [`Value`]: super::Value

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::dep::{Dep, DepId};

/// A reactive signal holding a value of type `T`.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T: 'static> {
    dep: Dep,
    value: Rc<RefCell<T>>,
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            dep: Dep::new(),
            value: Rc::new(RefCell::new(value)),
        }
    }

    pub fn id(&self) -> DepId {
        self.dep.id()
    }

    /// Borrow the value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.dep.depend();
        f(&self.value.borrow())
    }

    /// Mutate in place and notify unconditionally.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.borrow_mut());
        self.dep.notify();
    }

    pub fn subscriber_count(&self) -> usize {
        self.dep.subscriber_count()
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Read the value, tracking the read.
    pub fn get(&self) -> T {
        self.dep.depend();
        self.value.borrow().clone()
    }

    /// Read the value without tracking.
    pub fn get_untracked(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Replace the value. Equal values are ignored.
    pub fn set(&self, value: T) {
        if *self.value.borrow() == value {
            return;
        }
        *self.value.borrow_mut() = value;
        self.dep.notify();
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            dep: self.dep.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &*self.value.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
