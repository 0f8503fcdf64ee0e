//! Arrays
//!
//! Index assignment and length truncation on an [`Array`] are plain writes
//! and never notify. Structural changes go through the intercepted mutators
//! (`push`, `pop`, `shift`, `unshift`, `splice`, `sort`, `reverse`), which
//! perform the underlying operation, observe any inserted values, and notify
//! the array's observer dep exactly once.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::observer::{observe, Observer};
use super::value::Value;
use crate::error::warn;

/// Arrays never grow past this many elements.
pub const MAX_LENGTH: usize = u32::MAX as usize;

/// Shared handle to a growable list of values.
#[derive(Clone)]
pub struct Array(Rc<ArrayInner>);

struct ArrayInner {
    items: RefCell<Vec<Value>>,
    observer: RefCell<Option<Rc<Observer>>>,
    extensible: Cell<bool>,
    frozen: Cell<bool>,
}

impl Array {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(ArrayInner {
            items: RefCell::new(items),
            observer: RefCell::new(None),
            extensible: Cell::new(true),
            frozen: Cell::new(false),
        }))
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    /// Element at `index`, or `Undefined`. Element reads are not tracked;
    /// watchers that read the array depend on its observer instead.
    pub fn get(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    /// Snapshot of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Plain index assignment. Grows the array with `Undefined` if needed.
    /// Not observable; use [`set`](super::set) for a reactive write.
    pub fn assign(&self, index: usize, value: impl Into<Value>) {
        if self.0.frozen.get() {
            return;
        }
        if index >= MAX_LENGTH {
            warn(format!("Array index {index} is past the maximum array length."));
            return;
        }
        let mut items = self.0.items.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value.into();
    }

    /// Plain length truncation. Not observable.
    pub fn truncate(&self, len: usize) {
        if !self.0.frozen.get() {
            self.0.items.borrow_mut().truncate(len);
        }
    }

    pub(crate) fn pad_to(&self, len: usize) {
        let len = len.min(MAX_LENGTH);
        let mut items = self.0.items.borrow_mut();
        if items.len() < len {
            items.resize(len, Value::Undefined);
        }
    }

    /// Append a value and return the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        let value = value.into();
        let len = self.mutate(|items| {
            items.push(value.clone());
            items.len()
        });
        self.changed(&[value]);
        len
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Value {
        let popped = self.mutate(|items| items.pop().unwrap_or_default());
        self.changed(&[]);
        popped
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Value {
        let shifted = self.mutate(|items| {
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        });
        self.changed(&[]);
        shifted
    }

    /// Prepend a value and return the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        let value = value.into();
        let len = self.mutate(|items| {
            items.insert(0, value.clone());
            items.len()
        });
        self.changed(&[value]);
        len
    }

    /// Remove `delete_count` elements starting at `start`, insert `items`
    /// in their place, and return the removed elements. Out-of-range bounds
    /// are clamped.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        let inserted = items.clone();
        let removed = self.mutate(|current| {
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            current.splice(start..end, items).collect()
        });
        self.changed(&inserted);
        removed
    }

    /// Sort with the natural order: numbers numerically, strings
    /// lexicographically, `Undefined` last.
    pub fn sort(&self) {
        self.sort_by(natural_order);
    }

    /// Sort with a caller-supplied comparator.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
        if self.0.frozen.get() {
            return;
        }
        // The comparator may read this array, so sort a detached copy.
        let mut items = self.to_vec();
        items.sort_by(|a, b| compare(a, b));
        *self.0.items.borrow_mut() = items;
        self.changed(&[]);
    }

    pub fn reverse(&self) {
        self.mutate(|items| items.reverse());
        self.changed(&[]);
    }

    fn mutate<R: Default>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        if self.0.frozen.get() {
            return R::default();
        }
        f(&mut self.0.items.borrow_mut())
    }

    fn changed(&self, inserted: &[Value]) {
        if self.0.frozen.get() {
            return;
        }
        if let Some(ob) = self.observer() {
            for value in inserted {
                observe(value, false);
            }
            ob.dep().notify();
        }
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.get()
    }

    /// Freeze the array: mutators become no-ops and it is never observed.
    pub fn freeze(&self) {
        self.0.extensible.set(false);
        self.0.frozen.set(true);
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen.get()
    }

    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.observer.borrow().clone()
    }

    pub(crate) fn attach_observer(&self, observer: Rc<Observer>) {
        *self.0.observer.borrow_mut() = Some(observer);
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec().iter()).finish()
    }
}

fn natural_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Number(_) => 0,
            Value::String(_) => 1,
            Value::Bool(_) => 2,
            Value::Null => 3,
            Value::Object(_) | Value::Array(_) => 4,
            Value::Undefined => 5,
        }
    }
    match (a, b) {
        // NaN sorts after every other number.
        (Value::Number(x), Value::Number(y)) => match (x.is_nan(), y.is_nan()) {
            (false, false) => x.total_cmp(y),
            (a, b) => a.cmp(&b),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(a: &Array) -> Vec<f64> {
        a.to_vec().iter().filter_map(Value::as_f64).collect()
    }

    #[test]
    fn splice_clamps_and_returns_removed() {
        let a = Array::from_vec(vec![1.into(), 2.into(), 3.into()]);
        let removed = a.splice(1, 10, vec![9.into()]);
        assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
        assert_eq!(nums(&a), vec![1.0, 9.0]);
    }

    #[test]
    fn sort_uses_natural_order() {
        let a = Array::from_vec(vec![Value::Undefined, 3.into(), "b".into(), 1.into(), "a".into()]);
        a.sort();
        assert_eq!(
            a.to_vec(),
            vec![1.into(), 3.into(), "a".into(), "b".into(), Value::Undefined]
        );
    }

    #[test]
    fn sort_places_nan_after_numbers() {
        let mut items = Vec::new();
        for i in 0..60 {
            items.push(Value::from(if i % 3 == 0 { f64::NAN } else { f64::from(60 - i) }));
        }
        let a = Array::from_vec(items);
        a.sort();
        let sorted = nums(&a);
        let (numbers, nans) = sorted.split_at(40);
        assert!(numbers.windows(2).all(|w| w[0] <= w[1]));
        assert!(nans.iter().all(|n| n.is_nan()));
    }

    #[test]
    fn assign_past_max_length_is_ignored() {
        let a = Array::from_vec(vec![1.into()]);
        a.assign(MAX_LENGTH, "x");
        a.assign(usize::MAX, "x");
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn assign_pads_with_undefined() {
        let a = Array::new();
        a.assign(2, "x");
        assert_eq!(a.len(), 3);
        assert!(a.get(0).is_undefined());
    }

    #[test]
    fn frozen_array_ignores_mutators() {
        let a = Array::from_vec(vec![1.into()]);
        a.freeze();
        a.push(2);
        assert!(a.pop().is_undefined());
        assert_eq!(a.len(), 1);
    }
}
