//! Template refs: named handles from a component to nodes or child
//! components in its rendered output.

use std::fmt;

use super::Module;
use crate::vdom::component::Component;
use crate::vdom::vnode::VNode;

/// What a ref points at.
pub enum RefTarget<N: 'static> {
    Element(N),
    Component(Component<N>),
}

impl<N: Clone + 'static> Clone for RefTarget<N> {
    fn clone(&self) -> Self {
        match self {
            RefTarget::Element(n) => RefTarget::Element(n.clone()),
            RefTarget::Component(c) => RefTarget::Component(c.clone()),
        }
    }
}

impl<N: PartialEq + 'static> PartialEq for RefTarget<N> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RefTarget::Element(a), RefTarget::Element(b)) => a == b,
            (RefTarget::Component(a), RefTarget::Component(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl<N: fmt::Debug + 'static> fmt::Debug for RefTarget<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Element(n) => f.debug_tuple("Element").field(n).finish(),
            RefTarget::Component(c) => f.debug_tuple("Component").field(c).finish(),
        }
    }
}

/// A registered ref: a single target, or a list for refs inside loops.
pub enum RefEntry<N: 'static> {
    Single(RefTarget<N>),
    List(Vec<RefTarget<N>>),
}

impl<N: Clone + 'static> Clone for RefEntry<N> {
    fn clone(&self) -> Self {
        match self {
            RefEntry::Single(t) => RefEntry::Single(t.clone()),
            RefEntry::List(l) => RefEntry::List(l.clone()),
        }
    }
}

impl<N: fmt::Debug + 'static> fmt::Debug for RefEntry<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefEntry::Single(t) => t.fmt(f),
            RefEntry::List(l) => f.debug_list().entries(l).finish(),
        }
    }
}

impl<N: 'static> RefEntry<N> {
    /// The element, if this is a single element ref.
    pub fn element(&self) -> Option<&N> {
        match self {
            RefEntry::Single(RefTarget::Element(n)) => Some(n),
            _ => None,
        }
    }

    /// The component, if this is a single component ref.
    pub fn component(&self) -> Option<&Component<N>> {
        match self {
            RefEntry::Single(RefTarget::Component(c)) => Some(c),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RefEntry::Single(_) => 1,
            RefEntry::List(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps the rendering component's refs in sync with its output.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefsModule;

impl<N: Clone + PartialEq + 'static> Module<N> for RefsModule {
    fn create(&self, vnode: &VNode<N>) {
        register_ref(vnode, false);
    }

    fn update(&self, old: &VNode<N>, vnode: &VNode<N>) {
        let name = |v: &VNode<N>| v.data().and_then(|d| d.ref_name.clone());
        if name(old) != name(vnode) {
            register_ref(old, true);
            register_ref(vnode, false);
        }
    }

    fn destroy(&self, vnode: &VNode<N>) {
        register_ref(vnode, true);
    }
}

/// Add or remove `vnode`'s ref on its rendering component.
pub fn register_ref<N: Clone + PartialEq + 'static>(vnode: &VNode<N>, is_removal: bool) {
    let Some(data) = vnode.data() else { return };
    let Some(name) = data.ref_name.clone() else { return };
    let Some(context) = vnode.context() else { return };
    let target = match vnode.component_instance() {
        Some(instance) => RefTarget::Component(instance),
        None => match vnode.elm() {
            Some(elm) => RefTarget::Element(elm),
            None => return,
        },
    };
    let in_for = data.ref_in_for;

    context.with_refs(|refs| {
        if is_removal {
            match refs.get_mut(&name) {
                Some(RefEntry::List(list)) => list.retain(|t| *t != target),
                Some(RefEntry::Single(current)) if *current == target => {
                    refs.shift_remove(&name);
                }
                _ => {}
            }
        } else if in_for {
            match refs.get_mut(&name) {
                Some(RefEntry::List(list)) => {
                    if !list.contains(&target) {
                        list.push(target);
                    }
                }
                _ => {
                    refs.insert(name, RefEntry::List(vec![target]));
                }
            }
        } else {
            refs.insert(name, RefEntry::Single(target));
        }
    });
}
