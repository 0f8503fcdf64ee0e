//! Patch Modules
//!
//! A [`Module`] contributes behaviour at fixed points of the patch cycle:
//! when a host node is created, updated, activated from a keep-alive cache,
//! removed or destroyed. Platform modules (attributes, listeners, styles)
//! are supplied by the embedder; [`RefsModule`] and [`DirectivesModule`]
//! are always appended after them.

mod attrs;
mod directives;
mod refs;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::vnode::VNode;

pub use attrs::AttrsModule;
pub use directives::{Directive, DirectiveBinding, DirectiveDef, DirectiveHook, DirectivesModule};
pub use refs::{register_ref, RefEntry, RefTarget, RefsModule};

/// Hooks a module can implement. All default to doing nothing.
pub trait Module<N: 'static> {
    /// A host node was created for `vnode`.
    fn create(&self, _vnode: &VNode<N>) {}

    /// A kept-alive component subtree was re-inserted.
    fn activate(&self, _vnode: &VNode<N>) {}

    /// `vnode` was patched over `old`.
    fn update(&self, _old: &VNode<N>, _vnode: &VNode<N>) {}

    /// `vnode`'s host node is about to be removed. Removal happens once
    /// every module and the vnode's own remove hook has called
    /// [`RemoveHandle::done`].
    fn remove(&self, _vnode: &VNode<N>, done: RemoveHandle) {
        done.done();
    }

    /// `vnode` is being destroyed.
    fn destroy(&self, _vnode: &VNode<N>) {}
}

/// Countdown that removes a host node once every participant is done.
#[derive(Clone)]
pub struct RemoveHandle(Rc<RemoveState>);

struct RemoveState {
    listeners: Cell<usize>,
    action: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl RemoveHandle {
    pub(crate) fn new(listeners: usize, action: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RemoveState {
            listeners: Cell::new(listeners),
            action: RefCell::new(Some(Box::new(action))),
        }))
    }

    pub(crate) fn add_listeners(&self, count: usize) {
        self.0.listeners.set(self.0.listeners.get() + count);
    }

    /// Signal that one participant is finished. The last call removes the
    /// node; extra calls are ignored.
    pub fn done(&self) {
        let remaining = self.0.listeners.get().saturating_sub(1);
        self.0.listeners.set(remaining);
        if remaining == 0 {
            let action = self.0.action.borrow_mut().take();
            if let Some(action) = action {
                action();
            }
        }
    }

    /// Participants still outstanding.
    pub fn pending(&self) -> usize {
        self.0.listeners.get()
    }
}

impl fmt::Debug for RemoveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveHandle")
            .field("pending", &self.pending())
            .finish()
    }
}
