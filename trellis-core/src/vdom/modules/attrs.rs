//! Attribute sync: writes `data.attrs` to host nodes, removing attributes
//! that disappeared since the last render.

use indexmap::IndexMap;

use super::Module;
use crate::vdom::node_ops::AttributeOps;
use crate::vdom::vnode::VNode;

/// Platform module keeping host attributes in sync with vnode data.
#[derive(Debug, Clone)]
pub struct AttrsModule<O> {
    ops: O,
}

impl<O: AttributeOps> AttrsModule<O> {
    pub fn new(ops: O) -> Self {
        Self { ops }
    }

    fn sync(&self, old: Option<&VNode<O::Node>>, vnode: &VNode<O::Node>) {
        let empty = IndexMap::new();
        let old_attrs = old.and_then(VNode::data).map_or(&empty, |d| &d.attrs);
        let new_attrs = vnode.data().map_or(&empty, |d| &d.attrs);
        if old_attrs.is_empty() && new_attrs.is_empty() {
            return;
        }
        let Some(elm) = vnode.elm() else { return };
        // Component placeholders share their root's host node; the root
        // owns its attributes.
        if vnode.is_component() {
            return;
        }

        for (name, value) in new_attrs {
            if old_attrs.get(name) != Some(value) {
                self.ops.set_attribute(&elm, name, value);
            }
        }
        for name in old_attrs.keys() {
            if !new_attrs.contains_key(name) {
                self.ops.remove_attribute(&elm, name);
            }
        }
    }
}

impl<O: AttributeOps> Module<O::Node> for AttrsModule<O> {
    fn create(&self, vnode: &VNode<O::Node>) {
        self.sync(None, vnode);
    }

    fn update(&self, old: &VNode<O::Node>, vnode: &VNode<O::Node>) {
        self.sync(Some(old), vnode);
    }
}
