//! Host Tree Operations
//!
//! The reconciler never touches a concrete tree. Everything it does to host
//! nodes goes through a [`NodeOps`] backend, so the same diff drives an
//! in-memory tree in tests and a real document elsewhere.

use std::fmt::Debug;

/// Primitive operations on a host tree.
pub trait NodeOps {
    /// Handle to a host node. Equality must be node identity.
    type Node: Clone + PartialEq + Debug + 'static;

    fn create_element(&self, tag: &str) -> Self::Node;

    fn create_element_ns(&self, namespace: &str, tag: &str) -> Self::Node;

    fn create_text_node(&self, text: &str) -> Self::Node;

    fn create_comment(&self, text: &str) -> Self::Node;

    /// Insert `node` into `parent` before `reference`, or append it when
    /// `reference` is `None`. A node that already has a parent is moved.
    fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>);

    fn remove_child(&self, parent: &Self::Node, child: &Self::Node);

    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Tag name as the host reports it; compared case-insensitively.
    fn tag_name(&self, node: &Self::Node) -> String;

    /// Replace the text of a text or comment node, or the whole content of
    /// an element.
    fn set_text_content(&self, node: &Self::Node, text: &str);

    /// Mark `node` with a scoped-style id.
    fn set_style_scope(&self, _node: &Self::Node, _scope_id: &str) {}
}

/// Attribute access, needed by [`AttrsModule`](super::AttrsModule).
pub trait AttributeOps: NodeOps {
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    fn remove_attribute(&self, node: &Self::Node, name: &str);
}
