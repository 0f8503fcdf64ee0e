//! In-memory host tree.
//!
//! [`MemoryDom`] implements [`NodeOps`] over reference-counted nodes and
//! counts every structural operation, which makes it the backend of choice
//! for asserting exactly what a patch did.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::node_ops::{AttributeOps, NodeOps};

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Element { tag: String, ns: Option<String> },
    Text,
    Comment,
}

struct NodeInner {
    id: usize,
    kind: NodeKind,
    text: RefCell<String>,
    attrs: RefCell<IndexMap<String, String>>,
    children: RefCell<Vec<MemoryNode>>,
    parent: RefCell<Weak<NodeInner>>,
    scope: RefCell<Option<String>>,
}

/// Handle to a node of a [`MemoryDom`]. Equality is identity.
#[derive(Clone)]
pub struct MemoryNode(Rc<NodeInner>);

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryNode {}

impl fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            NodeKind::Element { tag, .. } => write!(f, "<{tag}#{}>", self.0.id),
            NodeKind::Text => write!(f, "{:?}#{}", self.0.text.borrow(), self.0.id),
            NodeKind::Comment => write!(f, "<!--{}-->#{}", self.0.text.borrow(), self.0.id),
        }
    }
}

impl MemoryNode {
    pub fn id(&self) -> usize {
        self.0.id
    }

    /// Lowercase tag of an element.
    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<String> {
        match &self.0.kind {
            NodeKind::Element { ns, .. } => ns.clone(),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.0.kind == NodeKind::Text
    }

    pub fn is_comment(&self) -> bool {
        self.0.kind == NodeKind::Comment
    }

    /// Text of a text or comment node.
    pub fn text(&self) -> String {
        self.0.text.borrow().clone()
    }

    /// Concatenated text of the subtree, comments excluded.
    pub fn text_content(&self) -> String {
        match self.0.kind {
            NodeKind::Text => self.text(),
            NodeKind::Comment => String::new(),
            NodeKind::Element { .. } => self.children().iter().map(MemoryNode::text_content).collect(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.0.attrs.borrow().get(name).cloned()
    }

    pub fn style_scope(&self) -> Option<String> {
        self.0.scope.borrow().clone()
    }

    pub fn children(&self) -> Vec<MemoryNode> {
        self.0.children.borrow().clone()
    }

    pub fn parent(&self) -> Option<MemoryNode> {
        self.0.parent.borrow().upgrade().map(MemoryNode)
    }

    fn detach(&self) -> bool {
        let Some(parent) = self.parent() else { return false };
        parent.0.children.borrow_mut().retain(|c| c != self);
        *self.0.parent.borrow_mut() = Weak::new();
        true
    }

    /// Serialise the subtree as markup.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match &self.0.kind {
            NodeKind::Text => out.push_str(&self.0.text.borrow()),
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&self.0.text.borrow());
                out.push_str("-->");
            }
            NodeKind::Element { tag, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in self.0.attrs.borrow().iter() {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                for child in self.0.children.borrow().iter() {
                    child.write_html(out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}

/// Counts of structural operations performed through a [`MemoryDom`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OpCounts {
    pub created: usize,
    pub inserted: usize,
    pub moved: usize,
    pub removed: usize,
    pub text_updates: usize,
}

#[derive(Default)]
struct Stats {
    next_id: Cell<usize>,
    created: Cell<usize>,
    inserted: Cell<usize>,
    moved: Cell<usize>,
    removed: Cell<usize>,
    text_updates: Cell<usize>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// An in-memory host tree backend.
#[derive(Clone, Default)]
pub struct MemoryDom {
    stats: Rc<Stats>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, kind: NodeKind, text: &str) -> MemoryNode {
        let id = self.stats.next_id.get();
        self.stats.next_id.set(id + 1);
        bump(&self.stats.created);
        MemoryNode(Rc::new(NodeInner {
            id,
            kind,
            text: RefCell::new(text.to_string()),
            attrs: RefCell::new(IndexMap::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            scope: RefCell::new(None),
        }))
    }

    pub fn counts(&self) -> OpCounts {
        OpCounts {
            created: self.stats.created.get(),
            inserted: self.stats.inserted.get(),
            moved: self.stats.moved.get(),
            removed: self.stats.removed.get(),
            text_updates: self.stats.text_updates.get(),
        }
    }

    pub fn reset_counts(&self) {
        for counter in [
            &self.stats.created,
            &self.stats.inserted,
            &self.stats.moved,
            &self.stats.removed,
            &self.stats.text_updates,
        ] {
            counter.set(0);
        }
    }

    fn attach(&self, parent: &MemoryNode, node: &MemoryNode, reference: Option<&MemoryNode>) {
        if node.detach() {
            bump(&self.stats.moved);
        } else {
            bump(&self.stats.inserted);
        }
        let mut children = parent.0.children.borrow_mut();
        let at = reference
            .and_then(|r| children.iter().position(|c| c == r))
            .unwrap_or(children.len());
        children.insert(at, node.clone());
        *node.0.parent.borrow_mut() = Rc::downgrade(&parent.0);
    }
}

impl fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDom").field("counts", &self.counts()).finish()
    }
}

impl NodeOps for MemoryDom {
    type Node = MemoryNode;

    fn create_element(&self, tag: &str) -> MemoryNode {
        self.node(
            NodeKind::Element {
                tag: tag.to_lowercase(),
                ns: None,
            },
            "",
        )
    }

    fn create_element_ns(&self, namespace: &str, tag: &str) -> MemoryNode {
        self.node(
            NodeKind::Element {
                tag: tag.to_string(),
                ns: Some(namespace.to_string()),
            },
            "",
        )
    }

    fn create_text_node(&self, text: &str) -> MemoryNode {
        self.node(NodeKind::Text, text)
    }

    fn create_comment(&self, text: &str) -> MemoryNode {
        self.node(NodeKind::Comment, text)
    }

    fn insert_before(&self, parent: &MemoryNode, node: &MemoryNode, reference: Option<&MemoryNode>) {
        self.attach(parent, node, reference);
    }

    fn remove_child(&self, parent: &MemoryNode, child: &MemoryNode) {
        if child.parent().as_ref() == Some(parent) {
            child.detach();
            bump(&self.stats.removed);
        }
    }

    fn append_child(&self, parent: &MemoryNode, child: &MemoryNode) {
        self.attach(parent, child, None);
    }

    fn parent_node(&self, node: &MemoryNode) -> Option<MemoryNode> {
        node.parent()
    }

    fn next_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
        let parent = node.parent()?;
        let children = parent.0.children.borrow();
        let at = children.iter().position(|c| c == node)?;
        children.get(at + 1).cloned()
    }

    fn tag_name(&self, node: &MemoryNode) -> String {
        node.tag().map(str::to_uppercase).unwrap_or_default()
    }

    fn set_text_content(&self, node: &MemoryNode, text: &str) {
        bump(&self.stats.text_updates);
        match node.0.kind {
            NodeKind::Text | NodeKind::Comment => *node.0.text.borrow_mut() = text.to_string(),
            NodeKind::Element { .. } => {
                for child in node.children() {
                    child.detach();
                }
                if !text.is_empty() {
                    let text_node = self.create_text_node(text);
                    node.0.children.borrow_mut().push(text_node.clone());
                    *text_node.0.parent.borrow_mut() = Rc::downgrade(&node.0);
                }
            }
        }
    }

    fn set_style_scope(&self, node: &MemoryNode, scope_id: &str) {
        *node.0.scope.borrow_mut() = Some(scope_id.to_string());
    }
}

impl AttributeOps for MemoryDom {
    fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) {
        node.0.attrs.borrow_mut().insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&self, node: &MemoryNode, name: &str) {
        node.0.attrs.borrow_mut().shift_remove(name);
    }
}
