//! Virtual Nodes
//!
//! A [`VNode`] describes one node of the desired tree: an element, a text
//! node, a comment, or a component placeholder. Render functions build a
//! fresh tree of vnodes every time; the [`Patcher`](super::Patcher) then
//! reconciles it against the previous tree and the host nodes attached to it.
//!
//! VNodes are shared handles. The reconciler writes into them (host node,
//! component instance, parent link), so a vnode that already has a host node
//! must be cloned with [`VNode::clone_vnode`] before it can be mounted again.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::component::{Component, ComponentOptions, WeakComponent};
use super::modules::{Directive, RemoveHandle};
use crate::error::warn;
use crate::reactive::Value;

/// Identity of a vnode among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    /// A non-integral number, stored as its bit pattern. All NaNs share one.
    Num(u64),
    Str(Rc<str>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Num(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Key::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Int(n.into())
    }
}

impl From<usize> for Key {
    fn from(n: usize) -> Self {
        Key::Int(n as i64)
    }
}

impl From<f64> for Key {
    fn from(n: f64) -> Self {
        if n.is_nan() {
            Key::Num(f64::NAN.to_bits())
        } else if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            Key::Int(n as i64)
        } else {
            Key::Num(n.to_bits())
        }
    }
}

/// Event listener.
pub type Handler = Rc<dyn Fn(&Value)>;

/// Hook receiving one vnode.
pub type VNodeCallback<N> = Rc<dyn Fn(&VNode<N>)>;

/// Hook receiving `(old, new)`.
pub type PatchCallback<N> = Rc<dyn Fn(&VNode<N>, &VNode<N>)>;

/// Hooks a render function can attach to a vnode.
pub struct VNodeHooks<N: 'static> {
    pub create: Option<VNodeCallback<N>>,
    pub insert: Option<VNodeCallback<N>>,
    pub prepatch: Option<PatchCallback<N>>,
    pub update: Option<PatchCallback<N>>,
    pub postpatch: Option<PatchCallback<N>>,
    /// Deferred removal: the host node goes away once the handle completes.
    pub remove: Option<Rc<dyn Fn(&VNode<N>, RemoveHandle)>>,
    pub destroy: Option<VNodeCallback<N>>,
}

impl<N: 'static> Default for VNodeHooks<N> {
    fn default() -> Self {
        Self {
            create: None,
            insert: None,
            prepatch: None,
            update: None,
            postpatch: None,
            remove: None,
            destroy: None,
        }
    }
}

impl<N: 'static> Clone for VNodeHooks<N> {
    fn clone(&self) -> Self {
        Self {
            create: self.create.clone(),
            insert: self.insert.clone(),
            prepatch: self.prepatch.clone(),
            update: self.update.clone(),
            postpatch: self.postpatch.clone(),
            remove: self.remove.clone(),
            destroy: self.destroy.clone(),
        }
    }
}

/// Attributes, listeners, hooks and refs of a vnode.
pub struct VNodeData<N: 'static> {
    pub attrs: IndexMap<String, String>,
    pub props: IndexMap<String, Value>,
    pub class: Option<String>,
    pub style: IndexMap<String, String>,
    pub on: IndexMap<String, Handler>,
    pub directives: Vec<Directive<N>>,
    pub hook: VNodeHooks<N>,
    pub ref_name: Option<String>,
    pub ref_in_for: bool,
    pub keep_alive: bool,
}

impl<N: 'static> Default for VNodeData<N> {
    fn default() -> Self {
        Self {
            attrs: IndexMap::new(),
            props: IndexMap::new(),
            class: None,
            style: IndexMap::new(),
            on: IndexMap::new(),
            directives: Vec::new(),
            hook: VNodeHooks::default(),
            ref_name: None,
            ref_in_for: false,
            keep_alive: false,
        }
    }
}

impl<N: 'static> Clone for VNodeData<N> {
    fn clone(&self) -> Self {
        Self {
            attrs: self.attrs.clone(),
            props: self.props.clone(),
            class: self.class.clone(),
            style: self.style.clone(),
            on: self.on.clone(),
            directives: self.directives.clone(),
            hook: self.hook.clone(),
            ref_name: self.ref_name.clone(),
            ref_in_for: self.ref_in_for,
            keep_alive: self.keep_alive,
        }
    }
}

impl<N: 'static> VNodeData<N> {
    /// Build vnode data from a plain object value.
    ///
    /// Recognised keys: `key` is ignored here (see [`create_element`]),
    /// `attrs`, `props`, `class`, `style`, `ref` and `refInFor`. Returns
    /// `None` and warns if the object is observed, since reusing reactive
    /// data as vnode data would make every render share one mutable record.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.observer().is_some() {
            warn(format!(
                "Avoid using observed data object as vnode data: {}\n\
                 Always create fresh vnode data objects in each render!",
                value.to_json()
            ));
            return None;
        }

        let mut data = Self::default();
        let strings = |v: Value| -> IndexMap<String, String> {
            v.as_object()
                .map(|o| {
                    o.keys()
                        .into_iter()
                        .map(|k| {
                            let s = o.get_untracked(&k).to_display_string();
                            (k, s)
                        })
                        .collect()
                })
                .unwrap_or_default()
        };
        data.attrs = strings(object.get_untracked("attrs"));
        data.style = strings(object.get_untracked("style"));
        if let Some(props) = object.get_untracked("props").as_object() {
            data.props = props
                .keys()
                .into_iter()
                .map(|k| {
                    let v = props.get_untracked(&k);
                    (k, v)
                })
                .collect();
        }
        data.class = object.get_untracked("class").as_str().map(str::to_string);
        data.ref_name = object.get_untracked("ref").as_str().map(str::to_string);
        data.ref_in_for = object.get_untracked("refInFor").as_bool().unwrap_or(false);
        Some(data)
    }
}

static CID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_cid() -> u64 {
    CID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Placeholder information for a component vnode.
pub struct ComponentVNodeOptions<N: 'static> {
    pub ctor: Rc<ComponentOptions<N>>,
    pub props_data: IndexMap<String, Value>,
    pub listeners: IndexMap<String, Handler>,
    /// Slot content passed by the parent.
    pub children: Option<Vec<VNode<N>>>,
}

impl<N: 'static> Clone for ComponentVNodeOptions<N> {
    fn clone(&self) -> Self {
        Self {
            ctor: self.ctor.clone(),
            props_data: self.props_data.clone(),
            listeners: self.listeners.clone(),
            children: self.children.clone(),
        }
    }
}

/// Handle to a component definition that may not be loaded yet.
#[derive(Clone)]
pub struct AsyncFactory(Rc<AsyncFactoryState>);

struct AsyncFactoryState {
    resolved: Cell<bool>,
    failed: Cell<bool>,
}

impl AsyncFactory {
    pub fn new() -> Self {
        Self(Rc::new(AsyncFactoryState {
            resolved: Cell::new(false),
            failed: Cell::new(false),
        }))
    }

    pub fn resolve(&self) {
        self.0.resolved.set(true);
    }

    pub fn fail(&self) {
        self.0.failed.set(true);
    }

    pub fn is_resolved(&self) -> bool {
        self.0.resolved.get()
    }

    pub fn has_error(&self) -> bool {
        self.0.failed.get()
    }

    pub fn ptr_eq(&self, other: &AsyncFactory) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for AsyncFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// A virtual node.
pub struct VNode<N: 'static>(Rc<VNodeInner<N>>);

impl<N: 'static> Clone for VNode<N> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

struct VNodeInner<N: 'static> {
    tag: Option<String>,
    data: Option<VNodeData<N>>,
    children: RefCell<Option<Vec<VNode<N>>>>,
    text: Option<String>,
    key: Option<Key>,
    ns: Option<String>,
    is_comment: bool,
    is_static: bool,
    is_once: bool,
    is_cloned: bool,
    component: Option<ComponentVNodeOptions<N>>,
    async_factory: Option<AsyncFactory>,
    is_async_placeholder: Cell<bool>,

    elm: RefCell<Option<N>>,
    component_instance: RefCell<Option<Component<N>>>,
    context: RefCell<Option<WeakComponent<N>>>,
    parent: RefCell<Weak<VNodeInner<N>>>,
    pending_insert: RefCell<Option<Vec<VNode<N>>>>,
    keep_alive: Cell<bool>,
    insert_hooks: RefCell<Vec<VNodeCallback<N>>>,
    postpatch_hooks: RefCell<Vec<PatchCallback<N>>>,
}

impl<N: Clone + 'static> VNode<N> {
    fn from_parts(parts: VNodeParts<N>) -> Self {
        let keep_alive = parts.data.as_ref().is_some_and(|d| d.keep_alive);
        Self(Rc::new(VNodeInner {
            tag: parts.tag,
            data: parts.data,
            children: RefCell::new(parts.children),
            text: parts.text,
            key: parts.key,
            ns: parts.ns,
            is_comment: parts.is_comment,
            is_static: parts.is_static,
            is_once: parts.is_once,
            is_cloned: parts.is_cloned,
            component: parts.component,
            is_async_placeholder: Cell::new(false),
            async_factory: parts.async_factory,
            elm: RefCell::new(parts.elm),
            component_instance: RefCell::new(None),
            context: RefCell::new(parts.context),
            parent: RefCell::new(Weak::new()),
            pending_insert: RefCell::new(None),
            keep_alive: Cell::new(keep_alive),
            insert_hooks: RefCell::new(Vec::new()),
            postpatch_hooks: RefCell::new(Vec::new()),
        }))
    }

    /// Start building an element vnode.
    pub fn element(tag: impl Into<String>) -> VNodeBuilder<N> {
        VNodeBuilder::new(Some(tag.into()))
    }

    /// Start building a component placeholder vnode.
    pub fn component(ctor: Rc<ComponentOptions<N>>) -> VNodeBuilder<N> {
        let tag = format!("trellis-component-{}-{}", ctor.cid(), ctor.name());
        let mut builder = VNodeBuilder::new(Some(tag));
        builder.data.get_or_insert_with(VNodeData::default);
        builder.component = Some(ComponentVNodeOptions {
            ctor,
            props_data: IndexMap::new(),
            listeners: IndexMap::new(),
            children: None,
        });
        builder
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::from_parts(VNodeParts {
            text: Some(text.into()),
            ..VNodeParts::default()
        })
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::from_parts(VNodeParts {
            text: Some(text.into()),
            is_comment: true,
            ..VNodeParts::default()
        })
    }

    /// An empty comment, rendered where nothing should appear.
    pub fn empty() -> Self {
        Self::comment("")
    }

    /// Placeholder rendered while an async component is loading.
    pub fn async_placeholder(factory: AsyncFactory, key: Option<Key>) -> Self {
        let placeholder = Self::from_parts(VNodeParts {
            text: Some(String::new()),
            is_comment: true,
            async_factory: Some(factory),
            key,
            ..VNodeParts::default()
        });
        placeholder.mark_async_placeholder();
        placeholder
    }

    /// Shallow copy sharing data and children but with fresh reconciler
    /// state, marked as cloned.
    pub fn clone_vnode(&self) -> Self {
        let clone = Self::from_parts(VNodeParts {
            tag: self.0.tag.clone(),
            data: self.0.data.clone(),
            children: self.0.children.borrow().clone(),
            text: self.0.text.clone(),
            key: self.0.key.clone(),
            ns: self.0.ns.clone(),
            is_comment: self.0.is_comment,
            is_static: self.0.is_static,
            is_once: self.0.is_once,
            is_cloned: true,
            component: self.0.component.clone(),
            async_factory: self.0.async_factory.clone(),
            elm: self.elm(),
            context: self.0.context.borrow().clone(),
        });
        clone.0.is_async_placeholder.set(self.0.is_async_placeholder.get());
        clone.0.keep_alive.set(self.0.keep_alive.get());
        clone
    }

    pub fn tag(&self) -> Option<&str> {
        self.0.tag.as_deref()
    }

    pub fn data(&self) -> Option<&VNodeData<N>> {
        self.0.data.as_ref()
    }

    pub fn key(&self) -> Option<&Key> {
        self.0.key.as_ref()
    }

    pub fn text_content(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub fn ns(&self) -> Option<&str> {
        self.0.ns.as_deref()
    }

    pub fn is_comment(&self) -> bool {
        self.0.is_comment
    }

    pub fn is_static(&self) -> bool {
        self.0.is_static
    }

    pub fn is_once(&self) -> bool {
        self.0.is_once
    }

    pub fn is_cloned(&self) -> bool {
        self.0.is_cloned
    }

    /// Children, if this vnode has a child list.
    pub fn children(&self) -> Option<Vec<VNode<N>>> {
        self.0.children.borrow().clone()
    }

    pub fn has_children(&self) -> bool {
        self.0
            .children
            .borrow()
            .as_ref()
            .is_some_and(|c| !c.is_empty())
    }

    pub(crate) fn replace_child(&self, index: usize, child: VNode<N>) {
        if let Some(children) = self.0.children.borrow_mut().as_mut() {
            if let Some(slot) = children.get_mut(index) {
                *slot = child;
            }
        }
    }

    pub fn component_options(&self) -> Option<&ComponentVNodeOptions<N>> {
        self.0.component.as_ref()
    }

    pub fn is_component(&self) -> bool {
        self.0.component.is_some()
    }

    pub fn async_factory(&self) -> Option<&AsyncFactory> {
        self.0.async_factory.as_ref()
    }

    pub fn is_async_placeholder(&self) -> bool {
        self.0.is_async_placeholder.get()
    }

    pub(crate) fn mark_async_placeholder(&self) {
        self.0.is_async_placeholder.set(true);
    }

    /// The host node this vnode is mounted to.
    pub fn elm(&self) -> Option<N> {
        self.0.elm.borrow().clone()
    }

    pub(crate) fn set_elm(&self, elm: Option<N>) {
        *self.0.elm.borrow_mut() = elm;
    }

    pub fn component_instance(&self) -> Option<Component<N>> {
        self.0.component_instance.borrow().clone()
    }

    pub(crate) fn set_component_instance(&self, instance: Option<Component<N>>) {
        *self.0.component_instance.borrow_mut() = instance;
    }

    /// Component whose render produced this vnode.
    pub fn context(&self) -> Option<Component<N>> {
        self.0.context.borrow().as_ref().and_then(WeakComponent::upgrade)
    }

    pub(crate) fn has_context(&self) -> bool {
        self.0.context.borrow().is_some()
    }

    pub(crate) fn set_context(&self, context: &Component<N>) {
        *self.0.context.borrow_mut() = Some(context.downgrade());
    }

    /// Component placeholder vnode this vnode is the rendered root of.
    pub fn parent(&self) -> Option<VNode<N>> {
        self.0.parent.borrow().upgrade().map(VNode)
    }

    pub(crate) fn set_parent(&self, parent: Option<&VNode<N>>) {
        *self.0.parent.borrow_mut() = parent.map(|p| Rc::downgrade(&p.0)).unwrap_or_default();
    }

    pub(crate) fn take_pending_insert(&self) -> Option<Vec<VNode<N>>> {
        self.0.pending_insert.borrow_mut().take()
    }

    pub(crate) fn set_pending_insert(&self, queue: Vec<VNode<N>>) {
        *self.0.pending_insert.borrow_mut() = Some(queue);
    }

    pub fn keep_alive(&self) -> bool {
        self.0.keep_alive.get()
    }

    pub(crate) fn set_keep_alive(&self, keep_alive: bool) {
        self.0.keep_alive.set(keep_alive);
    }

    pub(crate) fn add_insert_hook(&self, hook: VNodeCallback<N>) {
        self.0.insert_hooks.borrow_mut().push(hook);
    }

    pub(crate) fn insert_hooks(&self) -> Vec<VNodeCallback<N>> {
        self.0.insert_hooks.borrow().clone()
    }

    pub(crate) fn add_postpatch_hook(&self, hook: PatchCallback<N>) {
        self.0.postpatch_hooks.borrow_mut().push(hook);
    }

    pub(crate) fn postpatch_hooks(&self) -> Vec<PatchCallback<N>> {
        self.0.postpatch_hooks.borrow().clone()
    }

    /// Whether something must run once this vnode is in the document.
    pub(crate) fn has_insert_hook(&self) -> bool {
        self.is_component()
            || self.data().is_some_and(|d| d.hook.insert.is_some())
            || !self.0.insert_hooks.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &VNode<N>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<N: 'static> fmt::Debug for VNode<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        if let Some(tag) = &self.0.tag {
            s.field("tag", tag);
        }
        if let Some(key) = &self.0.key {
            s.field("key", key);
        }
        if let Some(text) = &self.0.text {
            s.field("text", text);
        }
        if self.0.is_comment {
            s.field("comment", &true);
        }
        let children = self.0.children.borrow().as_ref().map_or(0, Vec::len);
        s.field("children", &children).finish()
    }
}

struct VNodeParts<N: 'static> {
    tag: Option<String>,
    data: Option<VNodeData<N>>,
    children: Option<Vec<VNode<N>>>,
    text: Option<String>,
    key: Option<Key>,
    ns: Option<String>,
    is_comment: bool,
    is_static: bool,
    is_once: bool,
    is_cloned: bool,
    component: Option<ComponentVNodeOptions<N>>,
    async_factory: Option<AsyncFactory>,
    elm: Option<N>,
    context: Option<WeakComponent<N>>,
}

impl<N: 'static> Default for VNodeParts<N> {
    fn default() -> Self {
        Self {
            tag: None,
            data: None,
            children: None,
            text: None,
            key: None,
            ns: None,
            is_comment: false,
            is_static: false,
            is_once: false,
            is_cloned: false,
            component: None,
            async_factory: None,
            elm: None,
            context: None,
        }
    }
}

/// Builder for element and component vnodes.
pub struct VNodeBuilder<N: 'static> {
    tag: Option<String>,
    data: Option<VNodeData<N>>,
    children: Option<Vec<VNode<N>>>,
    text: Option<String>,
    key: Option<Key>,
    ns: Option<String>,
    is_static: bool,
    is_once: bool,
    component: Option<ComponentVNodeOptions<N>>,
    async_factory: Option<AsyncFactory>,
    elm: Option<N>,
}

impl<N: Clone + 'static> VNodeBuilder<N> {
    fn new(tag: Option<String>) -> Self {
        Self {
            tag,
            data: None,
            children: None,
            text: None,
            key: None,
            ns: None,
            is_static: false,
            is_once: false,
            component: None,
            async_factory: None,
            elm: None,
        }
    }

    fn data_mut(&mut self) -> &mut VNodeData<N> {
        self.data.get_or_insert_with(VNodeData::default)
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach vnode data even if no field is set.
    pub fn with_data(mut self) -> Self {
        self.data_mut();
        self
    }

    pub fn data(mut self, data: VNodeData<N>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data_mut().attrs.insert(name.into(), value.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data_mut().props.insert(name.into(), value.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.data_mut().class = Some(class.into());
        self
    }

    pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data_mut().style.insert(name.into(), value.into());
        self
    }

    pub fn on(mut self, event: impl Into<String>, handler: impl Fn(&Value) + 'static) -> Self {
        self.data_mut().on.insert(event.into(), Rc::new(handler));
        self
    }

    pub fn directive(mut self, directive: Directive<N>) -> Self {
        self.data_mut().directives.push(directive);
        self
    }

    pub fn hooks(mut self, hooks: VNodeHooks<N>) -> Self {
        self.data_mut().hook = hooks;
        self
    }

    pub fn on_insert(mut self, hook: impl Fn(&VNode<N>) + 'static) -> Self {
        self.data_mut().hook.insert = Some(Rc::new(hook));
        self
    }

    pub fn on_destroy(mut self, hook: impl Fn(&VNode<N>) + 'static) -> Self {
        self.data_mut().hook.destroy = Some(Rc::new(hook));
        self
    }

    /// Delay removal of the host node until `hook` completes the handle.
    pub fn on_remove(mut self, hook: impl Fn(&VNode<N>, RemoveHandle) + 'static) -> Self {
        self.data_mut().hook.remove = Some(Rc::new(hook));
        self
    }

    pub fn ref_name(mut self, name: impl Into<String>) -> Self {
        self.data_mut().ref_name = Some(name.into());
        self
    }

    /// Collect the ref into a list, as refs inside loops are.
    pub fn ref_in_for(mut self) -> Self {
        self.data_mut().ref_in_for = true;
        self
    }

    pub fn keep_alive(mut self) -> Self {
        self.data_mut().keep_alive = true;
        self
    }

    pub fn ns(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    /// Mark as a hoisted static subtree.
    pub fn static_tree(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as a render-once subtree.
    pub fn once(mut self) -> Self {
        self.is_once = true;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: VNode<N>) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn text_child(self, text: impl Into<String>) -> Self {
        self.child(VNode::text(text))
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode<N>>) -> Self {
        self.children.get_or_insert_with(Vec::new).extend(children);
        self
    }

    /// Pass a prop value to a component placeholder.
    pub fn prop_data(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(component) = self.component.as_mut() {
            component.props_data.insert(name.into(), value.into());
        }
        self
    }

    /// Register a listener for an event the component emits.
    pub fn listener(mut self, event: impl Into<String>, handler: impl Fn(&Value) + 'static) -> Self {
        if let Some(component) = self.component.as_mut() {
            component.listeners.insert(event.into(), Rc::new(handler));
        }
        self
    }

    /// Slot content for a component placeholder.
    pub fn slot(mut self, children: impl IntoIterator<Item = VNode<N>>) -> Self {
        if let Some(component) = self.component.as_mut() {
            component
                .children
                .get_or_insert_with(Vec::new)
                .extend(children);
        }
        self
    }

    /// Mark a component vnode as produced by an async factory.
    pub fn async_factory(mut self, factory: AsyncFactory) -> Self {
        self.async_factory = Some(factory);
        self
    }

    pub(crate) fn elm(mut self, elm: N) -> Self {
        self.elm = Some(elm);
        self
    }

    pub fn build(self) -> VNode<N> {
        VNode::from_parts(VNodeParts {
            tag: self.tag,
            data: self.data,
            children: self.children,
            text: self.text,
            key: self.key,
            ns: self.ns,
            is_static: self.is_static,
            is_once: self.is_once,
            component: self.component,
            async_factory: self.async_factory,
            elm: self.elm,
            ..VNodeParts::default()
        })
    }
}

/// Build an element vnode from a plain data object, as a render function
/// would. An observed data object yields an empty comment instead.
pub fn create_element<N: Clone + 'static>(
    tag: &str,
    data: Option<&Value>,
    children: Vec<VNode<N>>,
) -> VNode<N> {
    let mut builder = VNode::element(tag).children(children);
    if let Some(value) = data {
        match VNodeData::from_value(value) {
            Some(parsed) => builder = builder.data(parsed),
            None if value.as_object().is_some() => return VNode::empty(),
            None => {}
        }
        match value.get("key") {
            Value::Number(n) => builder = builder.key(n),
            Value::String(s) => builder = builder.key(&*s),
            _ => {}
        }
    }
    builder.build()
}

fn is_text_input_type(ty: Option<&str>) -> bool {
    matches!(
        ty,
        Some("text" | "number" | "password" | "search" | "email" | "tel" | "url")
    )
}

/// `<input>` elements are only interchangeable if their types are.
pub fn same_input_type<N: Clone + 'static>(a: &VNode<N>, b: &VNode<N>) -> bool {
    if a.tag() != Some("input") {
        return true;
    }
    let ty = |v: &VNode<N>| v.data().and_then(|d| d.attrs.get("type").cloned());
    let (ta, tb) = (ty(a), ty(b));
    ta == tb || (is_text_input_type(ta.as_deref()) && is_text_input_type(tb.as_deref()))
}

/// Whether `b` can be reconciled into `a` in place.
pub fn same_vnode<N: Clone + 'static>(a: &VNode<N>, b: &VNode<N>) -> bool {
    let same_factory = match (a.async_factory(), b.async_factory()) {
        (None, None) => true,
        (Some(x), Some(y)) => x.ptr_eq(y),
        _ => false,
    };
    a.key() == b.key()
        && same_factory
        && ((a.tag() == b.tag()
            && a.is_comment() == b.is_comment()
            && a.data().is_some() == b.data().is_some()
            && same_input_type(a, b))
            || (a.is_async_placeholder() && b.async_factory().is_some_and(|f| !f.has_error())))
}
