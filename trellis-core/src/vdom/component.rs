//! Components
//!
//! A [`Component`] owns reactive state (declared props plus the object its
//! data factory returns), a render function and the watchers built on them.
//! Mounting creates a render watcher: every time something the render
//! function read changes, the scheduler re-runs it and the new vnode tree is
//! patched against the previous one.
//!
//! Child components are created by the reconciler when it meets a component
//! placeholder vnode. Their props are refreshed from the placeholder each
//! time the parent re-renders; writing a prop directly from inside the
//! child is reported, since the next parent render overwrites it.
//!
//! Lifecycle hooks run untracked. A hook that fails is reported through
//! [`handle_error`] and does not interrupt the lifecycle.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::modules::RefEntry;
use super::patch::{PatchTarget, Reconciler};
use super::vnode::{next_cid, Handler, VNode};
use crate::error::{handle_error, warn, Error, Result};
use crate::reactive::{
    define_reactive, observe, untrack, watch_with_owner, without_observing, Accessor, Callback,
    Object, ReactiveContext, Source, Value, WatchHandle, WatchOptions, Watcher, WatcherId,
    WatcherOptions, WatcherOwner,
};
use crate::scheduler::{queue_activated_component, Activatable};

/// Render function: builds the component's vnode tree.
pub type RenderFn<N> = Rc<dyn Fn(&Component<N>) -> Result<VNode<N>>>;

/// Lifecycle hook.
pub type LifecycleHook<N> = Rc<dyn Fn(&Component<N>) -> Result<()>>;

/// Data factory: returns the object that becomes the component's state.
pub type DataFn = Rc<dyn Fn() -> Value>;

/// Callback of a watch declared in [`ComponentOptions`].
pub type ComponentWatchCallback<N> = Rc<dyn Fn(&Component<N>, &Value, &Value) -> Result<()>>;

/// Points in a component's life where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    Activated,
    Deactivated,
    BeforeDestroy,
    Destroyed,
}

impl Lifecycle {
    pub fn name(&self) -> &'static str {
        match self {
            Lifecycle::Created => "created",
            Lifecycle::BeforeMount => "beforeMount",
            Lifecycle::Mounted => "mounted",
            Lifecycle::BeforeUpdate => "beforeUpdate",
            Lifecycle::Updated => "updated",
            Lifecycle::Activated => "activated",
            Lifecycle::Deactivated => "deactivated",
            Lifecycle::BeforeDestroy => "beforeDestroy",
            Lifecycle::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared prop and the value it takes when the parent passes none.
#[derive(Debug, Clone)]
pub struct PropDef {
    pub name: String,
    pub default: Value,
}

struct WatchDef<N: 'static> {
    path: String,
    callback: ComponentWatchCallback<N>,
    options: WatchOptions,
}

/// Definition of a component, shared by all its instances.
pub struct ComponentOptions<N: 'static> {
    cid: u64,
    name: String,
    props: Vec<PropDef>,
    data: Option<DataFn>,
    render: RenderFn<N>,
    watch: Vec<WatchDef<N>>,
    hooks: Vec<(Lifecycle, LifecycleHook<N>)>,
    scope_id: Option<String>,
}

impl<N: 'static> ComponentOptions<N> {
    pub fn new(
        name: impl Into<String>,
        render: impl Fn(&Component<N>) -> Result<VNode<N>> + 'static,
    ) -> Self {
        Self {
            cid: next_cid(),
            name: name.into(),
            props: Vec::new(),
            data: None,
            render: Rc::new(render),
            watch: Vec::new(),
            hooks: Vec::new(),
            scope_id: None,
        }
    }

    pub fn prop(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.props.push(PropDef {
            name: name.into(),
            default: default.into(),
        });
        self
    }

    /// Set the data factory. It must return an object.
    pub fn data(mut self, factory: impl Fn() -> Value + 'static) -> Self {
        self.data = Some(Rc::new(factory));
        self
    }

    /// Watch a path of the component's state (`"count"`, `"user.name"`).
    pub fn watch(
        self,
        path: impl Into<String>,
        callback: impl Fn(&Component<N>, &Value, &Value) -> Result<()> + 'static,
    ) -> Self {
        self.watch_with(path, WatchOptions::default(), callback)
    }

    pub fn watch_with(
        mut self,
        path: impl Into<String>,
        options: WatchOptions,
        callback: impl Fn(&Component<N>, &Value, &Value) -> Result<()> + 'static,
    ) -> Self {
        self.watch.push(WatchDef {
            path: path.into(),
            callback: Rc::new(callback),
            options,
        });
        self
    }

    pub fn hook(
        mut self,
        lifecycle: Lifecycle,
        hook: impl Fn(&Component<N>) -> Result<()> + 'static,
    ) -> Self {
        self.hooks.push((lifecycle, Rc::new(hook)));
        self
    }

    /// Scoped-style id applied to every host node this component renders.
    pub fn scope_id(mut self, id: impl Into<String>) -> Self {
        self.scope_id = Some(id.into());
        self
    }

    pub fn build(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn cid(&self) -> u64 {
        self.cid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &[PropDef] {
        &self.props
    }
}

impl<N: 'static> fmt::Debug for ComponentOptions<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("cid", &self.cid)
            .field("name", &self.name)
            .field("props", &self.props)
            .finish_non_exhaustive()
    }
}

static UID_COUNTER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static UPDATING_CHILD: Cell<bool> = const { Cell::new(false) };
    static ACTIVE_INSTANCE: RefCell<Vec<Rc<dyn Any>>> = const { RefCell::new(Vec::new()) };
}

/// Marks the component whose tree is being patched, so child components
/// created during the patch know their parent.
struct ActiveInstance;

impl ActiveInstance {
    fn enter<N: Clone + 'static>(component: &Component<N>) -> Self {
        let any: Rc<dyn Any> = component.0.clone();
        ACTIVE_INSTANCE.with(|stack| stack.borrow_mut().push(any));
        Self
    }

    fn current<N: Clone + 'static>() -> Option<Component<N>> {
        let top = ACTIVE_INSTANCE.with(|stack| stack.borrow().last().cloned())?;
        top.downcast::<ComponentInner<N>>().ok().map(Component)
    }
}

impl Drop for ActiveInstance {
    fn drop(&mut self) {
        ACTIVE_INSTANCE.with(|stack| stack.borrow_mut().pop());
    }
}

/// A component instance.
pub struct Component<N: 'static>(Rc<ComponentInner<N>>);

/// Non-owning handle to a component.
pub struct WeakComponent<N: 'static>(Weak<ComponentInner<N>>);

impl<N: 'static> Clone for Component<N> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<N: 'static> Clone for WeakComponent<N> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<N: 'static> WeakComponent<N> {
    pub fn upgrade(&self) -> Option<Component<N>> {
        self.0.upgrade().map(Component)
    }
}

struct ComponentInner<N: 'static> {
    uid: u64,
    options: Rc<ComponentOptions<N>>,
    reconciler: Rc<dyn Reconciler<N>>,
    data: Value,
    props: Object,
    scope: Object,
    listeners: RefCell<IndexMap<String, Handler>>,
    parent: Option<WeakComponent<N>>,
    children: RefCell<Vec<Component<N>>>,
    refs: RefCell<IndexMap<String, RefEntry<N>>>,
    /// Placeholder vnode in the parent's tree.
    placeholder: RefCell<Option<VNode<N>>>,
    /// Root of the last rendered tree.
    vnode: RefCell<Option<VNode<N>>>,
    slot: RefCell<Option<Vec<VNode<N>>>>,
    el: RefCell<Option<N>>,
    watchers: RefCell<Vec<Watcher>>,
    render_watcher: RefCell<Option<Watcher>>,
    is_mounted: Cell<bool>,
    is_destroyed: Cell<bool>,
    is_being_destroyed: Cell<bool>,
    inactive: Cell<Option<bool>>,
    direct_inactive: Cell<bool>,
}

fn init_props<N: 'static>(
    options: &ComponentOptions<N>,
    props_data: &IndexMap<String, Value>,
    is_root: bool,
) -> Object {
    let props = Object::new();
    let define = || {
        for prop in options.props() {
            let value = props_data
                .get(&prop.name)
                .cloned()
                .unwrap_or_else(|| prop.default.clone());
            let (name, component) = (prop.name.clone(), options.name().to_string());
            let on_write: Rc<dyn Fn()> = Rc::new(move || {
                if !UPDATING_CHILD.with(Cell::get) {
                    warn(format!(
                        "Avoid mutating a prop directly since the value will be overwritten \
                         whenever the parent component re-renders. Prop being mutated: \
                         \"{name}\" in <{component}>"
                    ));
                }
            });
            define_reactive(&props, &prop.name, Some(value), Some(on_write), false);
        }
    };
    // Values handed down by a parent are already observed, or meant not to be.
    if is_root {
        define();
    } else {
        without_observing(define);
    }
    props
}

fn init_data<N: 'static>(options: &ComponentOptions<N>, props: &Object) -> Value {
    let data = match &options.data {
        Some(factory) => untrack(|| factory()),
        None => Value::Object(Object::new()),
    };
    let data = if data.as_object().is_some() {
        data
    } else {
        warn(format!(
            "data functions should return an object, <{}> returned {}",
            options.name(),
            data.type_name()
        ));
        Value::Object(Object::new())
    };
    if let Some(object) = data.as_object() {
        for key in object.keys() {
            if props.contains_key(&key) {
                warn(format!(
                    "The data property \"{key}\" of <{}> is already declared as a prop",
                    options.name()
                ));
            }
        }
    }
    observe(&data, true);
    data
}

/// Flat view over props and data, used to resolve watch paths and
/// [`Component::get`].
fn build_scope(props: &Object, data: &Value) -> Object {
    let scope = Object::new();
    for key in props.keys() {
        let (r, w) = (props.clone(), props.clone());
        let (rk, wk) = (key.clone(), key.clone());
        scope.define_accessor(
            &key,
            Accessor::new(move || r.get(&rk), move |v| w.assign(&wk, v)),
            true,
        );
    }
    if let Some(object) = data.as_object() {
        for key in object.keys() {
            if props.contains_key(&key) {
                continue;
            }
            let (r, w) = (object.clone(), object.clone());
            let (rk, wk) = (key.clone(), key.clone());
            scope.define_accessor(
                &key,
                Accessor::new(move || r.get(&rk), move |v| w.assign(&wk, v)),
                true,
            );
        }
    }
    scope
}

impl<N: Clone + 'static> Component<N> {
    /// Create a root component. It renders once [`mount`](Self::mount) is
    /// called.
    pub fn new(options: Rc<ComponentOptions<N>>, reconciler: Rc<dyn Reconciler<N>>) -> Result<Self> {
        Self::construct(options, reconciler, None, None)
    }

    fn construct(
        options: Rc<ComponentOptions<N>>,
        reconciler: Rc<dyn Reconciler<N>>,
        parent: Option<Component<N>>,
        placeholder: Option<&VNode<N>>,
    ) -> Result<Self> {
        let vnode_options = placeholder.and_then(VNode::component_options);
        let props_data = vnode_options.map(|o| o.props_data.clone()).unwrap_or_default();
        let props = init_props(&options, &props_data, parent.is_none());
        let data = init_data(&options, &props);
        let scope = build_scope(&props, &data);

        let component = Component(Rc::new(ComponentInner {
            uid: UID_COUNTER.fetch_add(1, Ordering::Relaxed),
            options,
            reconciler,
            data,
            props,
            scope,
            listeners: RefCell::new(vnode_options.map(|o| o.listeners.clone()).unwrap_or_default()),
            parent: parent.as_ref().map(Component::downgrade),
            children: RefCell::new(Vec::new()),
            refs: RefCell::new(IndexMap::new()),
            placeholder: RefCell::new(placeholder.cloned()),
            vnode: RefCell::new(None),
            slot: RefCell::new(vnode_options.and_then(|o| o.children.clone())),
            el: RefCell::new(None),
            watchers: RefCell::new(Vec::new()),
            render_watcher: RefCell::new(None),
            is_mounted: Cell::new(false),
            is_destroyed: Cell::new(false),
            is_being_destroyed: Cell::new(false),
            inactive: Cell::new(None),
            direct_inactive: Cell::new(false),
        }));
        if let Some(parent) = &parent {
            parent.0.children.borrow_mut().push(component.clone());
        }
        tracing::debug!(component = %component.name(), uid = component.uid(), "component created");

        component.init_watch()?;
        component.call_hook(Lifecycle::Created);
        Ok(component)
    }

    fn owner(&self) -> Rc<dyn WatcherOwner> {
        self.0.clone()
    }

    fn init_watch(&self) -> Result<()> {
        let owner = self.owner();
        for def in &self.0.options.watch {
            let weak = self.downgrade();
            let callback = def.callback.clone();
            let callback: Callback = Rc::new(move |new: &Value, old: &Value| match weak.upgrade() {
                Some(component) => callback(&component, new, old),
                None => Ok(()),
            });
            watch_with_owner(Some(&owner), Source::path(self.scope(), def.path.as_str()), callback, def.options)?;
        }
        Ok(())
    }

    /// Render and patch for the first time, and keep re-rendering whenever
    /// a dependency of the render function changes.
    ///
    /// `el` is an existing host node to replace. A failing first render is
    /// returned as [`Error::Render`].
    pub fn mount(&self, el: Option<N>) -> Result<()> {
        *self.0.el.borrow_mut() = el;
        self.call_hook(Lifecycle::BeforeMount);

        let weak = self.downgrade();
        let render = Source::labelled(format!("<{}> render", self.name()), move || {
            if let Some(component) = weak.upgrade() {
                component.update()?;
            }
            Ok(Value::Undefined)
        });
        let weak = self.downgrade();
        let before: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(component) = weak.upgrade() {
                if component.is_mounted() && !component.is_destroyed() {
                    component.call_hook(Lifecycle::BeforeUpdate);
                }
            }
        });
        let watcher = Watcher::new(
            Some(&self.owner()),
            render,
            None,
            WatcherOptions {
                before: Some(before),
                render: true,
                ..Default::default()
            },
        )?;
        *self.0.render_watcher.borrow_mut() = Some(watcher);

        // Child components are marked mounted by their placeholder's insert
        // hook, once the parent tree is attached.
        if self.0.placeholder.borrow().is_none() {
            self.0.is_mounted.set(true);
            self.call_hook(Lifecycle::Mounted);
        }
        Ok(())
    }

    /// Run the render function and attach the result to this component.
    pub fn render(&self) -> Result<VNode<N>> {
        let render = self.0.options.render.clone();
        let vnode = render(self).map_err(|source| Error::Render {
            component: self.name().to_string(),
            source: Box::new(source),
        })?;
        self.adopt(&vnode);
        vnode.set_parent(self.placeholder().as_ref());
        Ok(vnode)
    }

    fn adopt(&self, vnode: &VNode<N>) {
        if vnode.has_context() {
            return;
        }
        vnode.set_context(self);
        if let Some(children) = vnode.children() {
            for child in &children {
                self.adopt(child);
            }
        }
        if let Some(slot) = vnode.component_options().and_then(|o| o.children.as_ref()) {
            for child in slot {
                self.adopt(child);
            }
        }
    }

    fn update(&self) -> Result<()> {
        let vnode = self.render()?;
        let previous = self.0.vnode.replace(Some(vnode.clone()));
        let old = match previous {
            Some(previous) => PatchTarget::VNode(previous),
            None => match self.el() {
                Some(el) => PatchTarget::Node(el),
                None => PatchTarget::Empty,
            },
        };

        let el = {
            let _active = ActiveInstance::enter(self);
            self.0.reconciler.patch(old, Some(&vnode), false, false)?
        };
        *self.0.el.borrow_mut() = el.clone();

        // A parent whose root is this component shares its host node.
        if let (Some(placeholder), Some(parent)) = (self.placeholder(), self.parent()) {
            if parent.root_vnode().is_some_and(|root| root.ptr_eq(&placeholder)) {
                *parent.0.el.borrow_mut() = el;
            }
        }
        Ok(())
    }

    /// Queue a re-render.
    pub fn force_update(&self) {
        let watcher = self.0.render_watcher.borrow().clone();
        if let Some(watcher) = watcher {
            watcher.update();
        }
    }

    /// Tear down watchers and destroy the rendered tree. Idempotent.
    pub fn destroy(&self) {
        if self.0.is_being_destroyed.get() {
            return;
        }
        self.call_hook(Lifecycle::BeforeDestroy);
        self.0.is_being_destroyed.set(true);

        if let Some(parent) = self.parent() {
            if !parent.0.is_being_destroyed.get() {
                parent.0.children.borrow_mut().retain(|c| !c.ptr_eq(self));
            }
        }
        let watchers = std::mem::take(&mut *self.0.watchers.borrow_mut());
        for watcher in &watchers {
            watcher.teardown();
        }
        if let Some(observer) = self.0.data.as_object().and_then(Object::observer) {
            observer.release_root();
        }
        self.0.is_destroyed.set(true);

        let root = self.0.vnode.borrow().clone();
        if let Some(root) = root {
            if let Err(err) = self.0.reconciler.patch(PatchTarget::VNode(root), None, false, false) {
                handle_error(&err, &format!("destroy of <{}>", self.name()));
            }
        }
        self.call_hook(Lifecycle::Destroyed);
        self.0.listeners.borrow_mut().clear();
        self.0.placeholder.borrow_mut().take();
        tracing::debug!(component = %self.name(), uid = self.uid(), "component destroyed");
    }

    fn update_from_parent(&self, placeholder: &VNode<N>) {
        let Some(options) = placeholder.component_options() else { return };
        let needs_force_update = options.children.is_some() || self.0.slot.borrow().is_some();

        *self.0.placeholder.borrow_mut() = Some(placeholder.clone());
        if let Some(root) = self.root_vnode() {
            root.set_parent(Some(placeholder));
        }

        UPDATING_CHILD.with(|flag| flag.set(true));
        without_observing(|| {
            for prop in self.0.options.props() {
                let value = options
                    .props_data
                    .get(&prop.name)
                    .cloned()
                    .unwrap_or_else(|| prop.default.clone());
                self.0.props.assign(&prop.name, value);
            }
        });
        *self.0.listeners.borrow_mut() = options.listeners.clone();
        UPDATING_CHILD.with(|flag| flag.set(false));

        if needs_force_update {
            *self.0.slot.borrow_mut() = options.children.clone();
            self.force_update();
        }
    }

    fn is_in_inactive_tree(&self) -> bool {
        let mut ancestor = self.parent();
        while let Some(component) = ancestor {
            if component.0.inactive.get() == Some(true) {
                return true;
            }
            ancestor = component.parent();
        }
        false
    }

    pub(crate) fn activate_child(&self, direct: bool) {
        if direct {
            self.0.direct_inactive.set(false);
            if self.is_in_inactive_tree() {
                return;
            }
        } else if self.0.direct_inactive.get() {
            return;
        }
        if self.0.inactive.get() != Some(false) {
            self.0.inactive.set(Some(false));
            for child in self.children() {
                child.activate_child(false);
            }
            self.call_hook(Lifecycle::Activated);
        }
    }

    pub(crate) fn deactivate_child(&self, direct: bool) {
        if direct {
            self.0.direct_inactive.set(true);
            if self.is_in_inactive_tree() {
                return;
            }
        }
        if self.0.inactive.get() != Some(true) {
            self.0.inactive.set(Some(true));
            for child in self.children() {
                child.deactivate_child(false);
            }
            self.call_hook(Lifecycle::Deactivated);
        }
    }

    /// Run the hooks registered for `lifecycle`.
    pub fn call_hook(&self, lifecycle: Lifecycle) {
        let _untracked = ReactiveContext::untracked();
        let hooks: Vec<LifecycleHook<N>> = self
            .0
            .options
            .hooks
            .iter()
            .filter(|(l, _)| *l == lifecycle)
            .map(|(_, hook)| hook.clone())
            .collect();
        tracing::trace!(component = %self.name(), hook = lifecycle.name(), count = hooks.len(), "lifecycle");
        for hook in hooks {
            if let Err(err) = hook(self) {
                let err = Error::HookFailed {
                    component: self.name().to_string(),
                    hook: lifecycle.name(),
                    source: Box::new(err),
                };
                handle_error(&err, &format!("{lifecycle} hook"));
            }
        }
    }

    /// Read a prop or data property. Tracked.
    pub fn get(&self, key: &str) -> Value {
        self.0.scope.get(key)
    }

    /// Write a data property. Writing a prop warns.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.0.scope.assign(key, value);
    }

    /// Invoke the parent's listener for `event`. Returns whether one existed.
    pub fn emit(&self, event: &str, payload: &Value) -> bool {
        let handler = self.0.listeners.borrow().get(event).cloned();
        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }

    /// Watch a path of this component's state. The watcher is torn down with
    /// the component.
    pub fn watch(
        &self,
        path: &str,
        callback: impl Fn(&Value, &Value) -> Result<()> + 'static,
        options: WatchOptions,
    ) -> Result<WatchHandle> {
        watch_with_owner(
            Some(&self.owner()),
            Source::path(self.scope(), path),
            Rc::new(callback),
            options,
        )
    }

    /// Run `f` with mutable access to this component's refs.
    pub fn with_refs<R>(&self, f: impl FnOnce(&mut IndexMap<String, RefEntry<N>>) -> R) -> R {
        f(&mut self.0.refs.borrow_mut())
    }

    pub fn ref_entry(&self, name: &str) -> Option<RefEntry<N>> {
        self.0.refs.borrow().get(name).cloned()
    }

    pub fn uid(&self) -> u64 {
        self.0.uid
    }

    pub fn name(&self) -> &str {
        self.0.options.name()
    }

    pub fn options(&self) -> &Rc<ComponentOptions<N>> {
        &self.0.options
    }

    pub fn scope_id(&self) -> Option<String> {
        self.0.options.scope_id.clone()
    }

    /// The object returned by the data factory.
    pub fn data(&self) -> &Value {
        &self.0.data
    }

    pub fn props(&self) -> &Object {
        &self.0.props
    }

    /// Props and data as one object.
    pub fn scope(&self) -> Value {
        Value::Object(self.0.scope.clone())
    }

    /// Slot content passed by the parent.
    pub fn slot(&self) -> Option<Vec<VNode<N>>> {
        self.0.slot.borrow().clone()
    }

    pub fn el(&self) -> Option<N> {
        self.0.el.borrow().clone()
    }

    pub fn root_vnode(&self) -> Option<VNode<N>> {
        self.0.vnode.borrow().clone()
    }

    pub fn placeholder(&self) -> Option<VNode<N>> {
        self.0.placeholder.borrow().clone()
    }

    pub fn parent(&self) -> Option<Component<N>> {
        self.0.parent.as_ref().and_then(WeakComponent::upgrade)
    }

    pub fn children(&self) -> Vec<Component<N>> {
        self.0.children.borrow().clone()
    }

    pub fn render_watcher(&self) -> Option<Watcher> {
        self.0.render_watcher.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.0.is_mounted.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.is_destroyed.get()
    }

    /// Whether the component sits deactivated in a keep-alive cache.
    pub fn is_inactive(&self) -> bool {
        self.0.inactive.get() == Some(true)
    }
}

impl<N: 'static> Component<N> {
    pub fn downgrade(&self) -> WeakComponent<N> {
        WeakComponent(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Component<N>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<N: 'static> fmt::Debug for Component<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("uid", &self.0.uid)
            .field("name", &self.0.options.name)
            .field("mounted", &self.0.is_mounted.get())
            .field("destroyed", &self.0.is_destroyed.get())
            .finish()
    }
}

impl<N: Clone + 'static> WatcherOwner for ComponentInner<N> {
    fn label(&self) -> String {
        format!("<{}>", self.options.name())
    }

    fn adopt_watcher(&self, watcher: &Watcher) {
        self.watchers.borrow_mut().push(watcher.clone());
    }

    fn release_watcher(&self, id: WatcherId) {
        self.watchers.borrow_mut().retain(|w| w.id() != id);
    }

    fn is_being_destroyed(&self) -> bool {
        self.is_being_destroyed.get()
    }

    fn render_flushed(self: Rc<Self>, id: WatcherId) {
        let component = Component(self);
        let is_current = component
            .0
            .render_watcher
            .borrow()
            .as_ref()
            .is_some_and(|w| w.id() == id);
        if is_current && component.is_mounted() && !component.is_destroyed() {
            component.call_hook(Lifecycle::Updated);
        }
    }
}

impl<N: Clone + 'static> Activatable for ComponentInner<N> {
    fn set_inactive(&self, inactive: bool) {
        self.inactive.set(Some(inactive));
    }

    fn activate(self: Rc<Self>) {
        Component(self).activate_child(true);
    }
}

// ---- Placeholder hooks driven by the reconciler ----

/// Create and mount the component for `vnode`, or refresh a kept-alive one.
pub(crate) fn init_hook<N: Clone + 'static>(
    vnode: &VNode<N>,
    reconciler: Rc<dyn Reconciler<N>>,
) -> Result<()> {
    if let Some(instance) = vnode.component_instance() {
        if !instance.is_destroyed() && vnode.keep_alive() {
            prepatch_hook(vnode, vnode);
            return Ok(());
        }
    }
    let Some(options) = vnode.component_options() else {
        return Ok(());
    };
    let parent = ActiveInstance::current::<N>();
    let child = Component::construct(options.ctor.clone(), reconciler, parent, Some(vnode))?;
    vnode.set_component_instance(Some(child.clone()));
    child.mount(None)
}

/// Hand the instance from `old` to `vnode` and forward new props,
/// listeners and slot content.
pub(crate) fn prepatch_hook<N: Clone + 'static>(old: &VNode<N>, vnode: &VNode<N>) {
    let Some(instance) = old.component_instance() else { return };
    vnode.set_component_instance(Some(instance.clone()));
    instance.update_from_parent(vnode);
}

/// The placeholder's host node is in the document.
pub(crate) fn insert_hook<N: Clone + 'static>(vnode: &VNode<N>) {
    let Some(instance) = vnode.component_instance() else { return };
    if !instance.0.is_mounted.get() {
        instance.0.is_mounted.set(true);
        instance.call_hook(Lifecycle::Mounted);
    }
    if vnode.keep_alive() {
        match vnode.context() {
            Some(context) if context.is_mounted() => {
                let activatable: Rc<dyn Activatable> = instance.0.clone();
                queue_activated_component(activatable);
            }
            _ => instance.activate_child(true),
        }
    }
}

/// The placeholder left the tree: destroy the instance, or deactivate it if
/// it is kept alive.
pub(crate) fn destroy_hook<N: Clone + 'static>(vnode: &VNode<N>) {
    let Some(instance) = vnode.component_instance() else { return };
    if instance.is_destroyed() {
        return;
    }
    if vnode.keep_alive() {
        instance.deactivate_child(true);
    } else {
        instance.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::scheduler::run_microtasks;
    use crate::vdom::memory::{MemoryDom, MemoryNode};
    use crate::vdom::{AttrsModule, Module, Patcher};
    use serde_json::json;

    type Options = ComponentOptions<MemoryNode>;

    fn patcher() -> Rc<Patcher<MemoryDom>> {
        let dom = MemoryDom::new();
        let attrs: Rc<dyn Module<MemoryNode>> = Rc::new(AttrsModule::new(dom.clone()));
        Patcher::new(dom, vec![attrs])
    }

    fn log() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn record(log: &Rc<RefCell<Vec<String>>>, entry: &str) -> impl Fn(&Component<MemoryNode>) -> Result<()> {
        let (log, entry) = (log.clone(), entry.to_string());
        move |c: &Component<MemoryNode>| {
            log.borrow_mut().push(format!("{}:{entry}", c.name()));
            Ok(())
        }
    }

    fn counter() -> Rc<Options> {
        Options::new("Counter", |c| {
            Ok(VNode::element("p").text(c.get("count").to_display_string()).build())
        })
        .data(|| Value::from(json!({ "count": 0 })))
        .build()
    }

    #[test]
    fn mount_renders_and_rerenders_on_change() {
        let events = log();
        let options = Options::new("Counter", |c| {
            Ok(VNode::element("p").text(c.get("count").to_display_string()).build())
        })
        .data(|| Value::from(json!({ "count": 0 })))
        .hook(Lifecycle::Mounted, record(&events, "mounted"))
        .hook(Lifecycle::BeforeUpdate, record(&events, "beforeUpdate"))
        .hook(Lifecycle::Updated, record(&events, "updated"))
        .build();

        let app = Component::new(options, patcher()).unwrap();
        app.mount(None).unwrap();
        let el = app.el().unwrap();
        assert_eq!(el.to_html(), "<p>0</p>");

        app.set("count", 1);
        app.set("count", 2);
        assert_eq!(el.to_html(), "<p>0</p>");
        run_microtasks();
        assert_eq!(el.to_html(), "<p>2</p>");
        assert_eq!(
            *events.borrow(),
            vec!["Counter:mounted", "Counter:beforeUpdate", "Counter:updated"]
        );
    }

    #[test]
    fn first_render_failure_is_returned() {
        let options = Options::new("Broken", |_| Err(Error::thrown("nope"))).build();
        let app = Component::new(options, patcher()).unwrap();
        let err = app.mount(None).unwrap_err();
        assert_eq!(err.to_string(), "error in render of <Broken>: nope");
    }

    #[test]
    fn children_mount_before_parents_and_receive_props() {
        let events = log();
        let child = Options::new("Child", |c| {
            Ok(VNode::element("span").text(c.get("label").to_display_string()).build())
        })
        .prop("label", "none")
        .hook(Lifecycle::Mounted, record(&events, "mounted"))
        .build();

        let parent_child = child.clone();
        let parent = Options::new("Parent", move |c| {
            Ok(VNode::element("div")
                .child(
                    VNode::component(parent_child.clone())
                        .prop_data("label", c.get("label"))
                        .build(),
                )
                .build())
        })
        .data(|| Value::from(json!({ "label": "a" })))
        .hook(Lifecycle::Mounted, record(&events, "mounted"))
        .build();

        let app = Component::new(parent, patcher()).unwrap();
        app.mount(None).unwrap();
        assert_eq!(*events.borrow(), vec!["Child:mounted", "Parent:mounted"]);
        assert_eq!(app.el().unwrap().to_html(), "<div><span>a</span></div>");
        assert_eq!(app.children().len(), 1);
        assert!(app.children()[0].parent().unwrap().ptr_eq(&app));

        app.set("label", "b");
        run_microtasks();
        assert_eq!(app.el().unwrap().to_html(), "<div><span>b</span></div>");
    }

    #[test]
    fn updated_fires_children_before_parents() {
        let events = log();
        let child = Options::new("Child", |c| {
            Ok(VNode::element("span").text(c.get("label").to_display_string()).build())
        })
        .prop("label", "none")
        .hook(Lifecycle::Updated, record(&events, "updated"))
        .build();

        let parent = Options::new("Parent", move |c| {
            Ok(VNode::element("div")
                .child(
                    VNode::component(child.clone())
                        .prop_data("label", c.get("label"))
                        .build(),
                )
                .build())
        })
        .data(|| Value::from(json!({ "label": "a" })))
        .hook(Lifecycle::Updated, record(&events, "updated"))
        .build();

        let app = Component::new(parent, patcher()).unwrap();
        app.mount(None).unwrap();
        app.set("label", "b");
        run_microtasks();
        assert_eq!(*events.borrow(), vec!["Child:updated", "Parent:updated"]);
    }

    #[test]
    fn component_refs_format_the_instance() {
        let child = Options::new("Inner", |_| Ok(VNode::element("i").build())).build();
        let parent = Options::new("Outer", move |_| {
            Ok(VNode::element("div")
                .child(VNode::component(child.clone()).ref_name("inner").build())
                .build())
        })
        .build();
        let app = Component::new(parent, patcher()).unwrap();
        app.mount(None).unwrap();

        let entry = app.ref_entry("inner").unwrap();
        assert_eq!(entry.component().unwrap().name(), "Inner");
        let printed = format!("{entry:?}");
        assert!(printed.starts_with("Component(Component {"));
        assert!(printed.contains("\"Inner\""));
    }

    #[test]
    fn writing_a_prop_warns() {
        let warnings = log();
        let sink = warnings.clone();
        config::set_warn_handler(Some(Rc::new(move |m: &str| sink.borrow_mut().push(m.to_string()))));

        let options = Options::new("Leaf", |_| Ok(VNode::empty())).prop("size", 1).build();
        let leaf = Component::new(options, patcher()).unwrap();
        leaf.set("size", 2);
        config::set_warn_handler(None);

        assert_eq!(leaf.get("size"), Value::from(2));
        assert!(warnings.borrow().iter().any(|w| w.contains("Prop being mutated: \"size\"")));
    }

    #[test]
    fn destroy_tears_down_watchers_and_tree() {
        let events = log();
        let options = Options::new("Gone", |c| {
            Ok(VNode::element("p").text(c.get("count").to_display_string()).build())
        })
        .data(|| Value::from(json!({ "count": 0 })))
        .hook(Lifecycle::BeforeDestroy, record(&events, "beforeDestroy"))
        .hook(Lifecycle::Destroyed, record(&events, "destroyed"))
        .build();
        let app = Component::new(options, patcher()).unwrap();
        app.mount(None).unwrap();
        let watcher = app.render_watcher().unwrap();

        app.destroy();
        app.destroy();
        assert!(app.is_destroyed());
        assert!(!watcher.is_active());
        assert_eq!(*events.borrow(), vec!["Gone:beforeDestroy", "Gone:destroyed"]);

        app.set("count", 5);
        run_microtasks();
        assert_eq!(app.el().unwrap().to_html(), "<p>0</p>");
    }

    #[test]
    fn declared_watch_runs_before_render() {
        let order = log();
        let o = order.clone();
        let r = order.clone();
        let options = Options::new("Ordered", move |c| {
            r.borrow_mut().push(format!("render {}", c.get("n").to_display_string()));
            Ok(VNode::empty())
        })
        .data(|| Value::from(json!({ "n": 1 })))
        .watch("n", move |_, new, old| {
            o.borrow_mut().push(format!("watch {} -> {}", old.to_display_string(), new.to_display_string()));
            Ok(())
        })
        .build();
        let app = Component::new(options, patcher()).unwrap();
        app.mount(None).unwrap();
        order.borrow_mut().clear();

        app.set("n", 2);
        run_microtasks();
        assert_eq!(*order.borrow(), vec!["watch 1 -> 2", "render 2"]);
    }

    #[test]
    fn emit_reaches_parent_listener() {
        let got = log();
        let sink = got.clone();
        let child = Options::new("Button", |_| Ok(VNode::element("button").build())).build();
        let parent = Options::new("Form", move |_| {
            let sink = sink.clone();
            Ok(VNode::element("form")
                .child(
                    VNode::component(child.clone())
                        .ref_name("button")
                        .listener("click", move |v| sink.borrow_mut().push(v.to_display_string()))
                        .build(),
                )
                .build())
        })
        .build();
        let app = Component::new(parent, patcher()).unwrap();
        app.mount(None).unwrap();

        let button = app.ref_entry("button").and_then(|r| r.component().cloned()).unwrap();
        assert!(button.emit("click", &Value::from("hi")));
        assert!(!button.emit("hover", &Value::Undefined));
        assert_eq!(*got.borrow(), vec!["hi"]);
    }

    #[test]
    fn element_refs_track_rendering() {
        let options = Options::new("Refs", |c| {
            let mut root = VNode::element("div");
            if c.get("show").as_bool().unwrap_or(false) {
                root = root.child(VNode::element("input").ref_name("field").build());
            }
            Ok(root.with_data().build())
        })
        .data(|| Value::from(json!({ "show": true })))
        .build();
        let app = Component::new(options, patcher()).unwrap();
        app.mount(None).unwrap();
        let field = app.ref_entry("field").and_then(|r| r.element().cloned()).unwrap();
        assert_eq!(field.tag(), Some("input"));

        app.set("show", false);
        run_microtasks();
        assert!(app.ref_entry("field").is_none());
    }

    #[test]
    fn counter_renders_through_scope() {
        let app = Component::new(counter(), patcher()).unwrap();
        app.mount(None).unwrap();
        assert_eq!(app.scope().get("count"), Value::from(0));
        assert_eq!(app.el().unwrap().text_content(), "0");
    }
}
