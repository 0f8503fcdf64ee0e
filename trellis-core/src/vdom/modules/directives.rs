//! Custom directives: reusable low-level behaviour bound to host nodes.
//!
//! Each directive definition may implement `bind` (first attached),
//! `inserted` (node is in the document), `update` (owning vnode patched),
//! `component_updated` (owning vnode and its children patched) and `unbind`
//! (directive removed or node destroyed).

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::Module;
use crate::error::{handle_error, Result};
use crate::reactive::Value;
use crate::vdom::vnode::VNode;

/// Directive hook: `(host node, binding, vnode, old vnode)`.
pub type DirectiveHook<N> = Rc<dyn Fn(&N, &DirectiveBinding, &VNode<N>, Option<&VNode<N>>) -> Result<()>>;

/// The hooks of one directive.
pub struct DirectiveDef<N: 'static> {
    pub bind: Option<DirectiveHook<N>>,
    pub inserted: Option<DirectiveHook<N>>,
    pub update: Option<DirectiveHook<N>>,
    pub component_updated: Option<DirectiveHook<N>>,
    pub unbind: Option<DirectiveHook<N>>,
}

impl<N: 'static> Default for DirectiveDef<N> {
    fn default() -> Self {
        Self {
            bind: None,
            inserted: None,
            update: None,
            component_updated: None,
            unbind: None,
        }
    }
}

/// A directive applied to a vnode.
pub struct Directive<N: 'static> {
    pub name: String,
    pub value: Value,
    pub arg: Option<String>,
    pub modifiers: SmallVec<[String; 2]>,
    pub expression: Option<String>,
    pub def: Rc<DirectiveDef<N>>,
}

impl<N: 'static> Clone for Directive<N> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            value: self.value.clone(),
            arg: self.arg.clone(),
            modifiers: self.modifiers.clone(),
            expression: self.expression.clone(),
            def: self.def.clone(),
        }
    }
}

impl<N: 'static> Directive<N> {
    pub fn new(name: impl Into<String>, value: impl Into<Value>, def: Rc<DirectiveDef<N>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            arg: None,
            modifiers: SmallVec::new(),
            expression: None,
            def,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    /// Name plus modifiers; two directives with the same raw name on old and
    /// new vnode are the same directive.
    pub fn raw_name(&self) -> String {
        let mut raw = self.name.clone();
        for m in &self.modifiers {
            raw.push('.');
            raw.push_str(m);
        }
        raw
    }
}

impl<N: 'static> fmt::Debug for Directive<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.raw_name())
            .field("value", &self.value)
            .finish()
    }
}

/// What a directive hook receives about its binding.
#[derive(Debug, Clone)]
pub struct DirectiveBinding {
    pub name: String,
    pub value: Value,
    pub old_value: Value,
    pub arg: Option<String>,
    pub old_arg: Option<String>,
    pub modifiers: SmallVec<[String; 2]>,
    pub expression: Option<String>,
}

impl DirectiveBinding {
    fn new<N: 'static>(dir: &Directive<N>, old: Option<&Directive<N>>) -> Self {
        Self {
            name: dir.name.clone(),
            value: dir.value.clone(),
            old_value: old.map(|o| o.value.clone()).unwrap_or_default(),
            arg: dir.arg.clone(),
            old_arg: old.and_then(|o| o.arg.clone()),
            modifiers: dir.modifiers.clone(),
            expression: dir.expression.clone(),
        }
    }
}

/// Runs directive hooks at the right points of the patch cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectivesModule;

impl<N: Clone + 'static> Module<N> for DirectivesModule {
    fn create(&self, vnode: &VNode<N>) {
        update_directives(None, Some(vnode));
    }

    fn update(&self, old: &VNode<N>, vnode: &VNode<N>) {
        update_directives(Some(old), Some(vnode));
    }

    fn destroy(&self, vnode: &VNode<N>) {
        update_directives(Some(vnode), None);
    }
}

fn directives_of<N: Clone + 'static>(vnode: Option<&VNode<N>>) -> IndexMap<String, Directive<N>> {
    vnode
        .and_then(VNode::data)
        .map(|d| d.directives.iter().map(|dir| (dir.raw_name(), dir.clone())).collect())
        .unwrap_or_default()
}

fn call_hook<N: Clone + 'static>(
    hook: &Option<DirectiveHook<N>>,
    hook_name: &str,
    binding: &DirectiveBinding,
    vnode: &VNode<N>,
    old: Option<&VNode<N>>,
) {
    let Some(hook) = hook else { return };
    let Some(elm) = vnode.elm() else { return };
    if let Err(err) = hook(&elm, binding, vnode, old) {
        handle_error(&err, &format!("directive {} {hook_name} hook", binding.name));
    }
}

fn update_directives<N: Clone + 'static>(old: Option<&VNode<N>>, vnode: Option<&VNode<N>>) {
    let old_dirs = directives_of(old);
    let new_dirs = directives_of(vnode);
    if old_dirs.is_empty() && new_dirs.is_empty() {
        return;
    }
    let is_create = old.is_none();

    if let Some(vnode) = vnode {
        let mut inserted = Vec::new();
        let mut component_updated = Vec::new();

        for (key, dir) in &new_dirs {
            match old_dirs.get(key) {
                None => {
                    let binding = DirectiveBinding::new(dir, None);
                    call_hook(&dir.def.bind, "bind", &binding, vnode, old);
                    if dir.def.inserted.is_some() {
                        inserted.push((dir.def.clone(), binding));
                    }
                }
                Some(old_dir) => {
                    let binding = DirectiveBinding::new(dir, Some(old_dir));
                    call_hook(&dir.def.update, "update", &binding, vnode, old);
                    if dir.def.component_updated.is_some() {
                        component_updated.push((dir.def.clone(), binding));
                    }
                }
            }
        }

        if !inserted.is_empty() {
            let run_inserted = move |v: &VNode<N>| {
                for (def, binding) in &inserted {
                    call_hook(&def.inserted, "inserted", binding, v, None);
                }
            };
            if is_create {
                vnode.add_insert_hook(Rc::new(run_inserted));
            } else {
                run_inserted(vnode);
            }
        }

        if !component_updated.is_empty() {
            vnode.add_postpatch_hook(Rc::new(move |old: &VNode<N>, v: &VNode<N>| {
                for (def, binding) in &component_updated {
                    call_hook(&def.component_updated, "componentUpdated", binding, v, Some(old));
                }
            }));
        }
    }

    if !is_create {
        if let Some(old) = old {
            let still_bound = |key: &String| vnode.is_some() && new_dirs.contains_key(key);
            for (key, dir) in &old_dirs {
                if !still_bound(key) {
                    let binding = DirectiveBinding::new(dir, Some(dir));
                    call_hook(&dir.def.unbind, "unbind", &binding, old, Some(old));
                }
            }
        }
    }
}
