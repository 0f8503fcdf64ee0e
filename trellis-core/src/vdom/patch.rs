//! Reconciler
//!
//! [`Patcher`] turns a new vnode tree into host-tree mutations by comparing
//! it with the previous tree.
//!
//! # Algorithm
//!
//! 1. If the new root is the same logical node as the old one (equal keys,
//!    tags and input types, see [`same_vnode`]) it is patched in place:
//!    the host node is reused, module `update` hooks run and the children
//!    are reconciled. Otherwise a new subtree is built next to the old host
//!    node and the old one is removed.
//!
//! 2. Children are reconciled with a two-ended scan over four cursors (old
//!    start/end, new start/end). Matching ends are patched in place; a node
//!    that moved from one end to the other is patched and moved with a
//!    single `insert_before`. When no end matches, the new start node is
//!    looked up by key in the remaining old range, and moved, patched or
//!    created accordingly.
//!
//! 3. Whatever is left once one side is exhausted is bulk-created or
//!    bulk-removed.
//!
//! 4. Insert hooks (component `mounted`, directive `inserted`) are queued
//!    while the tree is built and run once the whole subtree is attached,
//!    so nested components mount child first.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use super::component;
use super::modules::{register_ref, DirectivesModule, Module, RefsModule, RemoveHandle};
use super::node_ops::NodeOps;
use super::vnode::{same_vnode, Key, VNode};
use crate::config;
use crate::error::{warn, Result};

/// What a patch starts from.
pub enum PatchTarget<N: 'static> {
    /// Nothing has been rendered yet.
    Empty,
    /// The previously rendered tree.
    VNode(VNode<N>),
    /// An existing host node to replace, e.g. a mount point.
    Node(N),
}

impl<N: 'static> fmt::Debug for PatchTarget<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchTarget::Empty => f.write_str("Empty"),
            PatchTarget::VNode(v) => f.debug_tuple("VNode").field(v).finish(),
            PatchTarget::Node(_) => f.write_str("Node(..)"),
        }
    }
}

/// The patch entry point components render through.
pub trait Reconciler<N: 'static> {
    /// Reconcile `vnode` against `old` and return the host node that now
    /// represents it. With `vnode == None` the old tree is destroyed.
    ///
    /// `hydrating` is accepted for API compatibility; hydration is not
    /// performed and an existing host node is always replaced.
    /// `remove_only` suppresses moves during list reconciliation.
    fn patch(
        &self,
        old: PatchTarget<N>,
        vnode: Option<&VNode<N>>,
        hydrating: bool,
        remove_only: bool,
    ) -> Result<Option<N>>;
}

type Owner<'a, N> = Option<(&'a VNode<N>, usize)>;

/// Reconciler over a [`NodeOps`] backend and a list of modules.
pub struct Patcher<O: NodeOps> {
    ops: O,
    modules: Vec<Rc<dyn Module<O::Node>>>,
    this: Weak<Patcher<O>>,
}

impl<O: NodeOps + 'static> Patcher<O> {
    /// Build a patcher. The refs and directives modules are appended after
    /// `platform_modules`.
    pub fn new(ops: O, platform_modules: Vec<Rc<dyn Module<O::Node>>>) -> Rc<Self> {
        let mut modules = platform_modules;
        modules.push(Rc::new(RefsModule));
        modules.push(Rc::new(DirectivesModule));
        Rc::new_cyclic(|this| Self {
            ops,
            modules,
            this: this.clone(),
        })
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    fn reconciler(&self) -> Option<Rc<dyn Reconciler<O::Node>>> {
        let this: Rc<dyn Reconciler<O::Node>> = self.this.upgrade()?;
        Some(this)
    }

    fn empty_node_at(&self, elm: O::Node) -> VNode<O::Node> {
        let tag = self.ops.tag_name(&elm).to_lowercase();
        VNode::element(tag).elm(elm).build()
    }

    fn remove_node(&self, elm: &O::Node) {
        if let Some(parent) = self.ops.parent_node(elm) {
            self.ops.remove_child(&parent, elm);
        }
    }

    fn insert(&self, parent: Option<&O::Node>, elm: &O::Node, reference: Option<&O::Node>) {
        let Some(parent) = parent else { return };
        match reference {
            Some(r) => {
                if self.ops.parent_node(r).as_ref() == Some(parent) {
                    self.ops.insert_before(parent, elm, Some(r));
                }
            }
            None => self.ops.append_child(parent, elm),
        }
    }

    /// Reused vnodes are cloned before being mounted again, and the clone is
    /// written back into the owning children list.
    fn claim(vnode: &VNode<O::Node>, owner: Owner<'_, O::Node>) -> VNode<O::Node> {
        match owner {
            Some((parent, index)) if vnode.elm().is_some() => {
                let clone = vnode.clone_vnode();
                parent.replace_child(index, clone.clone());
                clone
            }
            _ => vnode.clone(),
        }
    }

    fn create_elm(
        &self,
        vnode: &VNode<O::Node>,
        queue: &mut Vec<VNode<O::Node>>,
        parent_elm: Option<&O::Node>,
        ref_elm: Option<&O::Node>,
        owner: Owner<'_, O::Node>,
    ) -> Result<VNode<O::Node>> {
        let vnode = Self::claim(vnode, owner);

        if self.create_component(&vnode, queue, parent_elm, ref_elm)? {
            return Ok(vnode);
        }

        if let Some(tag) = vnode.tag() {
            let elm = match vnode.ns() {
                Some(ns) => self.ops.create_element_ns(ns, tag),
                None => self.ops.create_element(tag),
            };
            vnode.set_elm(Some(elm.clone()));
            self.set_scope(&vnode);
            self.create_children(&vnode, &elm, queue)?;
            if vnode.data().is_some() {
                self.invoke_create_hooks(&vnode, queue);
            }
            self.insert(parent_elm, &elm, ref_elm);
        } else if vnode.is_comment() {
            let elm = self.ops.create_comment(vnode.text_content().unwrap_or_default());
            vnode.set_elm(Some(elm.clone()));
            self.insert(parent_elm, &elm, ref_elm);
        } else {
            let elm = self.ops.create_text_node(vnode.text_content().unwrap_or_default());
            vnode.set_elm(Some(elm.clone()));
            self.insert(parent_elm, &elm, ref_elm);
        }
        Ok(vnode)
    }

    fn create_component(
        &self,
        vnode: &VNode<O::Node>,
        queue: &mut Vec<VNode<O::Node>>,
        parent_elm: Option<&O::Node>,
        ref_elm: Option<&O::Node>,
    ) -> Result<bool> {
        if !vnode.is_component() {
            return Ok(false);
        }
        let Some(reconciler) = self.reconciler() else {
            return Ok(false);
        };
        let is_reactivated = vnode.component_instance().is_some() && vnode.keep_alive();
        component::init_hook(vnode, reconciler)?;

        if vnode.component_instance().is_none() {
            return Ok(false);
        }
        self.init_component(vnode, queue);
        if let Some(elm) = vnode.elm() {
            self.insert(parent_elm, &elm, ref_elm);
        }
        if is_reactivated {
            self.reactivate_component(vnode);
        }
        Ok(true)
    }

    fn init_component(&self, vnode: &VNode<O::Node>, queue: &mut Vec<VNode<O::Node>>) {
        if let Some(pending) = vnode.take_pending_insert() {
            queue.extend(pending);
        }
        vnode.set_elm(vnode.component_instance().and_then(|c| c.el()));
        if self.is_patchable(vnode) {
            self.invoke_create_hooks(vnode, queue);
            self.set_scope(vnode);
        } else {
            // Empty component root: only the ref needs registering.
            register_ref(vnode, false);
            queue.push(vnode.clone());
        }
    }

    fn reactivate_component(&self, vnode: &VNode<O::Node>) {
        let mut inner = vnode.clone();
        while let Some(root) = inner.component_instance().and_then(|c| c.root_vnode()) {
            inner = root;
        }
        if inner.data().is_some() {
            for module in &self.modules {
                module.activate(&inner);
            }
        }
        tracing::trace!(tag = ?vnode.tag(), "reactivated kept-alive component");
    }

    fn create_children(
        &self,
        vnode: &VNode<O::Node>,
        elm: &O::Node,
        queue: &mut Vec<VNode<O::Node>>,
    ) -> Result<()> {
        if let Some(children) = vnode.children() {
            check_duplicate_keys(&children);
            for (index, child) in children.iter().enumerate() {
                self.create_elm(child, queue, Some(elm), None, Some((vnode, index)))?;
            }
        } else if let Some(text) = vnode.text_content() {
            let text_node = self.ops.create_text_node(text);
            self.ops.append_child(elm, &text_node);
        }
        Ok(())
    }

    /// Whether the vnode, looking through component roots, ends in an
    /// element.
    fn is_patchable(&self, vnode: &VNode<O::Node>) -> bool {
        let mut current = vnode.clone();
        while let Some(root) = current.component_instance().and_then(|c| c.root_vnode()) {
            current = root;
        }
        current.tag().is_some()
    }

    fn invoke_create_hooks(&self, vnode: &VNode<O::Node>, queue: &mut Vec<VNode<O::Node>>) {
        for module in &self.modules {
            module.create(vnode);
        }
        if let Some(create) = vnode.data().and_then(|d| d.hook.create.clone()) {
            create(vnode);
        }
        if vnode.has_insert_hook() {
            queue.push(vnode.clone());
        }
    }

    fn set_scope(&self, vnode: &VNode<O::Node>) {
        let Some(elm) = vnode.elm() else { return };
        let mut ancestor = Some(vnode.clone());
        while let Some(current) = ancestor {
            if let Some(scope) = current.context().and_then(|c| c.scope_id()) {
                self.ops.set_style_scope(&elm, &scope);
            }
            ancestor = current.parent();
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_vnodes(
        &self,
        owner: &VNode<O::Node>,
        parent_elm: &O::Node,
        ref_elm: Option<&O::Node>,
        vnodes: &mut [VNode<O::Node>],
        start: isize,
        end: isize,
        queue: &mut Vec<VNode<O::Node>>,
    ) -> Result<()> {
        for index in start..=end {
            let index = index as usize;
            vnodes[index] = self.create_elm(
                &vnodes[index],
                queue,
                Some(parent_elm),
                ref_elm,
                Some((owner, index)),
            )?;
        }
        Ok(())
    }

    fn remove_vnodes(&self, vnodes: impl IntoIterator<Item = VNode<O::Node>>) {
        for vnode in vnodes {
            if vnode.tag().is_some() {
                self.remove_and_invoke_remove_hook(&vnode, None);
                self.invoke_destroy_hook(&vnode);
            } else if let Some(elm) = vnode.elm() {
                self.remove_node(&elm);
            }
        }
    }

    fn remove_and_invoke_remove_hook(&self, vnode: &VNode<O::Node>, handle: Option<RemoveHandle>) {
        if handle.is_none() && vnode.data().is_none() {
            if let Some(elm) = vnode.elm() {
                self.remove_node(&elm);
            }
            return;
        }

        let listeners = self.modules.len() + 1;
        let handle = match handle {
            Some(handle) => {
                handle.add_listeners(listeners);
                handle
            }
            None => {
                let this = self.this.clone();
                let elm = vnode.elm();
                RemoveHandle::new(listeners, move || {
                    if let (Some(patcher), Some(elm)) = (this.upgrade(), elm) {
                        patcher.remove_node(&elm);
                    }
                })
            }
        };

        if let Some(root) = vnode.component_instance().and_then(|c| c.root_vnode()) {
            if root.data().is_some() {
                self.remove_and_invoke_remove_hook(&root, Some(handle.clone()));
            }
        }
        for module in &self.modules {
            module.remove(vnode, handle.clone());
        }
        match vnode.data().and_then(|d| d.hook.remove.clone()) {
            Some(remove) => remove(vnode, handle),
            None => handle.done(),
        }
    }

    fn invoke_destroy_hook(&self, vnode: &VNode<O::Node>) {
        if let Some(data) = vnode.data() {
            if let Some(destroy) = data.hook.destroy.clone() {
                destroy(vnode);
            }
            if vnode.is_component() {
                component::destroy_hook(vnode);
            }
            for module in &self.modules {
                module.destroy(vnode);
            }
        }
        if let Some(children) = vnode.children() {
            for child in &children {
                self.invoke_destroy_hook(child);
            }
        }
    }

    fn update_children(
        &self,
        parent_elm: &O::Node,
        old_ch: Vec<VNode<O::Node>>,
        owner: &VNode<O::Node>,
        new_ch: Vec<VNode<O::Node>>,
        queue: &mut Vec<VNode<O::Node>>,
        remove_only: bool,
    ) -> Result<()> {
        let mut old_ch: Vec<Option<VNode<O::Node>>> = old_ch.into_iter().map(Some).collect();
        let mut new_ch = new_ch;
        let mut old_start: isize = 0;
        let mut old_end: isize = old_ch.len() as isize - 1;
        let mut new_start: isize = 0;
        let mut new_end: isize = new_ch.len() as isize - 1;
        let mut old_key_to_idx: Option<HashMap<Key, usize>> = None;
        let can_move = !remove_only;

        check_duplicate_keys(&new_ch);
        tracing::trace!(old = old_ch.len(), new = new_ch.len(), "reconciling children");

        while old_start <= old_end && new_start <= new_end {
            let (os, oe) = (old_start as usize, old_end as usize);
            let (ns, ne) = (new_start as usize, new_end as usize);

            let Some(old_start_vnode) = old_ch[os].clone() else {
                old_start += 1;
                continue;
            };
            let Some(old_end_vnode) = old_ch[oe].clone() else {
                old_end -= 1;
                continue;
            };
            let new_start_vnode = new_ch[ns].clone();
            let new_end_vnode = new_ch[ne].clone();

            if same_vnode(&old_start_vnode, &new_start_vnode) {
                new_ch[ns] = self.patch_vnode(
                    &old_start_vnode,
                    &new_start_vnode,
                    queue,
                    Some((owner, ns)),
                    remove_only,
                )?;
                old_start += 1;
                new_start += 1;
            } else if same_vnode(&old_end_vnode, &new_end_vnode) {
                new_ch[ne] = self.patch_vnode(
                    &old_end_vnode,
                    &new_end_vnode,
                    queue,
                    Some((owner, ne)),
                    remove_only,
                )?;
                old_end -= 1;
                new_end -= 1;
            } else if same_vnode(&old_start_vnode, &new_end_vnode) {
                // Moved right.
                new_ch[ne] = self.patch_vnode(
                    &old_start_vnode,
                    &new_end_vnode,
                    queue,
                    Some((owner, ne)),
                    remove_only,
                )?;
                if can_move {
                    if let (Some(elm), Some(end_elm)) = (old_start_vnode.elm(), old_end_vnode.elm()) {
                        let after = self.ops.next_sibling(&end_elm);
                        self.ops.insert_before(parent_elm, &elm, after.as_ref());
                    }
                }
                old_start += 1;
                new_end -= 1;
            } else if same_vnode(&old_end_vnode, &new_start_vnode) {
                // Moved left.
                new_ch[ns] = self.patch_vnode(
                    &old_end_vnode,
                    &new_start_vnode,
                    queue,
                    Some((owner, ns)),
                    remove_only,
                )?;
                if can_move {
                    if let Some(elm) = old_end_vnode.elm() {
                        self.ops
                            .insert_before(parent_elm, &elm, old_start_vnode.elm().as_ref());
                    }
                }
                old_end -= 1;
                new_start += 1;
            } else {
                let index_in_old = match new_start_vnode.key() {
                    Some(key) => old_key_to_idx
                        .get_or_insert_with(|| create_key_to_old_idx(&old_ch, os, oe))
                        .get(key)
                        .copied(),
                    None => find_idx_in_old(&new_start_vnode, &old_ch, os, oe),
                };
                let to_move = index_in_old
                    .and_then(|i| old_ch[i].clone().map(|v| (i, v)))
                    .filter(|(_, v)| same_vnode(v, &new_start_vnode));

                match to_move {
                    Some((index, vnode_to_move)) => {
                        new_ch[ns] = self.patch_vnode(
                            &vnode_to_move,
                            &new_start_vnode,
                            queue,
                            Some((owner, ns)),
                            remove_only,
                        )?;
                        old_ch[index] = None;
                        if can_move {
                            if let Some(elm) = vnode_to_move.elm() {
                                self.ops
                                    .insert_before(parent_elm, &elm, old_start_vnode.elm().as_ref());
                            }
                        }
                    }
                    // New element, or same key with incompatible content.
                    None => {
                        new_ch[ns] = self.create_elm(
                            &new_start_vnode,
                            queue,
                            Some(parent_elm),
                            old_start_vnode.elm().as_ref(),
                            Some((owner, ns)),
                        )?;
                    }
                }
                new_start += 1;
            }
        }

        if old_start > old_end {
            let ref_elm = new_ch
                .get((new_end + 1) as usize)
                .and_then(VNode::elm);
            self.add_vnodes(
                owner,
                parent_elm,
                ref_elm.as_ref(),
                &mut new_ch,
                new_start,
                new_end,
                queue,
            )?;
        } else if new_start > new_end {
            let stale = old_ch[old_start as usize..=old_end as usize]
                .iter()
                .flatten()
                .cloned()
                .collect::<Vec<_>>();
            self.remove_vnodes(stale);
        }
        Ok(())
    }

    fn patch_vnode(
        &self,
        old: &VNode<O::Node>,
        vnode: &VNode<O::Node>,
        queue: &mut Vec<VNode<O::Node>>,
        owner: Owner<'_, O::Node>,
        remove_only: bool,
    ) -> Result<VNode<O::Node>> {
        if old.ptr_eq(vnode) {
            return Ok(vnode.clone());
        }
        let vnode = Self::claim(vnode, owner);
        let elm = old.elm();
        vnode.set_elm(elm.clone());

        if old.is_async_placeholder() {
            if vnode.async_factory().is_some_and(|f| f.is_resolved()) {
                return self.replace(old, &vnode, queue);
            }
            vnode.mark_async_placeholder();
            return Ok(vnode);
        }

        if vnode.is_static()
            && old.is_static()
            && vnode.key() == old.key()
            && (vnode.is_cloned() || vnode.is_once())
        {
            vnode.set_component_instance(old.component_instance());
            return Ok(vnode);
        }

        if vnode.is_component() {
            component::prepatch_hook(old, &vnode);
        }
        if let Some(prepatch) = vnode.data().and_then(|d| d.hook.prepatch.clone()) {
            prepatch(old, &vnode);
        }

        if vnode.data().is_some() && self.is_patchable(&vnode) {
            for module in &self.modules {
                module.update(old, &vnode);
            }
            if let Some(update) = vnode.data().and_then(|d| d.hook.update.clone()) {
                update(old, &vnode);
            }
        }

        if let Some(elm) = &elm {
            if vnode.text_content().is_none() {
                match (old.children(), vnode.children()) {
                    (Some(old_ch), Some(ch)) => {
                        let unchanged = old_ch.len() == ch.len()
                            && old_ch.iter().zip(&ch).all(|(a, b)| a.ptr_eq(b));
                        if !unchanged {
                            self.update_children(elm, old_ch, &vnode, ch, queue, remove_only)?;
                        }
                    }
                    (None, Some(mut ch)) => {
                        check_duplicate_keys(&ch);
                        if old.text_content().is_some() {
                            self.ops.set_text_content(elm, "");
                        }
                        let end = ch.len() as isize - 1;
                        self.add_vnodes(&vnode, elm, None, &mut ch, 0, end, queue)?;
                    }
                    (Some(old_ch), None) => self.remove_vnodes(old_ch),
                    (None, None) => {
                        if old.text_content().is_some_and(|t| !t.is_empty()) {
                            self.ops.set_text_content(elm, "");
                        }
                    }
                }
            } else if old.text_content() != vnode.text_content() {
                self.ops
                    .set_text_content(elm, vnode.text_content().unwrap_or_default());
            }
        }

        if let Some(postpatch) = vnode.data().and_then(|d| d.hook.postpatch.clone()) {
            postpatch(old, &vnode);
        }
        for hook in vnode.postpatch_hooks() {
            hook(old, &vnode);
        }
        Ok(vnode)
    }

    /// Build `vnode` next to `old`'s host node and remove `old`.
    fn replace(
        &self,
        old: &VNode<O::Node>,
        vnode: &VNode<O::Node>,
        queue: &mut Vec<VNode<O::Node>>,
    ) -> Result<VNode<O::Node>> {
        let old_elm = old.elm();
        let parent_elm = old_elm.as_ref().and_then(|e| self.ops.parent_node(e));
        let ref_elm = old_elm.as_ref().and_then(|e| self.ops.next_sibling(e));

        let vnode = self.create_elm(vnode, queue, parent_elm.as_ref(), ref_elm.as_ref(), None)?;

        // Placeholders of components whose root was replaced must point at
        // the new host node.
        let patchable = self.is_patchable(&vnode);
        let mut ancestor = vnode.parent();
        while let Some(placeholder) = ancestor {
            for module in &self.modules {
                module.destroy(&placeholder);
            }
            placeholder.set_elm(vnode.elm());
            if patchable {
                let before = placeholder.insert_hooks().len();
                for module in &self.modules {
                    module.create(&placeholder);
                }
                for hook in placeholder.insert_hooks().into_iter().skip(before) {
                    hook(&placeholder);
                }
            } else {
                register_ref(&placeholder, false);
            }
            ancestor = placeholder.parent();
        }

        if parent_elm.is_some() {
            self.remove_vnodes([old.clone()]);
        } else if old.tag().is_some() {
            self.invoke_destroy_hook(old);
        }
        Ok(vnode)
    }

    fn invoke_insert_hook(&self, vnode: &VNode<O::Node>, queue: Vec<VNode<O::Node>>, initial: bool) {
        // A component's first render is attached by its parent; hand the
        // queue to the placeholder so the hooks run once that happens.
        if initial {
            if let Some(placeholder) = vnode.parent() {
                placeholder.set_pending_insert(queue);
                return;
            }
        }
        for inserted in queue {
            if inserted.is_component() {
                component::insert_hook(&inserted);
            }
            if let Some(insert) = inserted.data().and_then(|d| d.hook.insert.clone()) {
                insert(&inserted);
            }
            for hook in inserted.insert_hooks() {
                hook(&inserted);
            }
        }
    }
}

impl<O: NodeOps + 'static> Reconciler<O::Node> for Patcher<O> {
    fn patch(
        &self,
        old: PatchTarget<O::Node>,
        vnode: Option<&VNode<O::Node>>,
        hydrating: bool,
        remove_only: bool,
    ) -> Result<Option<O::Node>> {
        let Some(vnode) = vnode else {
            if let PatchTarget::VNode(old) = &old {
                tracing::debug!(tag = ?old.tag(), "destroying tree");
                self.invoke_destroy_hook(old);
            }
            return Ok(None);
        };
        tracing::debug!(tag = ?vnode.tag(), old = ?old, "patch");

        let mut queue = Vec::new();
        let mut initial = false;
        let vnode = match old {
            PatchTarget::Empty => {
                initial = true;
                self.create_elm(vnode, &mut queue, None, None, None)?
            }
            PatchTarget::VNode(old) if same_vnode(&old, vnode) => {
                self.patch_vnode(&old, vnode, &mut queue, None, remove_only)?
            }
            PatchTarget::VNode(old) => self.replace(&old, vnode, &mut queue)?,
            PatchTarget::Node(elm) => {
                if hydrating {
                    tracing::debug!("hydration requested; replacing the existing node instead");
                }
                let old = self.empty_node_at(elm);
                self.replace(&old, vnode, &mut queue)?
            }
        };

        self.invoke_insert_hook(&vnode, queue, initial);
        Ok(vnode.elm())
    }
}

impl<O: NodeOps + fmt::Debug> fmt::Debug for Patcher<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Patcher")
            .field("ops", &self.ops)
            .field("modules", &self.modules.len())
            .finish()
    }
}

fn check_duplicate_keys<N: Clone + 'static>(children: &[VNode<N>]) {
    if !config::with(|c| c.warn_duplicate_keys) {
        return;
    }
    let mut seen = HashSet::new();
    for key in children.iter().filter_map(VNode::key) {
        if !seen.insert(key) {
            warn(format!(
                "Duplicate keys detected: '{key}'. This may cause an update error."
            ));
        }
    }
}

fn create_key_to_old_idx<N: Clone + 'static>(
    children: &[Option<VNode<N>>],
    start: usize,
    end: usize,
) -> HashMap<Key, usize> {
    let mut map = HashMap::new();
    for (index, child) in children.iter().enumerate().take(end + 1).skip(start) {
        if let Some(key) = child.as_ref().and_then(VNode::key) {
            map.insert(key.clone(), index);
        }
    }
    map
}

fn find_idx_in_old<N: Clone + 'static>(
    node: &VNode<N>,
    children: &[Option<VNode<N>>],
    start: usize,
    end: usize,
) -> Option<usize> {
    (start..=end).find(|&i| children[i].as_ref().is_some_and(|c| same_vnode(node, c)))
}
