//! Virtual DOM
//!
//! Render functions describe the desired tree as [`VNode`]s; the
//! [`Patcher`] reconciles each new tree against the previous one and applies
//! the difference to a host tree through [`NodeOps`].
//!
//! # Components
//!
//! A [`Component`] is a render function plus reactive state. Mounting it
//! creates a render watcher, so the component re-renders and re-patches on
//! the next tick after any state it read changes. Component placeholder
//! vnodes ([`VNode::component`]) create, update and destroy child instances
//! as the parent's tree is reconciled, and [`KeepAlive`] lets an instance
//! outlive its placeholder.
//!
//! # Backends
//!
//! The crate ships [`MemoryDom`], an in-memory host tree that counts the
//! operations applied to it. Any other backend implements [`NodeOps`] (and
//! [`AttributeOps`] to use [`AttrsModule`]).

mod component;
mod keep_alive;
mod memory;
mod modules;
mod node_ops;
mod patch;
mod vnode;

pub use component::{
    Component, ComponentOptions, ComponentWatchCallback, DataFn, Lifecycle, LifecycleHook,
    PropDef, RenderFn, WeakComponent,
};
pub use keep_alive::KeepAlive;
pub use memory::{MemoryDom, MemoryNode, OpCounts};
pub use modules::{
    register_ref, AttrsModule, Directive, DirectiveBinding, DirectiveDef, DirectiveHook,
    DirectivesModule, Module, RefEntry, RefTarget, RefsModule, RemoveHandle,
};
pub use node_ops::{AttributeOps, NodeOps};
pub use patch::{PatchTarget, Patcher, Reconciler};
pub use vnode::{
    create_element, same_input_type, same_vnode, AsyncFactory, ComponentVNodeOptions, Handler,
    Key, PatchCallback, VNode, VNodeBuilder, VNodeCallback, VNodeData, VNodeHooks,
};
