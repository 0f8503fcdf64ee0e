//! Keep-alive cache: component instances survive being switched out of the
//! tree and are reactivated, host node included, when they come back.

use std::cell::RefCell;
use std::fmt;

use indexmap::IndexMap;

use super::vnode::VNode;

/// Least-recently-used cache of component vnodes.
///
/// A render function passes the component vnode it is about to return
/// through [`wrap`](Self::wrap). Cached vnodes are deactivated rather than
/// destroyed when they leave the tree; when `max` is set the least recently
/// rendered entry is destroyed once the cache overflows.
pub struct KeepAlive<N: 'static> {
    cache: RefCell<IndexMap<String, VNode<N>>>,
    max: Option<usize>,
    current: RefCell<Option<String>>,
}

impl<N: Clone + 'static> KeepAlive<N> {
    pub fn new() -> Self {
        Self {
            cache: RefCell::new(IndexMap::new()),
            max: None,
            current: RefCell::new(None),
        }
    }

    /// Bound the number of cached instances.
    pub fn with_max(max: usize) -> Self {
        Self {
            max: Some(max),
            ..Self::new()
        }
    }

    fn cache_key(vnode: &VNode<N>) -> Option<String> {
        let options = vnode.component_options()?;
        Some(match vnode.key() {
            Some(key) => key.to_string(),
            None => format!("{}::{}", options.ctor.cid(), options.ctor.name()),
        })
    }

    /// Register `vnode` with the cache and mark it kept alive. A cache hit
    /// hands the cached instance to `vnode`. Non-component vnodes pass
    /// through untouched.
    pub fn wrap(&self, vnode: VNode<N>) -> VNode<N> {
        let Some(key) = Self::cache_key(&vnode) else {
            return vnode;
        };
        let cached = self.cache.borrow_mut().shift_remove(&key);
        match cached {
            Some(cached) => {
                vnode.set_component_instance(cached.component_instance());
                tracing::trace!(key = %key, "keep-alive hit");
                self.cache.borrow_mut().insert(key.clone(), vnode.clone());
            }
            None => {
                self.cache.borrow_mut().insert(key.clone(), vnode.clone());
                let overflow = self.max.is_some_and(|max| self.len() > max);
                if overflow {
                    let oldest = self.cache.borrow().keys().next().cloned();
                    if let Some(oldest) = oldest {
                        self.evict(&oldest, Some(&key));
                    }
                }
            }
        }
        vnode.set_keep_alive(true);
        *self.current.borrow_mut() = Some(key);
        vnode
    }

    /// Drop and destroy the entry under `key`, unless it is the one being
    /// rendered now.
    fn evict(&self, key: &str, current: Option<&str>) {
        let Some(vnode) = self.cache.borrow_mut().shift_remove(key) else {
            return;
        };
        tracing::debug!(key, "keep-alive evicting cached instance");
        if current == Some(key) {
            return;
        }
        if let Some(instance) = vnode.component_instance() {
            instance.destroy();
        }
    }

    /// Evict every entry whose component name fails `keep`.
    pub fn prune(&self, keep: impl Fn(&str) -> bool) {
        let doomed: Vec<String> = self
            .cache
            .borrow()
            .iter()
            .filter(|(_, vnode)| {
                vnode
                    .component_options()
                    .is_some_and(|o| !keep(o.ctor.name()))
            })
            .map(|(key, _)| key.clone())
            .collect();
        let current = self.current.borrow().clone();
        for key in doomed {
            self.evict(&key, current.as_deref());
        }
    }

    /// Destroy every cached instance.
    pub fn clear(&self) {
        let keys: Vec<String> = self.cache.borrow().keys().cloned().collect();
        for key in keys {
            self.evict(&key, None);
        }
        self.current.borrow_mut().take();
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache keys, least recently rendered first.
    pub fn keys(&self) -> Vec<String> {
        self.cache.borrow().keys().cloned().collect()
    }
}

impl<N: Clone + 'static> Default for KeepAlive<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: 'static> fmt::Debug for KeepAlive<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeepAlive")
            .field("keys", &self.cache.borrow().keys().collect::<Vec<_>>())
            .field("max", &self.max)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Value;
    use crate::scheduler::run_microtasks;
    use crate::vdom::component::{Component, ComponentOptions, Lifecycle};
    use crate::vdom::memory::{MemoryDom, MemoryNode};
    use crate::vdom::Patcher;
    use serde_json::json;
    use std::rc::Rc;

    type Options = ComponentOptions<MemoryNode>;

    fn tab(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Rc<Options> {
        let mut options = Options::new(name, move |_| Ok(VNode::element("section").text(name).build()));
        for lifecycle in [
            Lifecycle::Mounted,
            Lifecycle::Activated,
            Lifecycle::Deactivated,
            Lifecycle::Destroyed,
        ] {
            let log = log.clone();
            options = options.hook(lifecycle, move |c| {
                log.borrow_mut().push(format!("{}:{lifecycle}", c.name()));
                Ok(())
            });
        }
        options.build()
    }

    fn switcher(tabs: Vec<Rc<Options>>, cache: Rc<KeepAlive<MemoryNode>>) -> Rc<Options> {
        Options::new("Tabs", move |c| {
            let index = c.get("tab").as_f64().unwrap_or(0.0) as usize;
            let vnode = cache.wrap(VNode::component(tabs[index].clone()).build());
            Ok(VNode::element("div").child(vnode).build())
        })
        .data(|| Value::from(json!({ "tab": 0 })))
        .build()
    }

    #[test]
    fn switching_back_reuses_the_instance() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let cache = Rc::new(KeepAlive::new());
        let tabs = vec![tab("A", &log), tab("B", &log)];
        let dom = MemoryDom::new();
        let app = Component::new(switcher(tabs, cache.clone()), Patcher::new(dom, Vec::new())).unwrap();
        app.mount(None).unwrap();
        let first = app.children()[0].clone();

        app.set("tab", 1);
        run_microtasks();
        assert!(first.is_inactive());
        assert!(!first.is_destroyed());
        assert_eq!(app.el().unwrap().text_content(), "B");

        app.set("tab", 0);
        run_microtasks();
        assert_eq!(app.el().unwrap().text_content(), "A");
        assert!(!first.is_inactive());
        assert_eq!(cache.keys().len(), 2);
        assert_eq!(
            *log.borrow(),
            vec![
                "A:mounted",
                "A:activated",
                "A:deactivated",
                "B:mounted",
                "B:activated",
                "B:deactivated",
                "A:activated",
            ]
        );
    }

    #[test]
    fn max_evicts_least_recently_rendered() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let cache = Rc::new(KeepAlive::with_max(1));
        let tabs = vec![tab("A", &log), tab("B", &log)];
        let app = Component::new(
            switcher(tabs, cache.clone()),
            Patcher::new(MemoryDom::new(), Vec::new()),
        )
        .unwrap();
        app.mount(None).unwrap();
        let first = app.children()[0].clone();

        app.set("tab", 1);
        run_microtasks();
        assert!(first.is_destroyed());
        assert_eq!(cache.len(), 1);
        assert!(log.borrow().contains(&"A:destroyed".to_string()));
    }

    #[test]
    fn non_component_vnodes_pass_through() {
        let cache: KeepAlive<MemoryNode> = KeepAlive::new();
        let vnode = cache.wrap(VNode::element("p").build());
        assert!(!vnode.keep_alive());
        assert!(cache.is_empty());
    }
}
