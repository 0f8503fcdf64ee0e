//! Integration Tests for the Reactive Runtime and Reconciler
//!
//! These tests drive the public API end to end: observed data feeding
//! watchers through the scheduler, and vnode trees patched into the
//! in-memory host tree.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;

use trellis_core::config;
use trellis_core::reactive::{
    effect, observe, Callback, Source, Value, Watcher, WatcherOptions,
};
use trellis_core::scheduler::{run_microtasks, set_host, tick, ManualHost, TokioHost};
use trellis_core::vdom::{
    AttrsModule, Component, ComponentOptions, Lifecycle, MemoryDom, MemoryNode, Module, NodeOps,
    PatchTarget, Patcher, Reconciler, VNode, VNodeHooks,
};
use trellis_core::Error;

type V = VNode<MemoryNode>;

fn observed(json: serde_json::Value) -> Value {
    let value = Value::from(json);
    observe(&value, false);
    value
}

fn recorder() -> (Rc<RefCell<Vec<(Value, Value)>>>, Callback) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = calls.clone();
    let callback: Callback = Rc::new(move |new: &Value, old: &Value| {
        sink.borrow_mut().push((new.clone(), old.clone()));
        Ok(())
    });
    (calls, callback)
}

fn doubled(data: &Value) -> Source {
    let data = data.clone();
    Source::labelled("data.a * 2", move || {
        let a = data.get("a").as_f64().unwrap_or_default();
        Ok(Value::from(a * 2.0))
    })
}

fn patcher() -> (MemoryDom, Rc<Patcher<MemoryDom>>) {
    let dom = MemoryDom::new();
    let attrs: Rc<dyn Module<MemoryNode>> = Rc::new(AttrsModule::new(dom.clone()));
    (dom.clone(), Patcher::new(dom, vec![attrs]))
}

/// Keyed `<li>` items without content, so each item is one host node.
fn keyed(keys: &[&str]) -> V {
    VNode::element("ul")
        .children(keys.iter().map(|k| VNode::element("li").key(*k).attr("id", *k).build()))
        .build()
}

fn ids(root: &MemoryNode) -> Vec<String> {
    root.children().iter().filter_map(|c| c.attr("id")).collect()
}

/// A watcher sees the new value after the flush, and its callback gets
/// `(new, old)`.
#[test]
fn watcher_value_follows_data_after_flush() {
    let data = observed(json!({ "a": 1 }));
    let (calls, callback) = recorder();
    let watcher = Watcher::new(None, doubled(&data), Some(callback), WatcherOptions::default()).unwrap();
    assert_eq!(watcher.value(), Value::from(2));

    data.as_object().unwrap().assign("a", 5);
    assert_eq!(watcher.value(), Value::from(2));
    run_microtasks();

    assert_eq!(watcher.value(), Value::from(10));
    assert_eq!(*calls.borrow(), vec![(Value::from(10), Value::from(2))]);
}

/// Several writes before yielding produce one callback with the last value.
#[test]
fn synchronous_writes_coalesce_into_one_run() {
    let data = observed(json!({ "a": 1 }));
    let (calls, callback) = recorder();
    let _watcher = Watcher::new(None, doubled(&data), Some(callback), WatcherOptions::default()).unwrap();

    let object = data.as_object().unwrap();
    object.assign("a", 3);
    object.assign("a", 4);
    object.assign("a", 5);
    run_microtasks();

    assert_eq!(*calls.borrow(), vec![(Value::from(10), Value::from(2))]);
}

/// A property dropped from the last evaluation no longer triggers a run.
#[test]
fn dependencies_follow_the_last_evaluation() {
    let data = observed(json!({ "use_a": true, "a": 1, "b": 2 }));
    let runs = Rc::new(Cell::new(0));
    let (d, r) = (data.clone(), runs.clone());
    let _watcher = Watcher::new(
        None,
        Source::getter(move || {
            r.set(r.get() + 1);
            Ok(if d.get("use_a").as_bool() == Some(true) {
                d.get("a")
            } else {
                d.get("b")
            })
        }),
        None,
        WatcherOptions::default(),
    )
    .unwrap();
    let object = data.as_object().unwrap();

    object.assign("a", 10);
    run_microtasks();
    assert_eq!(runs.get(), 2);

    object.assign("use_a", false);
    run_microtasks();
    assert_eq!(runs.get(), 3);

    object.assign("a", 20);
    run_microtasks();
    assert_eq!(runs.get(), 3);

    object.assign("b", 30);
    run_microtasks();
    assert_eq!(runs.get(), 4);
}

/// Watchers created first run first, whatever order they were invalidated in.
#[test]
fn earlier_watchers_run_first() {
    let data = observed(json!({ "parent": 0, "child": 0 }));
    let order = Rc::new(RefCell::new(Vec::new()));
    let make = |key: &'static str| {
        let (d, o) = (data.clone(), order.clone());
        Watcher::new(
            None,
            Source::getter(move || {
                o.borrow_mut().push(key);
                Ok(d.get(key))
            }),
            None,
            WatcherOptions::default(),
        )
        .unwrap()
    };
    let _parent = make("parent");
    let _child = make("child");
    order.borrow_mut().clear();

    let object = data.as_object().unwrap();
    object.assign("child", 1);
    object.assign("parent", 1);
    run_microtasks();

    assert_eq!(*order.borrow(), vec!["parent", "child"]);
}

/// Moving the last keyed item to the front is a single move.
#[test]
fn keyed_rotation_moves_one_node() {
    let (dom, patcher) = patcher();
    let old = keyed(&["a", "b", "c"]);
    let root = patcher
        .patch(PatchTarget::Empty, Some(&old), false, false)
        .unwrap()
        .unwrap();
    let before = root.children();
    dom.reset_counts();

    let new = keyed(&["c", "a", "b"]);
    patcher
        .patch(PatchTarget::VNode(old), Some(&new), false, false)
        .unwrap();

    assert_eq!(ids(&root), vec!["c", "a", "b"]);
    let counts = dom.counts();
    assert_eq!((counts.created, counts.removed, counts.moved), (0, 0, 1));
    let after = root.children();
    assert_eq!(after[0], before[2]);
    assert_eq!(after[1], before[0]);
    assert_eq!(after[2], before[1]);
}

/// A new keyed item is created once and lands between its neighbours.
#[test]
fn keyed_insertion_creates_only_the_new_node() {
    let (dom, patcher) = patcher();
    let old = keyed(&["a", "b"]);
    let root = patcher
        .patch(PatchTarget::Empty, Some(&old), false, false)
        .unwrap()
        .unwrap();
    let before = root.children();
    dom.reset_counts();

    let new = keyed(&["a", "x", "b"]);
    patcher
        .patch(PatchTarget::VNode(old), Some(&new), false, false)
        .unwrap();

    assert_eq!(ids(&root), vec!["a", "x", "b"]);
    assert_eq!(dom.counts().created, 1);
    assert_eq!(dom.counts().removed, 0);
    let after = root.children();
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[1]);
}

/// Every array mutator notifies exactly once.
#[test]
fn array_mutators_notify_once_each() {
    let data = observed(json!({ "list": [3, 1, 2] }));
    let runs = Rc::new(Cell::new(0));
    let (d, r) = (data.clone(), runs.clone());
    let _watcher = Watcher::new(
        None,
        Source::getter(move || {
            r.set(r.get() + 1);
            Ok(d.get("list"))
        }),
        None,
        WatcherOptions {
            sync: true,
            ..Default::default()
        },
    )
    .unwrap();
    let list = data.get("list").as_array().unwrap().clone();

    let mutations: Vec<Box<dyn Fn()>> = vec![
        Box::new({
            let l = list.clone();
            move || {
                l.push(4);
            }
        }),
        Box::new({
            let l = list.clone();
            move || {
                l.pop();
            }
        }),
        Box::new({
            let l = list.clone();
            move || {
                l.shift();
            }
        }),
        Box::new({
            let l = list.clone();
            move || {
                l.unshift(0);
            }
        }),
        Box::new({
            let l = list.clone();
            move || {
                l.splice(1, 1, vec![Value::from(7), Value::from(8)]);
            }
        }),
        Box::new({
            let l = list.clone();
            move || l.sort()
        }),
        Box::new({
            let l = list.clone();
            move || l.reverse()
        }),
    ];
    for (i, mutate) in mutations.iter().enumerate() {
        mutate();
        assert_eq!(runs.get(), i + 2);
    }
}

/// Pushed objects are observed: mutating them re-runs a reader.
#[test]
fn pushed_elements_become_observed() {
    let data = observed(json!({ "list": [1, 2, 3] }));
    let list = data.get("list").as_array().unwrap().clone();
    let runs = Rc::new(Cell::new(0));
    let (d, r) = (data.clone(), runs.clone());
    let _watcher = Watcher::new(
        None,
        Source::getter(move || {
            r.set(r.get() + 1);
            let list = d.get("list");
            Ok(list.as_array().map(|a| a.get(3).get("n")).unwrap_or_default())
        }),
        None,
        WatcherOptions::default(),
    )
    .unwrap();

    let item = Value::from(json!({ "n": 1 }));
    list.push(item.clone());
    run_microtasks();
    assert_eq!(runs.get(), 2);
    assert!(item.as_object().unwrap().observer().is_some());

    item.as_object().unwrap().assign("n", 2);
    run_microtasks();
    assert_eq!(runs.get(), 3);
}

/// Observing twice yields the same observer.
#[test]
fn observe_is_idempotent() {
    let value = Value::from(json!({ "list": [1, 2] }));
    let first = observe(&value, false).unwrap();
    let second = observe(&value, false).unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    let list = value.get("list");
    let inner = observe(&list, false).unwrap();
    assert!(Rc::ptr_eq(&inner, &list.as_array().unwrap().observer().unwrap()));
}

/// A static once-only subtree is not diffed again.
#[test]
fn static_once_subtree_skips_child_diffing() {
    let (dom, patcher) = patcher();
    let update_calls = Rc::new(Cell::new(0));
    let tree = |update_calls: &Rc<Cell<usize>>| -> V {
        let p = update_calls.clone();
        let hooks = VNodeHooks {
            update: Some(Rc::new(move |_: &V, _: &V| p.set(p.get() + 1))),
            ..Default::default()
        };
        VNode::element("div")
            .key("header")
            .static_tree()
            .once()
            .child(VNode::element("h1").hooks(hooks).text("title").build())
            .build()
    };
    let old = tree(&update_calls);
    patcher
        .patch(PatchTarget::Empty, Some(&old), false, false)
        .unwrap();
    dom.reset_counts();

    let new = tree(&update_calls);
    patcher
        .patch(PatchTarget::VNode(old.clone()), Some(&new), false, false)
        .unwrap();
    assert_eq!(update_calls.get(), 0);
    assert_eq!(dom.counts(), Default::default());
    assert_eq!(new.elm(), old.elm());
}

/// A throwing watch keeps its old value, is reported with its expression,
/// and does not stop other watchers in the same flush.
#[test]
fn failing_watch_is_isolated() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    config::set_error_handler(Some(Rc::new(move |err: &Error, info: &str| {
        sink.borrow_mut().push((err.to_string(), info.to_string()));
    })));

    let data = observed(json!({ "a": 1 }));
    let d = data.clone();
    let failing = Watcher::new(
        None,
        Source::labelled("explode(a)", move || {
            let a = d.get("a");
            if a == Value::from(2) {
                Err(Error::thrown("boom"))
            } else {
                Ok(a)
            }
        }),
        Some(Rc::new(|_: &Value, _: &Value| -> trellis_core::Result<()> { Ok(()) })),
        WatcherOptions {
            user: true,
            ..Default::default()
        },
    )
    .unwrap();
    let (calls, callback) = recorder();
    let healthy = Watcher::new(None, doubled(&data), Some(callback), WatcherOptions::default()).unwrap();

    data.as_object().unwrap().assign("a", 2);
    run_microtasks();
    config::set_error_handler(None);

    assert_eq!(failing.value(), Value::from(1));
    assert_eq!(healthy.value(), Value::from(4));
    assert_eq!(calls.borrow().len(), 1);
    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "boom");
    assert!(errors[0].1.contains("explode(a)"));
}

/// A component rendering a keyed list reorders host nodes instead of
/// recreating them.
#[test]
fn component_list_reorders_in_place() {
    let (dom, patcher) = patcher();
    let options = ComponentOptions::new("TodoList", |c: &Component<MemoryNode>| {
        let items = c.get("items");
        let items = items.as_array().map(|a| a.to_vec()).unwrap_or_default();
        Ok(VNode::element("ul")
            .children(items.iter().map(|item| {
                let label = item.to_display_string();
                VNode::element("li").key(label.as_str()).text(label).build()
            }))
            .build())
    })
    .data(|| Value::from(json!({ "items": ["milk", "eggs", "bread"] })))
    .build();

    let reconciler: Rc<dyn Reconciler<MemoryNode>> = patcher.clone();
    let app = Component::new(options, reconciler).unwrap();
    let container = patcher.ops().create_element("body");
    let mount_point = patcher.ops().create_element("div");
    patcher.ops().append_child(&container, &mount_point);
    app.mount(Some(mount_point)).unwrap();

    let root = app.el().unwrap();
    assert_eq!(container.to_html(), "<body><ul><li>milk</li><li>eggs</li><li>bread</li></ul></body>");
    let before = root.children();
    dom.reset_counts();

    app.get("items").as_array().unwrap().reverse();
    run_microtasks();

    assert_eq!(root.text_content(), "breadeggsmilk");
    assert_eq!(dom.counts().created, 0);
    assert_eq!(dom.counts().removed, 0);
    let after = root.children();
    assert_eq!(after[0], before[2]);
    assert_eq!(after[2], before[0]);
}

/// Nested components mount child first and are destroyed with the parent.
#[test]
fn nested_components_mount_and_destroy() {
    let (_, patcher) = patcher();
    let log = Rc::new(RefCell::new(Vec::new()));
    let hook = |entry: &'static str| {
        let log = log.clone();
        move |c: &Component<MemoryNode>| {
            log.borrow_mut().push(format!("{}:{entry}", c.name()));
            Ok(())
        }
    };

    let leaf = ComponentOptions::new("Leaf", |c: &Component<MemoryNode>| {
        Ok(VNode::element("em").text(c.get("text").to_display_string()).build())
    })
    .prop("text", "")
    .hook(Lifecycle::Mounted, hook("mounted"))
    .hook(Lifecycle::Destroyed, hook("destroyed"))
    .build();
    let root = ComponentOptions::new("Root", move |_: &Component<MemoryNode>| {
        Ok(VNode::element("div")
            .child(VNode::component(leaf.clone()).prop_data("text", "one").build())
            .child(VNode::component(leaf.clone()).prop_data("text", "two").build())
            .build())
    })
    .hook(Lifecycle::Mounted, hook("mounted"))
    .hook(Lifecycle::Destroyed, hook("destroyed"))
    .build();

    let app = Component::new(root, patcher).unwrap();
    app.mount(None).unwrap();
    assert_eq!(app.el().unwrap().to_html(), "<div><em>one</em><em>two</em></div>");
    assert_eq!(
        *log.borrow(),
        vec!["Leaf:mounted", "Leaf:mounted", "Root:mounted"]
    );

    log.borrow_mut().clear();
    app.destroy();
    assert!(app.children().iter().all(Component::is_destroyed));
    assert_eq!(
        *log.borrow(),
        vec!["Leaf:destroyed", "Leaf:destroyed", "Root:destroyed"]
    );
}

/// With the tokio host, effects re-run once the awaited tick completes.
#[tokio::test(flavor = "current_thread")]
async fn effects_flush_on_tokio_local_set() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            set_host(Rc::new(TokioHost));
            let data = observed(json!({ "n": 1 }));
            let seen = Rc::new(RefCell::new(Vec::new()));
            let (d, s) = (data.clone(), seen.clone());
            let _handle = effect(move || {
                s.borrow_mut().push(d.get("n"));
                Ok(())
            })
            .unwrap();

            data.as_object().unwrap().assign("n", 2);
            tick().await;
            assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(2)]);
            set_host(Rc::new(ManualHost));
        })
        .await;
}
