//! Test suite for parallel groups

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tandem::{
    Action, BufferingEventSink, Descriptor, Group, GroupItem, GroupOutcome, KernelEvent,
    Operation,
};

/// Settles with its first argument after `args[1]` milliseconds
fn delayed() -> Operation<Value> {
    Operation::from_fn(|args: Vec<Value>, k| {
        let delay = args[1].as_u64().unwrap_or_default();
        let value = args[0].clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            k.settle_one(value);
        });
    })
    .named("delayed")
}

#[tokio::test]
async fn test_group_joins_after_all_items_out_of_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let joins = Arc::new(AtomicUsize::new(0));

    let f1 = {
        let order = order.clone();
        move |v: Vec<Value>| order.lock().unwrap().push(format!("f1:{}", v[0]))
    };
    let f2 = {
        let order = order.clone();
        move |v: Vec<Value>| order.lock().unwrap().push(format!("f2:{}", v[0]))
    };
    let mut group = Group::new(vec![
        Descriptor::item(delayed(), vec![json!("slow"), json!(40)]).on_settle(f1),
        Descriptor::item(delayed(), vec![json!("fast"), json!(1)]).on_settle(f2),
    ]);
    {
        let order = order.clone();
        let joins = joins.clone();
        group.set_last(move || {
            joins.fetch_add(1, Ordering::SeqCst);
            order.lock().unwrap().push("last".to_string());
        });
    }

    assert_eq!(group.run().await, GroupOutcome::Joined { items: 2 });
    assert_eq!(joins.load(Ordering::SeqCst), 1);
    assert_eq!(
        *order.lock().unwrap(),
        vec![
            "f2:\"fast\"".to_string(),
            "f1:\"slow\"".to_string(),
            "last".to_string()
        ]
    );
}

#[tokio::test]
async fn test_all_items_launch_before_any_settles() {
    let launched = Arc::new(AtomicUsize::new(0));
    let seen_at_settle = Arc::new(Mutex::new(Vec::new()));

    let items: Vec<GroupItem> = (0..4)
        .map(|i| {
            let counter = launched.clone();
            let op = Operation::from_fn(move |_args: Vec<Value>, k| {
                counter.fetch_add(1, Ordering::SeqCst);
                k.settle_one(json!(i));
            });
            let launched = launched.clone();
            let seen = seen_at_settle.clone();
            Descriptor::item(op, vec![]).on_settle(move |_| {
                seen.lock().unwrap().push(launched.load(Ordering::SeqCst));
            })
        })
        .collect();

    Group::new(items).run().await;
    assert_eq!(*seen_at_settle.lock().unwrap(), vec![4, 4, 4, 4]);
}

#[tokio::test]
async fn test_item_errors_do_not_affect_join() {
    let failing = Operation::from_fn(|_args: Vec<Value>, k| {
        k.settle(vec![json!({"error": "refused"})])
    });
    let joined = Arc::new(AtomicUsize::new(0));
    let j = joined.clone();
    let group = Group::new(vec![
        Descriptor::item(failing.clone(), vec![]),
        Descriptor::item(delayed(), vec![json!(1), json!(5)]),
        Descriptor::item(failing, vec![]).on_settle(|v| assert!(v[0].get("error").is_some())),
    ])
    .with_last(move || {
        j.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(group.spawn().await.unwrap(), GroupOutcome::Joined { items: 3 });
    assert_eq!(joined.load(Ordering::SeqCst), 1);
}

struct Fetch {
    calls: AtomicUsize,
}

#[async_trait]
impl Action<Value> for Fetch {
    fn name(&self) -> &str {
        "fetch"
    }

    async fn call(&self, args: Vec<Value>) -> Vec<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(3)).await;
        vec![Value::Null, json!(format!("body of {}", args[0].as_str().unwrap_or("?")))]
    }
}

#[tokio::test]
async fn test_action_items_share_state() {
    let fetch = Arc::new(Fetch {
        calls: AtomicUsize::new(0),
    });
    let op = Operation::from_action(fetch.clone());
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let items = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            let bodies = bodies.clone();
            Descriptor::item(op.clone(), vec![json!(name)])
                .on_settle(move |v| bodies.lock().unwrap().push(v[1].clone()))
        })
        .collect();

    let sink = Arc::new(BufferingEventSink::new());
    let group = Group::new(items).with_event_sink(sink.clone());
    assert_eq!(group.run().await, GroupOutcome::Joined { items: 3 });
    assert_eq!(fetch.calls.load(Ordering::SeqCst), 3);

    let mut bodies = bodies.lock().unwrap().clone();
    bodies.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
    assert_eq!(
        bodies,
        vec![json!("body of a"), json!("body of b"), json!("body of c")]
    );

    let outstanding: Vec<usize> = sink
        .kinds()
        .into_iter()
        .filter_map(|e| match e {
            KernelEvent::ItemSettled { outstanding, .. } => Some(outstanding),
            _ => None,
        })
        .collect();
    assert_eq!(outstanding, vec![2, 1, 0]);
    assert_eq!(sink.kinds().last(), Some(&KernelEvent::GroupJoined { items: 3 }));
}
