//! Deliveries racing each other: listeners must end on the query's final state.

use parking_lot::{Mutex, RwLock};
use rivulet_core::schema::{SchemaRegistry, TableBuilder};
use rivulet_core::{CompareOp, DataType, Row, Value};
use rivulet_query::{parse, Params, ResultSet};
use rivulet_reactive::{SubscriptionHandle, SubscriptionManager};
use rivulet_storage::{Assignment, Condition, EventLog, Filter, MutationOp, Store};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

struct Fixture {
    registry: SchemaRegistry,
    store: Arc<RwLock<Store>>,
    log: Arc<Mutex<EventLog>>,
    manager: Arc<SubscriptionManager>,
}

fn setup() -> Fixture {
    let registry = SchemaRegistry::new();
    let users = registry
        .define(
            TableBuilder::new("users")
                .unwrap()
                .add_column("user_id", DataType::Int)
                .unwrap()
                .add_column("name", DataType::Text)
                .unwrap()
                .add_primary_key("user_id")
                .unwrap()
                .build()
                .unwrap(),
        )
        .unwrap();
    let store = Arc::new(RwLock::new(Store::with_tables([&users])));
    let manager = Arc::new(SubscriptionManager::new(store.clone()));
    let fx = Fixture {
        registry,
        store,
        log: Arc::new(Mutex::new(EventLog::new())),
        manager,
    };
    fx.commit(MutationOp::Insert {
        rows: vec![
            Row::new(vec![Value::Int(1), Value::from("ann")]),
            Row::new(vec![Value::Int(2), Value::from("bob")]),
        ],
    });
    fx
}

impl Fixture {
    /// Applies, logs and propagates one mutation; commits never interleave.
    fn commit(&self, op: MutationOp) {
        let mut log = self.log.lock();
        let outcome = self.store.write().apply("users", op).unwrap();
        let entry = log.append(&outcome);
        self.manager.on_entry(&entry);
    }

    fn subscribe_by_id(&self, id: i64) -> SubscriptionHandle {
        let query = Arc::new(parse("select * from users where user_id = :id", &self.registry).unwrap());
        self.manager
            .subscribe(query, Params::new().bind("id", id))
            .unwrap()
    }
}

fn rename(id: i64, name: &str) -> MutationOp {
    MutationOp::Update {
        filter: Filter::new(vec![Condition::new(
            0,
            DataType::Int,
            CompareOp::Eq,
            Value::Int(id),
        )]),
        assignments: vec![Assignment::new(1, Value::from(name))],
    }
}

fn record_last(handle: &SubscriptionHandle) -> Arc<Mutex<Option<ResultSet>>> {
    let last = Arc::new(Mutex::new(None));
    let sink = last.clone();
    handle.on_change(move |changes| *sink.lock() = Some(changes.result().clone()));
    last
}

#[test]
fn rebind_during_commit_delivery_ends_current() {
    let fx = Arc::new(setup());
    let handle = fx.subscribe_by_id(1);

    let (started, wait_started) = mpsc::channel();
    let slow = AtomicBool::new(true);
    handle.on_change(move |_| {
        if slow.swap(false, Ordering::SeqCst) {
            let _ = started.send(());
            thread::sleep(Duration::from_millis(200));
        }
    });
    let last = record_last(&handle);

    let writer = {
        let fx = fx.clone();
        thread::spawn(move || fx.commit(rename(1, "ann2")))
    };
    wait_started.recv().unwrap();
    handle.rebind(Params::new().bind("id", 2)).unwrap();
    writer.join().unwrap();

    let state = handle.result().unwrap();
    assert_eq!(
        state.rows(),
        &[Row::new(vec![Value::Int(2), Value::from("bob")])]
    );
    assert_eq!(last.lock().as_ref(), Some(&state));
}

#[test]
fn rebind_from_listener_supersedes_commit_delivery() {
    let fx = setup();
    let handle = Arc::new(fx.subscribe_by_id(1));

    let this: Arc<OnceLock<Weak<SubscriptionHandle>>> = Arc::new(OnceLock::new());
    let _ = this.set(Arc::downgrade(&handle));
    let first = AtomicBool::new(true);
    {
        let this = this.clone();
        handle.on_change(move |_| {
            if first.swap(false, Ordering::SeqCst) {
                if let Some(handle) = this.get().and_then(Weak::upgrade) {
                    handle.rebind(Params::new().bind("id", 2)).unwrap();
                }
            }
        });
    }
    let deliveries = Arc::new(Mutex::new(Vec::new()));
    {
        let sink = deliveries.clone();
        handle.on_change(move |changes| sink.lock().push(changes.result().clone()));
    }

    fx.commit(rename(1, "ann2"));

    let state = handle.result().unwrap();
    let deliveries = deliveries.lock();
    // the stale commit result never reaches the second listener
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries.last(), Some(&state));
    assert_eq!(state.value(0, "name"), Some(&Value::from("bob")));
}

#[test]
fn concurrent_rebinds_end_on_query_state() {
    let fx = Arc::new(setup());
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let fx = fx.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    fx.commit(rename(1 + (w % 2), &format!("w{w}-{i}")));
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4i64)
        .map(|r| {
            let fx = fx.clone();
            thread::spawn(move || {
                let mut held = Vec::new();
                for i in 0..10 {
                    let handle = fx.subscribe_by_id(1 + r % 2);
                    let last = record_last(&handle);
                    handle.rebind(Params::new().bind("id", 1 + (r + i) % 2)).unwrap();
                    held.push((handle, last));
                }
                held
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    let held: Vec<_> = readers
        .into_iter()
        .flat_map(|reader| reader.join().unwrap())
        .collect();

    for (handle, last) in &held {
        assert_eq!(last.lock().as_ref(), handle.result().as_ref());
    }
    assert_eq!(fx.manager.subscription_count(), held.len());
    drop(held);
    assert!(fx.manager.is_empty());
}
