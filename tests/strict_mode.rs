mod common;

use common::{counter, reported, test_options};
use serde_json::json;
use statehive::error::StoreError;
use statehive::{ActionDef, Store, StoreOptions};

fn strict_store() -> Store {
    Store::builder(counter(false).action(
        "sneaky",
        ActionDef::sync(|ctx, _| {
            // Bypasses commit on purpose.
            ctx.store()
                .state_handle()
                .set(&[], "count", json!(99));
            Ok(json!(null))
        }),
    ))
    .options(test_options())
    .strict(true)
    .build()
    .unwrap()
}

#[test]
fn test_write_outside_commit_is_reported() {
    let store = strict_store();
    let version = store.state_handle().version();

    store.state_handle().set(&[], "count", json!(5));

    assert_eq!(store.state()["count"], json!(5));
    assert_eq!(
        reported(&store),
        vec![StoreError::InvariantViolation {
            version: version + 1
        }]
    );
}

#[test]
fn test_write_inside_mutation_is_sanctioned() {
    let store = strict_store();
    store.commit("increment");
    store.commit(("add", 3));
    store.replace_state(json!({ "count": 0 }));

    assert!(reported(&store).is_empty());
    assert!(!store.is_committing());
}

#[tokio::test]
async fn test_write_from_action_is_reported() {
    let store = strict_store();
    store.dispatch("sneaky").await.unwrap();

    let errors = reported(&store);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type(), "invariant_violation");
}

#[test]
fn test_dynamic_registration_is_sanctioned() {
    let store = strict_store();
    store.register_module("extra", counter(true)).unwrap();
    store.unregister_module("extra");

    assert!(reported(&store).is_empty());
}

#[test]
fn test_non_strict_store_ignores_direct_writes() {
    let store = Store::builder(counter(false))
        .options(StoreOptions {
            strict: false,
            ..test_options()
        })
        .build()
        .unwrap();

    store.state_handle().set(&[], "count", json!(5));
    assert!(reported(&store).is_empty());
}

#[test]
fn test_overlapping_commits_across_threads_are_sanctioned() {
    let store = Store::builder(counter(false).mutation("slow", |state, _| {
        std::thread::sleep(std::time::Duration::from_micros(50));
        let count = state["count"].as_i64().unwrap_or(0);
        state["count"] = json!(count + 1);
    }))
    .options(test_options())
    .strict(true)
    .build()
    .unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    store.commit("slow");
                    store.commit("increment");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(reported(&store).is_empty());
    assert_eq!(store.state()["count"], json!(400));
    assert!(!store.is_committing());
}
