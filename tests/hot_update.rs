mod common;

use common::{build, counter, reported};
use serde_json::json;
use statehive::error::StoreError;
use statehive::{ActionDef, ModuleDef};

fn original() -> ModuleDef {
    ModuleDef::new()
        .module("a", counter(true))
        .module("b", counter(true))
}

#[test]
fn test_hot_update_swaps_handlers_and_keeps_state() {
    let store = build(original());
    store.commit("a/increment");
    assert_eq!(store.getter("a/double"), Some(json!(2)));

    store
        .hot_update(
            ModuleDef::new().module(
                "a",
                ModuleDef::new()
                    .namespaced(true)
                    .mutation("increment", |state, _| {
                        let count = state["count"].as_i64().unwrap_or(0);
                        state["count"] = json!(count + 10);
                    })
                    .getter("double", |ctx| {
                        json!(ctx.state["count"].as_i64().unwrap_or(0) * 100)
                    }),
            ),
        )
        .unwrap();

    assert_eq!(store.state()["a"]["count"], json!(1));
    assert_eq!(store.getter("a/double"), Some(json!(100)));

    store.commit("a/increment");
    assert_eq!(store.state()["a"]["count"], json!(11));

    // A provided group replaces the old one wholesale.
    store.commit(("a/add", 1));
    assert_eq!(store.state()["a"]["count"], json!(11));
    assert_eq!(
        reported(&store),
        vec![StoreError::UnknownMutation {
            kind: "a/add".to_string()
        }]
    );

    store.commit("b/increment");
    assert_eq!(store.state()["b"]["count"], json!(1));
}

#[tokio::test]
async fn test_hot_update_can_change_actions() {
    let store = build(original().action("hello", ActionDef::sync(|_, _| Ok(json!("v1")))));
    assert_eq!(store.dispatch("hello").await.unwrap(), json!("v1"));

    store
        .hot_update(ModuleDef::new().action("hello", ActionDef::sync(|_, _| Ok(json!("v2")))))
        .unwrap();
    assert_eq!(store.dispatch("hello").await.unwrap(), json!("v2"));
}

#[test]
fn test_hot_update_toggling_namespace_rekeys_handlers() {
    let store = build(original());
    store
        .hot_update(ModuleDef::new().module("b", ModuleDef::new().namespaced(false)))
        .unwrap();

    store.commit("increment");
    assert_eq!(store.state()["b"]["count"], json!(1));
    assert_eq!(store.getter("b/double"), None);
}

#[test]
fn test_new_module_aborts_without_rollback() {
    let store = build(original());

    let err = store
        .hot_update(
            ModuleDef::new()
                .module(
                    "a",
                    ModuleDef::new()
                        .namespaced(true)
                        .getter("double", |_| json!("patched")),
                )
                .module("zzz", counter(true)),
        )
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::HotReloadNewModule {
            key: "zzz".to_string()
        }
    );
    assert!(reported(&store).contains(&err));
    assert!(!store.has_module("zzz"));

    // The merge into `a` happened before the abort and stays applied.
    assert_eq!(store.getter("a/double"), Some(json!("patched")));
}
