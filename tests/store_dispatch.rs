mod common;

use anyhow::anyhow;
use common::{build, counter, reported, EventLog};
use serde_json::{json, Value};
use statehive::error::StoreError;
use statehive::store::{ActionSubscriber, SubscribeOptions};
use statehive::{ActionDef, ModuleDef};

fn store_with_actions() -> statehive::Store {
    build(
        counter(false)
            .action(
                "incrementLater",
                ActionDef::new(|ctx, payload| async move {
                    tokio::task::yield_now().await;
                    ctx.commit(("add", payload));
                    Ok(ctx.state()["count"].clone())
                }),
            )
            .action(
                "fail",
                ActionDef::new(|_ctx, _payload| async move {
                    Err::<Value, _>(anyhow!("backend unavailable"))
                }),
            )
            .module(
                "sibling",
                ModuleDef::new().action(
                    "incrementLater",
                    ActionDef::sync(|_ctx, _payload| Ok(json!("sibling"))),
                ),
            ),
    )
}

#[tokio::test]
async fn test_unknown_action_resolves_to_null() {
    let store = build(counter(false));
    let result = store.dispatch("unknown").await.unwrap();

    assert_eq!(result, Value::Null);
    assert_eq!(
        reported(&store),
        vec![StoreError::UnknownAction {
            kind: "unknown".to_string()
        }]
    );
}

#[tokio::test]
async fn test_single_handler_result_passes_through() {
    let store = build(counter(false).action(
        "load",
        ActionDef::new(|ctx, payload| async move {
            ctx.commit(("add", payload));
            Ok(json!("done"))
        }),
    ));

    let result = store.dispatch(("load", 4)).await.unwrap();
    assert_eq!(result, json!("done"));
    assert_eq!(store.state()["count"], json!(4));
}

#[tokio::test]
async fn test_multiple_handlers_join_into_array() {
    let store = store_with_actions();
    let result = store.dispatch(("incrementLater", 2)).await.unwrap();

    // Non-namespaced modules share the type; results follow registration order.
    assert_eq!(result, json!([2, "sibling"]));
}

#[tokio::test]
async fn test_rejection_reaches_caller_and_error_hooks() {
    let store = store_with_actions();
    let log = EventLog::default();

    let before = log.clone();
    let after = log.clone();
    let error = log.clone();
    store.subscribe_action_with(
        ActionSubscriber::builder()
            .before(move |action, _| {
                before.push(format!("before:{}", action.kind));
                Ok(())
            })
            .after(move |action, _| {
                after.push(format!("after:{}", action.kind));
                Ok(())
            })
            .error(move |action, _, err| {
                error.push(format!("error:{}:{}", action.kind, err));
                Ok(())
            })
            .build(),
        SubscribeOptions::default(),
    );

    let err = store.dispatch("fail").await.unwrap_err();
    assert_eq!(err.to_string(), "backend unavailable");

    store.dispatch(("incrementLater", 1)).await.unwrap();

    assert_eq!(
        log.events(),
        vec![
            "before:fail",
            "error:fail:backend unavailable",
            "before:incrementLater",
            "after:incrementLater",
        ]
    );
}

#[tokio::test]
async fn test_failing_subscriber_does_not_block_dispatch() {
    let store = store_with_actions();
    let log = EventLog::default();

    store.subscribe_action(|_, _| Err(anyhow!("subscriber exploded")));
    let seen = log.clone();
    store.subscribe_action(move |action, _| {
        seen.push(action.kind.clone());
        Ok(())
    });

    let result = store.dispatch(("incrementLater", 3)).await.unwrap();
    assert_eq!(result, json!([3, "sibling"]));
    assert_eq!(log.events(), vec!["incrementLater"]);
}

#[tokio::test]
async fn test_before_hook_sees_state_at_dispatch_time() {
    let store = store_with_actions();
    let log = EventLog::default();

    let seen = log.clone();
    store.subscribe_action(move |_, state| {
        seen.push(state["count"].to_string());
        Ok(())
    });

    store.dispatch(("incrementLater", 5)).await.unwrap();
    store.dispatch(("incrementLater", 1)).await.unwrap();

    assert_eq!(log.events(), vec!["0", "5"]);
}

#[tokio::test]
async fn test_actions_can_dispatch_other_actions() {
    let store = build(
        counter(false)
            .action(
                "inner",
                ActionDef::sync(|ctx, _| {
                    ctx.commit("increment");
                    Ok(json!("inner"))
                }),
            )
            .action(
                "outer",
                ActionDef::new(|ctx, _| async move {
                    let inner = ctx.dispatch("inner").await?;
                    ctx.commit("increment");
                    Ok(json!([inner, ctx.root_state()["count"].clone()]))
                }),
            ),
    );

    let result = store.dispatch("outer").await.unwrap();
    assert_eq!(result, json!(["inner", 2]));
}

#[tokio::test]
async fn test_concurrent_dispatches_interleave() {
    let store = build(counter(false).action(
        "slowAdd",
        ActionDef::new(|ctx, payload| async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            ctx.commit(("add", payload));
            Ok(Value::Null)
        }),
    ));

    let (a, b) = tokio::join!(store.dispatch(("slowAdd", 1)), store.dispatch(("slowAdd", 2)));
    a.unwrap();
    b.unwrap();
    assert_eq!(store.state()["count"], json!(3));
}

#[tokio::test]
async fn test_dropped_dispatch_still_runs_to_completion() {
    let store = build(counter(false).action(
        "load",
        ActionDef::new(|ctx, payload| async move {
            tokio::task::yield_now().await;
            ctx.commit(("add", payload));
            Ok(Value::Null)
        }),
    ));
    let log = EventLog::default();
    let after = log.clone();
    store.subscribe_action_with(
        ActionSubscriber::builder()
            .after(move |action, _| {
                after.push(format!("after:{}", action.kind));
                Ok(())
            })
            .build(),
        SubscribeOptions::default(),
    );

    drop(store.dispatch(("load", 4)));
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(store.state()["count"], json!(4));
    assert_eq!(log.events(), vec!["after:load"]);
}

#[tokio::test]
async fn test_rejection_leaves_sibling_handlers_running() {
    let store = build(
        counter(false)
            .action(
                "go",
                ActionDef::new(|ctx, _| async move {
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    ctx.commit("increment");
                    Ok(Value::Null)
                }),
            )
            .module(
                "failing",
                ModuleDef::new().action(
                    "go",
                    ActionDef::new(|_ctx, _| async move {
                        Err::<Value, _>(anyhow!("rejected early"))
                    }),
                ),
            ),
    );

    let err = store.dispatch("go").await.unwrap_err();
    assert_eq!(err.to_string(), "rejected early");

    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    assert_eq!(store.state()["count"], json!(1));
}
