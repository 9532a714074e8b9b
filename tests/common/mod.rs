//! Shared fixtures for integration tests.

#![allow(dead_code, unused_imports)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use statehive::error::StoreError;
use statehive::{ModuleDef, Store, StoreOptions};

/// Options with assertions on and a roomy diagnostics log, independent of
/// the build profile.
pub fn test_options() -> StoreOptions {
    StoreOptions {
        strict: false,
        devtools: true,
        assertions: true,
        diagnostics_capacity: 64,
    }
}

pub fn build(root: ModuleDef) -> Store {
    Store::builder(root)
        .options(test_options())
        .build()
        .expect("store should build")
}

pub fn path(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// Module with `count` state and `increment`/`add` mutations.
pub fn counter(namespaced: bool) -> ModuleDef {
    ModuleDef::new()
        .namespaced(namespaced)
        .state_fn(|| json!({ "count": 0 }))
        .mutation("increment", |state, _| {
            let count = state["count"].as_i64().unwrap_or(0);
            state["count"] = json!(count + 1);
        })
        .mutation("add", |state, payload| {
            let count = state["count"].as_i64().unwrap_or(0);
            state["count"] = json!(count + payload.as_i64().unwrap_or(0));
        })
        .getter("double", |ctx| json!(ctx.state["count"].as_i64().unwrap_or(0) * 2))
}

/// The cart/products store used throughout the scenario tests.
pub fn cart_store_def() -> ModuleDef {
    ModuleDef::new()
        .module(
            "cart",
            ModuleDef::new()
                .namespaced(true)
                .state_fn(|| json!({ "items": [] }))
                .mutation("add", |state, item| {
                    if let Some(items) = state["items"].as_array_mut() {
                        items.push(item.clone());
                    }
                }),
        )
        .module("products", ModuleDef::new().state(json!({ "all": ["x", "y"] })))
}

/// Error types currently held by the store's diagnostics log.
pub fn reported(store: &Store) -> Vec<StoreError> {
    store
        .diagnostics()
        .snapshot()
        .into_iter()
        .map(|d| d.error)
        .collect()
}

/// Shared, append-only log for recording callback order.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}
