//! Shopping-cart scenario used by the `statehive` binary.
//!
//! Two namespaced modules, `products/` and `cart/`, backed by a simulated
//! shop that answers after a delay.

mod cart;
mod products;
mod shop;

use std::sync::Arc;

use serde_json::Value;

use crate::config::StoreOptions;
use crate::error::StoreError;
use crate::module::ModuleDef;
use crate::plugins::LoggerPlugin;
use crate::store::Store;

pub use shop::{Product, Shop};

/// Root definition with the `products` and `cart` modules.
pub fn definition(shop: Shop) -> ModuleDef {
    let shop = Arc::new(shop);
    ModuleDef::new()
        .module("products", products::module(Arc::clone(&shop)))
        .module("cart", cart::module(shop))
}

pub fn build_store(shop: Shop, options: StoreOptions) -> Result<Store, StoreError> {
    Store::builder(definition(shop))
        .options(options)
        .plugin(LoggerPlugin::new().collapsed(true))
        .build()
}

fn product(store: &Store, id: u64) -> Value {
    store.state()["products"]["all"]
        .as_array()
        .and_then(|all| all.iter().find(|p| p["id"] == id).cloned())
        .unwrap_or(Value::Null)
}

/// Load the catalog, fill the cart and check out. Returns the checkout
/// result; the store holds the final state either way.
pub async fn run(store: &Store) -> anyhow::Result<Value> {
    store.dispatch("products/getAllProducts").await?;

    for id in [1, 1, 2] {
        store
            .dispatch(("cart/addProductToCart", product(store, id)))
            .await?;
    }
    let total = store.getter("cart/cartTotalPrice").unwrap_or(Value::Null);
    tracing::info!(%total, "cart filled");

    let products = store.getter("cart/cartProducts").unwrap_or(Value::Null);
    store.dispatch(("cart/checkout", products)).await
}
