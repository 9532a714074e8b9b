use std::sync::Arc;

use serde_json::{json, Value};

use crate::demo::shop::Shop;
use crate::module::{ActionDef, ModuleDef};

fn find_product<'a>(state: &'a mut Value, id: &Value) -> Option<&'a mut Value> {
    state
        .get_mut("all")?
        .as_array_mut()?
        .iter_mut()
        .find(|product| product["id"] == *id)
}

/// `products/`: the catalog and its inventory.
pub fn module(shop: Arc<Shop>) -> ModuleDef {
    ModuleDef::new()
        .namespaced(true)
        .state_fn(|| json!({ "all": [] }))
        .mutation("setProducts", |state, products| {
            state["all"] = products.clone();
        })
        .mutation("decrementProductInventory", |state, payload| {
            if let Some(product) = find_product(state, &payload["id"]) {
                let inventory = product["inventory"].as_u64().unwrap_or(0);
                product["inventory"] = json!(inventory.saturating_sub(1));
            }
        })
        .action(
            "getAllProducts",
            ActionDef::new(move |ctx, _payload| {
                let shop = Arc::clone(&shop);
                async move {
                    let products = shop.get_products().await?;
                    ctx.commit(("setProducts", products));
                    Ok(Value::Null)
                }
            }),
        )
}
