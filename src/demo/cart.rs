use std::sync::Arc;

use serde_json::{json, Value};

use crate::demo::shop::Shop;
use crate::module::{ActionDef, ModuleDef};
use crate::store::CallOptions;

fn find_item<'a>(state: &'a mut Value, id: &Value) -> Option<&'a mut Value> {
    state
        .get_mut("items")?
        .as_array_mut()?
        .iter_mut()
        .find(|item| item["id"] == *id)
}

/// `cart/`: line items and checkout status.
pub fn module(shop: Arc<Shop>) -> ModuleDef {
    ModuleDef::new()
        .namespaced(true)
        .state_fn(|| json!({ "items": [], "checkoutStatus": null }))
        .getter("cartProducts", |ctx| {
            let catalog = ctx.root_state["products"]["all"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            let items = ctx.state["items"].as_array().cloned().unwrap_or_default();
            items
                .iter()
                .filter_map(|item| {
                    let product = catalog.iter().find(|p| p["id"] == item["id"])?;
                    Some(json!({
                        "id": product["id"],
                        "title": product["title"],
                        "price": product["price"],
                        "quantity": item["quantity"],
                    }))
                })
                .collect::<Vec<_>>()
                .into()
        })
        .getter("cartTotalPrice", |ctx| {
            let products = ctx.getters.get("cartProducts").unwrap_or(Value::Null);
            let total: f64 = products
                .as_array()
                .map(|products| {
                    products
                        .iter()
                        .map(|p| {
                            p["price"].as_f64().unwrap_or(0.0)
                                * p["quantity"].as_f64().unwrap_or(0.0)
                        })
                        .sum()
                })
                .unwrap_or(0.0);
            json!(total)
        })
        .mutation("pushProductToCart", |state, payload| {
            if let Some(items) = state.get_mut("items").and_then(Value::as_array_mut) {
                items.push(json!({ "id": payload["id"], "quantity": 1 }));
            }
        })
        .mutation("incrementItemQuantity", |state, payload| {
            if let Some(item) = find_item(state, &payload["id"]) {
                let quantity = item["quantity"].as_u64().unwrap_or(0);
                item["quantity"] = json!(quantity + 1);
            }
        })
        .mutation("setCartItems", |state, payload| {
            state["items"] = payload["items"].clone();
        })
        .mutation("setCheckoutStatus", |state, status| {
            state["checkoutStatus"] = status.clone();
        })
        .action(
            "addProductToCart",
            ActionDef::sync(|ctx, product| {
                ctx.commit(("setCheckoutStatus", Value::Null));
                if product["inventory"].as_u64().unwrap_or(0) == 0 {
                    return Ok(Value::Null);
                }
                let id = product["id"].clone();
                let in_cart = ctx.state()["items"]
                    .as_array()
                    .map(|items| items.iter().any(|item| item["id"] == id))
                    .unwrap_or(false);
                if in_cart {
                    ctx.commit(("incrementItemQuantity", json!({ "id": id })));
                } else {
                    ctx.commit(("pushProductToCart", json!({ "id": id })));
                }
                ctx.commit_with(
                    ("products/decrementProductInventory", json!({ "id": id })),
                    CallOptions::root(),
                );
                Ok(Value::Null)
            }),
        )
        .action(
            "checkout",
            ActionDef::new(move |ctx, products| {
                let shop = Arc::clone(&shop);
                async move {
                    let saved = ctx.state()["items"].clone();
                    ctx.commit(("setCheckoutStatus", Value::Null));
                    ctx.commit(("setCartItems", json!({ "items": [] })));
                    match shop.buy_products(&products).await {
                        Ok(()) => {
                            ctx.commit(("setCheckoutStatus", "successful"));
                            Ok(json!("successful"))
                        }
                        Err(err) => {
                            ctx.commit(("setCheckoutStatus", "failed"));
                            ctx.commit(("setCartItems", json!({ "items": saved })));
                            Err(err.context("checkout failed"))
                        }
                    }
                }
            }),
        )
}
