//! Simulated remote shop API.

use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub title: String,
    pub price: f64,
    pub inventory: u64,
}

fn catalog() -> Vec<Product> {
    vec![
        Product {
            id: 1,
            title: "iPad 4 Mini".to_string(),
            price: 500.01,
            inventory: 2,
        },
        Product {
            id: 2,
            title: "H&M T-Shirt White".to_string(),
            price: 10.99,
            inventory: 10,
        },
        Product {
            id: 3,
            title: "Charli XCX - Sucker CD".to_string(),
            price: 19.99,
            inventory: 5,
        },
    ]
}

/// Answers after a fixed latency. Checkout can be forced to fail.
#[derive(Debug, Clone)]
pub struct Shop {
    latency: Duration,
    reject_checkout: bool,
}

impl Default for Shop {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl Shop {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            reject_checkout: false,
        }
    }

    pub fn reject_checkout(mut self, reject: bool) -> Self {
        self.reject_checkout = reject;
        self
    }

    pub async fn get_products(&self) -> Result<Value> {
        tokio::time::sleep(self.latency).await;
        Ok(serde_json::to_value(catalog())?)
    }

    pub async fn buy_products(&self, products: &Value) -> Result<()> {
        tokio::time::sleep(self.latency).await;
        if self.reject_checkout {
            bail!("shop rejected checkout");
        }
        let count = products.as_array().map(Vec::len).unwrap_or(0);
        tracing::debug!(count, "checkout accepted");
        Ok(())
    }
}
