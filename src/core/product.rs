//! Catalog product model and the repository abstraction over the product store

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type ProductId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default = "default_published")]
    pub published: bool,
    /// Admin-entered price in USD. Authoritative.
    #[serde(default)]
    pub reference_usd_price: Option<f64>,
    /// Display price in IRR.
    #[serde(default)]
    pub price: Option<f64>,
    /// Regular price in IRR.
    #[serde(default)]
    pub regular_price: Option<f64>,
    /// Exchange rate last used to derive `price` and `regular_price`.
    #[serde(default)]
    pub applied_rate: Option<f64>,
}

fn default_published() -> bool {
    true
}

impl Product {
    pub fn new(id: ProductId, name: &str, reference_usd_price: Option<f64>) -> Self {
        Self {
            id,
            name: name.to_string(),
            published: true,
            reference_usd_price,
            price: None,
            regular_price: None,
            applied_rate: None,
        }
    }

    /// Admin edit of the reference price.
    ///
    /// Clears the applied rate so the next reconciliation recomputes the local
    /// price even when the exchange rate has not moved.
    pub fn set_reference_usd_price(&mut self, usd: Option<f64>) {
        if self.reference_usd_price != usd {
            self.reference_usd_price = usd;
            self.applied_rate = None;
        }
    }

    /// Writes the derived local price and records the rate it was computed with.
    pub fn apply_rate(&mut self, rate: f64) -> Option<f64> {
        let target = self.reference_usd_price? * rate;
        self.price = Some(target);
        self.regular_price = Some(target);
        self.applied_rate = Some(rate);
        Some(target)
    }

    /// True when the cached applied rate differs from `rate`.
    pub fn is_stale(&self, rate: f64) -> bool {
        self.applied_rate != Some(rate)
    }
}

/// Read/write access to the product catalog and its cached price views.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All products, published or not, ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Creates a product with the given visibility and assigns it the next
    /// free id. The product is written once.
    async fn create_product(
        &self,
        name: &str,
        reference_usd_price: Option<f64>,
        published: bool,
    ) -> Result<Product>;

    /// Creates a published product.
    async fn insert_product(
        &self,
        name: &str,
        reference_usd_price: Option<f64>,
    ) -> Result<Product> {
        self.create_product(name, reference_usd_price, true).await
    }

    async fn save_product(&self, product: &Product) -> Result<()>;

    async fn cached_price_view(&self, id: ProductId) -> Result<Option<String>>;

    async fn cache_price_view(&self, id: ProductId, view: &str) -> Result<()>;

    /// Drops every cached price-derived view.
    async fn invalidate_price_views(&self) -> Result<()>;
}
