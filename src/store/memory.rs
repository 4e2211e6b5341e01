use crate::core::cache::Cache;
use crate::core::product::{Product, ProductId, ProductRepository};
use crate::core::schedule::ScheduleStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Non-persistent product store for tests and dry runs.
#[derive(Clone, Default)]
pub struct MemoryProductStore {
    products: Arc<Mutex<BTreeMap<ProductId, Product>>>,
    views: Cache<ProductId, String>,
    schedule: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for MemoryProductStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let products = self.products.lock().await;
        Ok(products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let products = self.products.lock().await;
        Ok(products.get(&id).cloned())
    }

    async fn create_product(
        &self,
        name: &str,
        reference_usd_price: Option<f64>,
        published: bool,
    ) -> Result<Product> {
        let mut products = self.products.lock().await;
        let id = products.keys().next_back().map_or(1, |last| last + 1);
        let product = Product {
            published,
            ..Product::new(id, name, reference_usd_price)
        };
        products.insert(id, product.clone());
        debug!(id, "Inserted product");
        Ok(product)
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.lock().await;
        let slot = products
            .get_mut(&product.id)
            .ok_or_else(|| anyhow!("Product not found: {}", product.id))?;
        *slot = product.clone();
        Ok(())
    }

    async fn cached_price_view(&self, id: ProductId) -> Result<Option<String>> {
        Ok(self.views.get(&id).await)
    }

    async fn cache_price_view(&self, id: ProductId, view: &str) -> Result<()> {
        self.views.put(id, view.to_string()).await;
        Ok(())
    }

    async fn invalidate_price_views(&self) -> Result<()> {
        self.views.clear().await;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for MemoryProductStore {
    async fn next_run(&self, event: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.schedule.lock().await.get(event).copied())
    }

    async fn set_next_run(&self, event: &str, at: DateTime<Utc>) -> Result<()> {
        self.schedule.lock().await.insert(event.to_string(), at);
        Ok(())
    }
}
