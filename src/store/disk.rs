use crate::core::product::{Product, ProductId, ProductRepository};
use crate::core::schedule::ScheduleStore;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PRODUCTS: &str = "products";
const PRICE_VIEWS: &str = "price_views";
const SCHEDULE: &str = "schedule";

/// Product store backed by a fjall keyspace on disk.
///
/// Products are serialized as JSON and keyed by their big-endian id, so
/// iteration order is id order.
pub struct DiskProductStore {
    keyspace: Keyspace,
    products: PartitionHandle,
    views: PartitionHandle,
    schedule: PartitionHandle,
}

fn product_key(id: ProductId) -> [u8; 8] {
    id.to_be_bytes()
}

fn decode_product(value: &[u8]) -> Result<Product> {
    serde_json::from_slice(value).context("Failed to decode stored product")
}

impl DiskProductStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path.join("catalog"))
            .open()
            .with_context(|| format!("Failed to open product store at {}", path.display()))?;
        let products = keyspace.open_partition(PRODUCTS, PartitionCreateOptions::default())?;
        let views = keyspace.open_partition(PRICE_VIEWS, PartitionCreateOptions::default())?;
        let schedule = keyspace.open_partition(SCHEDULE, PartitionCreateOptions::default())?;

        debug!(path = %path.display(), "Opened product store");
        Ok(Self {
            keyspace,
            products,
            views,
            schedule,
        })
    }

    fn write_product(&self, product: &Product) -> Result<()> {
        self.products.insert(
            product_key(product.id).as_slice(),
            serde_json::to_vec(product)?,
        )?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for DiskProductStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        self.products
            .iter()
            .map(|kv| {
                let (_, value) = kv?;
                decode_product(&value)
            })
            .collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        self.products
            .get(product_key(id).as_slice())?
            .map(|value| decode_product(&value))
            .transpose()
    }

    async fn create_product(
        &self,
        name: &str,
        reference_usd_price: Option<f64>,
        published: bool,
    ) -> Result<Product> {
        let last = self.products.iter().next_back().transpose()?;
        let id = match last {
            Some((_, value)) => decode_product(&value)?.id + 1,
            None => 1,
        };

        let product = Product {
            published,
            ..Product::new(id, name, reference_usd_price)
        };
        self.write_product(&product)?;
        debug!(id, "Inserted product");
        Ok(product)
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        if !self.products.contains_key(product_key(product.id).as_slice())? {
            return Err(anyhow!("Product not found: {}", product.id));
        }
        self.write_product(product)
    }

    async fn cached_price_view(&self, id: ProductId) -> Result<Option<String>> {
        match self.views.get(product_key(id).as_slice())? {
            Some(value) => {
                debug!(id, "Price view HIT");
                Ok(Some(String::from_utf8(value.to_vec())?))
            }
            None => {
                debug!(id, "Price view MISS");
                Ok(None)
            }
        }
    }

    async fn cache_price_view(&self, id: ProductId, view: &str) -> Result<()> {
        self.views.insert(product_key(id).as_slice(), view.as_bytes())?;
        Ok(())
    }

    async fn invalidate_price_views(&self) -> Result<()> {
        let keys = self
            .views
            .keys()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let removed = keys.len();
        for key in keys {
            self.views.remove(key)?;
        }
        debug!(removed, "Invalidated price views");
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for DiskProductStore {
    async fn next_run(&self, event: &str) -> Result<Option<DateTime<Utc>>> {
        self.schedule
            .get(event.as_bytes())?
            .map(|value| serde_json::from_slice(&value).context("Failed to decode schedule"))
            .transpose()
    }

    async fn set_next_run(&self, event: &str, at: DateTime<Utc>) -> Result<()> {
        self.schedule.insert(event.as_bytes(), serde_json::to_vec(&at)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}
